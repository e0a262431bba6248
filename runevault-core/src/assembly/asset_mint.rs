//! Asset mint
//!
//! Calls the mint opcode of an asset contract. Output layout:
//!
//! - recipient carrier at the dust floor
//! - metadata script carrying `[block, tx, mint_opcode, extra...]` as calldata
//! - frontend fee, only when an address is given and the amount clears the floor
//! - change, only when it clears the floor
//!
//! Sub-floor change is left to the miner instead of creating a dust output.

use std::collections::HashSet;

use bitcoin::PublicKey;
use log::{debug, info};
use rust_decimal::Decimal;

use runevault_common::address::script_for_address;
use runevault_common::error::{ErrorContext, WalletError};
use runevault_common::fee_estimation::estimate_tx_size;
use runevault_common::logging::sanitize_for_logging;
use runevault_common::types::{AssetId, UnsignedPsbt, Utxo, UtxoOrder};

use super::convergence::{converge, FeeTarget};
use super::{add_inputs, dedup_by_outpoint, ordinary_candidates, seal, PsbtAssembler};
use crate::providers::{MetadataCodec, ProtocolMessage, UtxoSource};
use crate::psbt::{InputOptions, TxDraft};

/// Parameters of an asset mint
#[derive(Debug, Clone)]
pub struct AssetMintRequest {
    pub to_address: String,
    pub change_address: String,
    pub asset_id: AssetId,
    /// Hex public key of the taproot key owning the inputs
    pub sender_pubkey: String,
    pub frontend_fee_address: Option<String>,
    pub frontend_fee_amount: Option<u64>,
    pub fee_rate: Decimal,
    /// Ordinary UTXOs available for fees
    pub spendable_utxos: Vec<Utxo>,
    /// Asset-bearing UTXOs spent as-is
    pub asset_utxos: Vec<Utxo>,
    /// Extra calldata after the mint opcode
    pub input_data: Vec<u128>,
    pub payment_pubkey: Option<PublicKey>,
    pub utxo_order: UtxoOrder,
}

impl<'a, S, C> PsbtAssembler<'a, S, C>
where
    S: UtxoSource + ?Sized,
    C: MetadataCodec + ?Sized,
{
    /// Build an unsigned mint transaction
    ///
    /// # Errors
    /// * `InsufficientFunds` when ordinary UTXOs cannot cover the fee
    /// * `NegativeChange` when inputs fall short of outputs plus fee
    pub fn create_asset_mint_psbt(&self, request: &AssetMintRequest) -> Result<UnsignedPsbt, WalletError> {
        let floor = self.policy.dust_floor;
        let recipient_script = script_for_address(&request.to_address, self.network)?;
        let change_script = script_for_address(&request.change_address, self.network)?;

        let frontend_fee = match (&request.frontend_fee_address, request.frontend_fee_amount) {
            (Some(address), Some(amount)) if amount >= floor => {
                Some((script_for_address(address, self.network)?, amount))
            }
            (Some(_), Some(amount)) => {
                debug!("Dropping frontend fee of {} sats below the dust floor", amount);
                None
            }
            _ => None,
        };
        let frontend_amount = frontend_fee.as_ref().map_or(0, |(_, amount)| *amount);

        let mut calldata_values = vec![
            request.asset_id.block,
            request.asset_id.tx,
            u128::from(self.policy.mint_opcode),
        ];
        calldata_values.extend_from_slice(&request.input_data);

        let calldata = self
            .codec
            .encode_calldata(&calldata_values)
            .context("Failed to encode mint calldata")?;
        let metadata = self
            .codec
            .encode_metadata_script(&ProtocolMessage {
                protocol_tag: u128::from(self.policy.protocol_tag),
                edicts: Vec::new(),
                pointer: 0,
                refund_pointer: 0,
                calldata,
            })
            .context("Failed to encode mint metadata")?;

        let asset_utxos = dedup_by_outpoint(request.asset_utxos.clone());
        let committed: HashSet<_> = asset_utxos.iter().map(|u| u.outpoint).collect();
        let candidates = ordinary_candidates(&request.spendable_utxos, &committed, request.utxo_order);

        let outputs = 2 + usize::from(frontend_fee.is_some());
        let script_len = metadata.len();
        let weights = self.policy.size_weights;
        let converged = converge(
            &candidates,
            &FeeTarget {
                fixed_inputs: asset_utxos.len(),
                spend_target: frontend_amount + floor,
                final_reserve: 0,
                fee_rate: request.fee_rate,
                min_fee: self.policy.min_fee,
                fixed_fee: None,
            },
            |inputs| estimate_tx_size(inputs, 0, outputs, &weights) + script_len,
        )?;

        let mut draft = TxDraft::new();
        add_inputs(&mut draft, &asset_utxos, &InputOptions::default())?;
        add_inputs(
            &mut draft,
            &converged.selection.selected,
            &InputOptions {
                pubkey: request.payment_pubkey,
                previous_tx: None,
            },
        )?;

        draft.add_output(recipient_script, floor);
        draft.add_output(metadata, 0);
        if let Some((script, amount)) = frontend_fee {
            draft.add_output(script, amount);
        }

        let spent = draft.output_total() + converged.fee;
        let input_total = draft.input_total();
        let change = input_total
            .checked_sub(spent)
            .ok_or_else(|| WalletError::NegativeChange {
                deficit: spent - input_total,
            })?;

        let mut fee = converged.fee;
        if change >= floor {
            draft.add_output(change_script, change);
        } else {
            debug!("Absorbing {} sats of sub-dust change into the fee", change);
            fee += change;
        }

        info!(
            "Asset mint of {} to {} with {} inputs",
            request.asset_id,
            sanitize_for_logging(&request.to_address),
            draft.input_count()
        );

        seal(draft, fee, &request.sender_pubkey, self.network, "asset mint")
    }
}
