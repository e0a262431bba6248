//! Asset send
//!
//! Moves `amount` of one asset from the sender's address to a recipient.
//! Output layout:
//!
//! | index | value        | pays to         |
//! |-------|--------------|-----------------|
//! | 0     | dust floor   | sender          |
//! | 1     | dust floor   | recipient       |
//! | 2     | 0            | metadata script |
//! | 3     | remainder    | change address  |
//!
//! Output 3 is omitted when the remainder is below the dust floor; the
//! remainder then goes to the fee.
//!
//! The metadata edict sends `amount` to output 1. Unallocated balance and
//! refunds go to output 0, back to the sender.

use std::collections::HashSet;

use bitcoin::PublicKey;
use log::info;
use rust_decimal::Decimal;

use runevault_common::address::script_for_address;
use runevault_common::error::{ErrorContext, WalletError};
use runevault_common::fee_estimation::estimate_tx_size;
use runevault_common::logging::sanitize_for_logging;
use runevault_common::types::{AssetId, UnsignedPsbt, Utxo, UtxoOrder};
use runevault_common::utxo_selection::{asset_divisibility, find_asset_utxos, normalize_asset_amount};

use super::convergence::{converge, FeeTarget};
use super::{add_inputs, ordinary_candidates, seal, PsbtAssembler};
use crate::providers::{Edict, MetadataCodec, ProtocolMessage, UtxoSource};
use crate::psbt::{InputOptions, TxDraft};

const ASSET_SEND_OUTPUTS: usize = 4;
const RECIPIENT_OUTPUT: u32 = 1;

/// Parameters of an asset send
#[derive(Debug, Clone)]
pub struct AssetSendRequest {
    /// Taproot address holding the asset
    pub sender_address: String,
    /// Hex public key behind `sender_address`
    pub sender_pubkey: String,
    pub to_address: String,
    pub change_address: String,
    pub asset_id: AssetId,
    /// Amount in base units
    pub amount: u128,
    /// Fee rate in sat/vB
    pub fee_rate: Decimal,
    /// Fixed fee in satoshis, bypassing estimation
    pub fee_override: Option<u64>,
    /// Ordinary UTXOs available for fees
    pub spendable_utxos: Vec<Utxo>,
    /// Public key for nested segwit payment UTXOs
    pub payment_pubkey: Option<PublicKey>,
    /// Order for both asset and ordinary selection
    pub utxo_order: UtxoOrder,
}

impl<'a, S, C> PsbtAssembler<'a, S, C>
where
    S: UtxoSource + ?Sized,
    C: MetadataCodec + ?Sized,
{
    /// Build an unsigned asset send
    ///
    /// # Errors
    /// * `InvalidArgument` for a zero amount
    /// * `NoAssetUtxos` when the sender holds none of the asset
    /// * `InsufficientAssetBalance` when its balance is below `amount`
    /// * `InsufficientFunds` when ordinary UTXOs cannot cover the fee and
    ///   both carrier outputs
    pub fn create_asset_send_psbt(&self, request: &AssetSendRequest) -> Result<UnsignedPsbt, WalletError> {
        if request.amount == 0 {
            return Err(WalletError::InvalidArgument("Asset amount must be positive".into()));
        }

        let floor = self.policy.dust_floor;
        let sender_script = script_for_address(&request.sender_address, self.network)?;
        let recipient_script = script_for_address(&request.to_address, self.network)?;
        let change_script = script_for_address(&request.change_address, self.network)?;

        let outpoints = self
            .source
            .get_asset_outpoints_by_address(&request.sender_address)
            .context("Failed to fetch asset outpoints")?;

        let divisibility = asset_divisibility(&outpoints, request.asset_id)
            .ok_or_else(|| WalletError::NoAssetUtxos(request.asset_id.to_string()))?;
        let target = normalize_asset_amount(request.amount, divisibility)?;

        let assets = find_asset_utxos(
            &outpoints,
            &request.sender_address,
            request.asset_id,
            request.utxo_order,
            target,
        )?;
        if assets.utxos.is_empty() {
            return Err(WalletError::NoAssetUtxos(request.asset_id.to_string()));
        }

        let asset_utxos: Vec<Utxo> = assets.utxos.iter().map(|a| a.utxo.clone()).collect();
        let committed: HashSet<_> = asset_utxos.iter().map(|u| u.outpoint).collect();
        let candidates = ordinary_candidates(&request.spendable_utxos, &committed, request.utxo_order);

        let weights = self.policy.size_weights;
        let converged = converge(
            &candidates,
            &FeeTarget {
                fixed_inputs: asset_utxos.len(),
                spend_target: floor * 2,
                final_reserve: floor * 2,
                fee_rate: request.fee_rate,
                min_fee: self.policy.min_fee,
                fixed_fee: request.fee_override,
            },
            |inputs| estimate_tx_size(inputs, 0, ASSET_SEND_OUTPUTS, &weights),
        )?;

        let metadata = self
            .codec
            .encode_metadata_script(&ProtocolMessage {
                protocol_tag: u128::from(self.policy.protocol_tag),
                edicts: vec![Edict {
                    id: request.asset_id,
                    amount: request.amount,
                    output: RECIPIENT_OUTPUT,
                }],
                pointer: 0,
                refund_pointer: 0,
                calldata: Vec::new(),
            })
            .context("Failed to encode transfer metadata")?;

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

        draft.add_output(sender_script, floor);
        draft.add_output(recipient_script, floor);
        draft.add_output(metadata, 0);

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
            fee += change;
        }

        info!(
            "Asset send of {} {} to {} using {} asset and {} ordinary inputs",
            request.amount,
            request.asset_id,
            sanitize_for_logging(&request.to_address),
            asset_utxos.len(),
            converged.selection.len()
        );

        seal(draft, fee, &request.sender_pubkey, self.network, "asset send")
    }
}
