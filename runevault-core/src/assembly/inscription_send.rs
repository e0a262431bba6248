//! Inscription send
//!
//! Each inscription's output is spent whole and recreated at the
//! destination with the same value, so the inscribed sat keeps its offset.
//! Ordinary UTXOs pay the fee and the remainder returns as change.

use std::collections::HashSet;
use std::str::FromStr;

use bitcoin::{Amount, PublicKey};
use log::{debug, info};
use rust_decimal::Decimal;

use runevault_common::address::script_for_address;
use runevault_common::error::{ErrorContext, WalletError};
use runevault_common::fee_estimation::estimate_tx_size;
use runevault_common::types::{InscriptionInfo, Satpoint, UnsignedPsbt, Utxo, UtxoOrder};

use super::convergence::{converge, FeeTarget};
use super::{add_inputs, ordinary_candidates, seal, PsbtAssembler};
use crate::providers::{MetadataCodec, UtxoSource};
use crate::psbt::{InputOptions, TxDraft};

/// Parameters of an inscription send
#[derive(Debug, Clone)]
pub struct InscriptionSendRequest {
    pub inscription_ids: Vec<String>,
    /// Ordinals address holding the inscriptions
    pub from_address: String,
    /// Hex public key behind `from_address`
    pub sender_pubkey: String,
    pub to_address: String,
    pub change_address: String,
    pub fee_rate: Decimal,
    /// Ordinary UTXOs available for fees
    pub spendable_utxos: Vec<Utxo>,
    pub payment_pubkey: Option<PublicKey>,
    pub utxo_order: UtxoOrder,
}

/// Turn one inscription lookup into the UTXO that carries it
fn inscription_utxo(
    id: &str,
    info: &InscriptionInfo,
    from_address: &str,
    from_script: &bitcoin::ScriptBuf,
) -> Result<Utxo, WalletError> {
    let value = info
        .value
        .ok_or_else(|| WalletError::MissingInscriptionData(format!("{} has no output value", id)))?;
    let satpoint = info
        .satpoint
        .as_deref()
        .ok_or_else(|| WalletError::MissingInscriptionData(format!("{} has no satpoint", id)))?;
    let satpoint = Satpoint::from_str(satpoint)?;

    let owner = info.address.clone().unwrap_or_else(|| from_address.to_string());
    Ok(Utxo::new(satpoint.outpoint, Amount::from_sat(value), owner, from_script.clone())
        .with_inscriptions(vec![id.to_string()]))
}

impl<'a, S, C> PsbtAssembler<'a, S, C>
where
    S: UtxoSource + ?Sized,
    C: MetadataCodec + ?Sized,
{
    /// Build an unsigned transfer of one or more inscriptions
    ///
    /// Inscriptions sharing an output move together through a single input
    /// and output.
    ///
    /// # Errors
    /// * `InvalidArgument` for an empty id list
    /// * `MissingInscriptionData` when a lookup lacks a value or satpoint
    /// * `MalformedSatpoint` when a satpoint does not parse
    /// * `InsufficientFunds` when ordinary UTXOs cannot cover the fee and
    ///   a dust-floor change output
    pub fn create_inscriptions_send_psbt(
        &self,
        request: &InscriptionSendRequest,
    ) -> Result<UnsignedPsbt, WalletError> {
        if request.inscription_ids.is_empty() {
            return Err(WalletError::InvalidArgument("No inscriptions to send".into()));
        }

        let floor = self.policy.dust_floor;
        let from_script = script_for_address(&request.from_address, self.network)?;
        let recipient_script = script_for_address(&request.to_address, self.network)?;
        let change_script = script_for_address(&request.change_address, self.network)?;

        let infos = self
            .source
            .get_inscription_info(&request.inscription_ids)
            .context("Failed to fetch inscription info")?;
        if infos.len() != request.inscription_ids.len() {
            return Err(WalletError::MissingInscriptionData(format!(
                "Requested {} inscriptions, index returned {}",
                request.inscription_ids.len(),
                infos.len()
            )));
        }

        let mut committed = HashSet::new();
        let mut inscription_utxos = Vec::with_capacity(infos.len());
        for (id, info) in request.inscription_ids.iter().zip(&infos) {
            let utxo = inscription_utxo(id, info, &request.from_address, &from_script)?;
            if committed.insert(utxo.outpoint) {
                inscription_utxos.push(utxo);
            } else {
                debug!("Inscription {} shares an output already being sent", id);
            }
        }

        let candidates = ordinary_candidates(&request.spendable_utxos, &committed, request.utxo_order);

        let outputs = inscription_utxos.len() + 1;
        let weights = self.policy.size_weights;
        let converged = converge(
            &candidates,
            &FeeTarget {
                fixed_inputs: inscription_utxos.len(),
                spend_target: floor,
                final_reserve: floor,
                fee_rate: request.fee_rate,
                min_fee: self.policy.min_fee,
                fixed_fee: None,
            },
            |inputs| estimate_tx_size(inputs, 0, outputs, &weights),
        )?;

        let mut draft = TxDraft::new();
        add_inputs(&mut draft, &inscription_utxos, &InputOptions::default())?;
        add_inputs(
            &mut draft,
            &converged.selection.selected,
            &InputOptions {
                pubkey: request.payment_pubkey,
                previous_tx: None,
            },
        )?;

        for utxo in &inscription_utxos {
            draft.add_output(recipient_script.clone(), utxo.value());
        }

        // Ordinary inputs cover fee plus the floor, so change is at least the floor
        let spent = draft.output_total() + converged.fee;
        let input_total = draft.input_total();
        let change = input_total
            .checked_sub(spent)
            .ok_or_else(|| WalletError::NegativeChange {
                deficit: spent - input_total,
            })?;
        draft.add_output(change_script, change);

        info!(
            "Inscription send of {} outputs with {} ordinary inputs",
            inscription_utxos.len(),
            converged.selection.len()
        );

        seal(draft, converged.fee, &request.sender_pubkey, self.network, "inscription send")
    }
}
