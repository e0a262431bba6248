//! Transaction assemblers
//!
//! [`PsbtAssembler`] builds the three unsigned transaction shapes the
//! wallet produces: asset sends, asset mints and inscription sends. Each
//! call follows the same path:
//!
//! 1. gather the committed inputs (asset or inscription UTXOs)
//! 2. run fee convergence over the ordinary UTXOs
//! 3. append inputs and outputs to a fresh [`TxDraft`]
//! 4. backfill taproot internal keys and serialize
//!
//! All state lives in the call. Two concurrent assemblies are only safe
//! when the caller hands them disjoint UTXO snapshots.

pub mod asset_mint;
pub mod asset_send;
pub mod convergence;
pub mod inscription_send;

use std::collections::HashSet;

use bitcoin::{Network, OutPoint};
use serde_json::json;

use runevault_common::config::AssemblyPolicy;
use runevault_common::error::WalletError;
use runevault_common::logging::{log_transaction, LogLevel};
use runevault_common::types::{UnsignedPsbt, Utxo, UtxoOrder};
use runevault_common::utxo_selection::{filter_spendable, sort_utxos};

use crate::providers::{MetadataCodec, UtxoSource};
use crate::psbt::{encode_psbt, finalize_inputs, InputOptions, TxDraft};

pub use asset_mint::AssetMintRequest;
pub use asset_send::AssetSendRequest;
pub use convergence::{converge, Converged, FeeTarget};
pub use inscription_send::InscriptionSendRequest;

/// Builds unsigned PSBTs against an indexer and a metadata codec
pub struct PsbtAssembler<'a, S, C>
where
    S: UtxoSource + ?Sized,
    C: MetadataCodec + ?Sized,
{
    source: &'a S,
    codec: &'a C,
    policy: AssemblyPolicy,
    network: Network,
}

impl<'a, S, C> PsbtAssembler<'a, S, C>
where
    S: UtxoSource + ?Sized,
    C: MetadataCodec + ?Sized,
{
    pub fn new(source: &'a S, codec: &'a C, network: Network) -> Self {
        Self::with_policy(source, codec, network, AssemblyPolicy::default())
    }

    pub fn with_policy(source: &'a S, codec: &'a C, network: Network, policy: AssemblyPolicy) -> Self {
        Self {
            source,
            codec,
            policy,
            network,
        }
    }

    pub fn policy(&self) -> &AssemblyPolicy {
        &self.policy
    }

    pub fn network(&self) -> Network {
        self.network
    }
}

/// Ordinary candidates for fee coverage
///
/// Drops UTXOs holding inscriptions or assets, outpoints already committed
/// as inputs, and repeated outpoints, then applies `order`.
pub(crate) fn ordinary_candidates(
    utxos: &[Utxo],
    committed: &HashSet<OutPoint>,
    order: UtxoOrder,
) -> Vec<Utxo> {
    let mut seen = committed.clone();
    let unique: Vec<Utxo> = filter_spendable(utxos)
        .selected
        .into_iter()
        .filter(|utxo| seen.insert(utxo.outpoint))
        .collect();

    sort_utxos(&unique, order)
}

/// Keep the first UTXO for each outpoint
pub(crate) fn dedup_by_outpoint(utxos: Vec<Utxo>) -> Vec<Utxo> {
    let mut seen = HashSet::new();
    utxos
        .into_iter()
        .filter(|utxo| seen.insert(utxo.outpoint))
        .collect()
}

/// Append every UTXO as an input
///
/// Callers deduplicate beforehand, so a skipped duplicate here means the
/// fee was computed for the wrong input count.
pub(crate) fn add_inputs(
    draft: &mut TxDraft,
    utxos: &[Utxo],
    options: &InputOptions,
) -> Result<(), WalletError> {
    for utxo in utxos {
        if !draft.add_input(utxo, options)? {
            return Err(WalletError::InvalidUtxo(format!(
                "Outpoint {} selected twice",
                utxo.id()
            )));
        }
    }
    Ok(())
}

/// Finalization pass and serialization shared by every assembler
pub(crate) fn seal(
    draft: TxDraft,
    fee: u64,
    sender_pubkey_hex: &str,
    network: Network,
    kind: &str,
) -> Result<UnsignedPsbt, WalletError> {
    let inputs = draft.input_count();
    let outputs = draft.output_count();
    let input_total = draft.input_total();

    let mut psbt = draft.into_psbt()?;
    let tagged = finalize_inputs(&mut psbt, sender_pubkey_hex, network)?;

    log_transaction(
        LogLevel::Info,
        &format!("assembled {} psbt", kind),
        Some(json!({
            "inputs": inputs,
            "outputs": outputs,
            "input_total": input_total,
            "fee": fee,
            "tagged_inputs": tagged,
        })),
    );

    Ok(encode_psbt(&psbt, fee))
}
