//! Taproot internal-key backfill
//!
//! Inputs spending the sender's own key-path taproot output need
//! `tap_internal_key` before a signer will sign them. Construction does not
//! always know which inputs those are, so this pass recognises them by
//! script: the witness output must be exactly the P2TR script of the
//! sender's x-only key.

use bitcoin::psbt::PartiallySignedTransaction as Psbt;
use bitcoin::secp256k1::{self, Secp256k1, XOnlyPublicKey};
use bitcoin::{Address, Network, ScriptBuf};
use log::debug;

use runevault_common::error::WalletError;

/// X-only key from a 33-byte compressed or 32-byte x-only hex key
pub fn x_only_from_hex(pubkey_hex: &str) -> Result<XOnlyPublicKey, WalletError> {
    let bytes = hex::decode(pubkey_hex)
        .map_err(|e| WalletError::InvalidPublicKey(format!("Invalid hex: {}", e)))?;

    match bytes.len() {
        33 => secp256k1::PublicKey::from_slice(&bytes)
            .map(|key| key.x_only_public_key().0)
            .map_err(|e| WalletError::InvalidPublicKey(e.to_string())),
        32 => XOnlyPublicKey::from_slice(&bytes)
            .map_err(|e| WalletError::InvalidPublicKey(e.to_string())),
        len => Err(WalletError::InvalidPublicKey(format!(
            "Expected 32 or 33 bytes, got {}",
            len
        ))),
    }
}

/// Key-path P2TR locking script for `internal_key` on `network`
pub fn taproot_script(internal_key: XOnlyPublicKey, network: Network) -> ScriptBuf {
    let secp = Secp256k1::verification_only();
    Address::p2tr(&secp, internal_key, None, network).script_pubkey()
}

/// Tag the sender's own taproot inputs with their internal key
///
/// An input is tagged only when it is not yet finalized, has no internal
/// key, and its witness output script matches the sender's key-path P2TR
/// script byte for byte. Other inputs are left untouched.
///
/// Returns the number of inputs tagged.
pub fn finalize_inputs(
    psbt: &mut Psbt,
    sender_pubkey_hex: &str,
    network: Network,
) -> Result<usize, WalletError> {
    let internal_key = x_only_from_hex(sender_pubkey_hex)?;
    let sender_script = taproot_script(internal_key, network);

    let mut tagged = 0;
    for input in psbt.inputs.iter_mut() {
        let signed = input.final_script_sig.is_some() || input.final_script_witness.is_some();
        if signed || input.tap_internal_key.is_some() {
            continue;
        }

        let matches_sender = input
            .witness_utxo
            .as_ref()
            .map_or(false, |utxo| utxo.script_pubkey == sender_script);

        if matches_sender {
            input.tap_internal_key = Some(internal_key);
            tagged += 1;
        }
    }

    debug!("Tagged {} of {} inputs with the sender's internal key", tagged, psbt.inputs.len());
    Ok(tagged)
}
