mod common;

use bitcoin::{Amount, Network, Witness};
use common::*;
use runevault_common::types::Utxo;
use runevault_common::WalletError;
use runevault_core::psbt::finalize::{taproot_script, x_only_from_hex};
use runevault_core::psbt::{finalize_inputs, InputOptions, TxDraft};

fn sender_utxo(vout: u32) -> Utxo {
    let address = sender_address();
    Utxo::new(
        outpoint(ASSET_TXID, vout),
        Amount::from_sat(546),
        address.to_string(),
        address.script_pubkey(),
    )
}

#[test]
fn test_x_only_from_compressed_and_x_only_hex() {
    let from_compressed = x_only_from_hex(SENDER_PUBKEY).unwrap();
    let from_x_only = x_only_from_hex(&SENDER_PUBKEY[2..]).unwrap();
    assert_eq!(from_compressed, from_x_only);

    assert_eq!(
        taproot_script(from_compressed, Network::Bitcoin),
        sender_address().script_pubkey()
    );
}

#[test]
fn test_x_only_rejects_bad_keys() {
    assert!(matches!(x_only_from_hex("zz"), Err(WalletError::InvalidPublicKey(_))));
    assert!(matches!(x_only_from_hex("0279be"), Err(WalletError::InvalidPublicKey(_))));
    assert!(matches!(
        x_only_from_hex(UNCOMPRESSED_PUBKEY),
        Err(WalletError::InvalidPublicKey(_))
    ));
}

#[test]
fn test_only_matching_inputs_are_tagged() {
    let mut draft = TxDraft::new();
    draft.add_input(&sender_utxo(0), &InputOptions::default()).unwrap();
    draft.add_input(&payment_utxo(0, 5_000), &InputOptions::default()).unwrap();
    draft.add_input(&sender_utxo(1), &InputOptions::default()).unwrap();
    let mut psbt = draft.into_psbt().unwrap();

    let tagged = finalize_inputs(&mut psbt, SENDER_PUBKEY, Network::Bitcoin).unwrap();
    let key = x_only_from_hex(SENDER_PUBKEY).unwrap();

    assert_eq!(tagged, 2);
    assert_eq!(psbt.inputs[0].tap_internal_key, Some(key));
    assert_eq!(psbt.inputs[1].tap_internal_key, None);
    assert_eq!(psbt.inputs[2].tap_internal_key, Some(key));
}

#[test]
fn test_other_keys_do_not_match() {
    let mut draft = TxDraft::new();
    draft.add_input(&sender_utxo(0), &InputOptions::default()).unwrap();
    let mut psbt = draft.into_psbt().unwrap();

    let tagged = finalize_inputs(&mut psbt, PAYMENT_PUBKEY, Network::Bitcoin).unwrap();
    assert_eq!(tagged, 0);
    assert!(psbt.inputs[0].tap_internal_key.is_none());
}

#[test]
fn test_signed_and_tagged_inputs_are_left_alone() {
    let mut draft = TxDraft::new();
    draft.add_input(&sender_utxo(0), &InputOptions::default()).unwrap();
    draft.add_input(&sender_utxo(1), &InputOptions::default()).unwrap();
    let mut psbt = draft.into_psbt().unwrap();

    let other_key = x_only_from_hex(PAYMENT_PUBKEY).unwrap();
    psbt.inputs[0].final_script_witness = Some(Witness::from_slice(&[vec![1u8; 64]]));
    psbt.inputs[1].tap_internal_key = Some(other_key);

    let tagged = finalize_inputs(&mut psbt, SENDER_PUBKEY, Network::Bitcoin).unwrap();
    assert_eq!(tagged, 0);
    assert!(psbt.inputs[0].tap_internal_key.is_none());
    assert_eq!(psbt.inputs[1].tap_internal_key, Some(other_key));
}

#[test]
fn test_finalization_is_idempotent() {
    let mut draft = TxDraft::new();
    draft.add_input(&sender_utxo(0), &InputOptions::default()).unwrap();
    let mut psbt = draft.into_psbt().unwrap();

    assert_eq!(finalize_inputs(&mut psbt, SENDER_PUBKEY, Network::Bitcoin).unwrap(), 1);
    let once = psbt.clone();
    assert_eq!(finalize_inputs(&mut psbt, SENDER_PUBKEY, Network::Bitcoin).unwrap(), 0);
    assert_eq!(psbt, once);
}
