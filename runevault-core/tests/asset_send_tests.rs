mod common;

use std::collections::HashSet;

use bitcoin::Network;
use common::*;
use runevault_common::config::AssemblyPolicy;
use runevault_common::fee_estimation::estimate_tx_size;
use runevault_common::types::{AssetId, UtxoOrder};
use runevault_common::WalletError;
use runevault_core::assembly::{AssetSendRequest, PsbtAssembler};
use runevault_core::providers::{Edict, ProviderError};
use runevault_core::psbt::decode_psbt;
use runevault_core::psbt::finalize::x_only_from_hex;
use rust_decimal_macros::dec;

fn request(amount: u128, spendable: Vec<runevault_common::types::Utxo>) -> AssetSendRequest {
    AssetSendRequest {
        sender_address: sender_address().to_string(),
        sender_pubkey: SENDER_PUBKEY.to_string(),
        to_address: RECIPIENT.to_string(),
        change_address: payment_address().to_string(),
        asset_id: asset(),
        amount,
        fee_rate: dec!(2),
        fee_override: None,
        spendable_utxos: spendable,
        payment_pubkey: None,
        utxo_order: UtxoOrder::GreatestToLeast,
    }
}

fn source_with(outpoints: Vec<runevault_common::types::AssetOutpoint>) -> MockSource {
    MockSource {
        asset_outpoints: outpoints,
        ..Default::default()
    }
}

#[test]
fn test_single_asset_input_layout() {
    let source = source_with(vec![asset_outpoint(0, 546, 100, 0)]);
    let codec = MockCodec::default();
    let assembler = PsbtAssembler::new(&source, &codec, Network::Bitcoin);

    let unsigned = assembler
        .create_asset_send_psbt(&request(40, vec![payment_utxo(0, 10_000)]))
        .unwrap();

    // Two inputs, four outputs: 10 + 2*64 + 4*40 = 298 bytes at 2 sat/vB
    assert_eq!(unsigned.fee, 596);

    let psbt = decode_psbt(Some(&unsigned.psbt_hex), None).unwrap();
    let tx = &psbt.unsigned_tx;
    assert_eq!(tx.input.len(), 2);
    assert_eq!(tx.input[0].previous_output, outpoint(ASSET_TXID, 0));
    assert_eq!(tx.input[1].previous_output, outpoint(FUNDING_TXID, 0));

    assert_eq!(tx.output.len(), 4);
    assert_eq!(tx.output[0].script_pubkey, sender_address().script_pubkey());
    assert_eq!(tx.output[0].value, 546);
    assert_eq!(tx.output[1].value, 546);
    assert!(tx.output[1].script_pubkey.is_v1_p2tr());
    assert_eq!(tx.output[2].value, 0);
    assert_eq!(tx.output[2].script_pubkey, MockCodec::script());
    assert_eq!(tx.output[3].script_pubkey, payment_address().script_pubkey());
    assert_eq!(tx.output[3].value, 10_546 - 1_092 - 596);
}

#[test]
fn test_metadata_routes_amount_to_recipient() {
    let source = source_with(vec![asset_outpoint(0, 546, 100, 0)]);
    let codec = MockCodec::default();
    let assembler = PsbtAssembler::new(&source, &codec, Network::Bitcoin);

    assembler
        .create_asset_send_psbt(&request(40, vec![payment_utxo(0, 10_000)]))
        .unwrap();

    let messages = codec.messages.borrow();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].protocol_tag, 1);
    assert_eq!(
        messages[0].edicts,
        vec![Edict {
            id: asset(),
            amount: 40,
            output: 1
        }]
    );
    assert_eq!(messages[0].pointer, 0);
    assert_eq!(messages[0].refund_pointer, 0);
    assert!(messages[0].calldata.is_empty());
}

#[test]
fn test_value_is_conserved_and_fee_round_trips() {
    let source = source_with(vec![
        asset_outpoint(0, 546, 30, 0),
        asset_outpoint(1, 600, 30, 0),
    ]);
    let codec = MockCodec::default();
    let assembler = PsbtAssembler::new(&source, &codec, Network::Bitcoin);

    let spendable = vec![payment_utxo(0, 700), payment_utxo(1, 800), payment_utxo(2, 900)];
    let unsigned = assembler.create_asset_send_psbt(&request(50, spendable)).unwrap();

    let psbt = decode_psbt(None, Some(&unsigned.psbt_base64)).unwrap();
    let input_total: u64 = psbt
        .inputs
        .iter()
        .map(|i| i.witness_utxo.as_ref().unwrap().value)
        .sum();
    assert_eq!(input_total, sum_outputs(&psbt.unsigned_tx) + unsigned.fee);
    assert!(unsigned.fee >= 250);

    let outpoints: HashSet<_> = psbt.unsigned_tx.input.iter().map(|i| i.previous_output).collect();
    assert_eq!(outpoints.len(), psbt.unsigned_tx.input.len());

    // Fee matches the size model for the input count actually emitted
    let expected = estimate_tx_size(psbt.unsigned_tx.input.len(), 0, 4, &Default::default()) as u64 * 2;
    assert_eq!(unsigned.fee, expected);
}

#[test]
fn test_asset_outpoint_not_reused_as_fee_input() {
    let asset_op = asset_outpoint(0, 20_000, 100, 0);
    let address = sender_address();
    // Indexer reported the asset outpoint among the spendable UTXOs without its asset flag
    let leaked = runevault_common::types::Utxo::new(
        asset_op.outpoint,
        asset_op.value,
        address.to_string(),
        address.script_pubkey(),
    );
    let source = source_with(vec![asset_op]);
    let codec = MockCodec::default();
    let assembler = PsbtAssembler::new(&source, &codec, Network::Bitcoin);

    let unsigned = assembler
        .create_asset_send_psbt(&request(10, vec![leaked, payment_utxo(0, 5_000)]))
        .unwrap();

    let psbt = decode_psbt(Some(&unsigned.psbt_hex), None).unwrap();
    let outpoints: Vec<_> = psbt.unsigned_tx.input.iter().map(|i| i.previous_output).collect();
    assert_eq!(outpoints, vec![outpoint(ASSET_TXID, 0), outpoint(FUNDING_TXID, 0)]);
}

#[test]
fn test_sender_inputs_are_tagged() {
    let source = source_with(vec![asset_outpoint(0, 546, 100, 0)]);
    let codec = MockCodec::default();
    let assembler = PsbtAssembler::new(&source, &codec, Network::Bitcoin);

    let unsigned = assembler
        .create_asset_send_psbt(&request(1, vec![payment_utxo(0, 10_000)]))
        .unwrap();
    let psbt = decode_psbt(Some(&unsigned.psbt_hex), None).unwrap();

    assert_eq!(psbt.inputs[0].tap_internal_key, Some(x_only_from_hex(SENDER_PUBKEY).unwrap()));
    assert!(psbt.inputs[1].tap_internal_key.is_none());
}

#[test]
fn test_fee_override() {
    let source = source_with(vec![asset_outpoint(0, 546, 100, 0)]);
    let codec = MockCodec::default();
    let assembler = PsbtAssembler::new(&source, &codec, Network::Bitcoin);

    let mut req = request(40, vec![payment_utxo(0, 10_000)]);
    req.fee_override = Some(1_000);
    let unsigned = assembler.create_asset_send_psbt(&req).unwrap();

    assert_eq!(unsigned.fee, 1_000);
    let psbt = decode_psbt(Some(&unsigned.psbt_hex), None).unwrap();
    assert_eq!(psbt.unsigned_tx.output[3].value, 10_546 - 1_092 - 1_000);
}

#[test]
fn test_sub_floor_change_is_absorbed_without_override() {
    // A 330-sat taproot carrier leaves 330 sats of change, below the floor
    let source = source_with(vec![asset_outpoint(0, 330, 100, 0)]);
    let codec = MockCodec::default();
    let assembler = PsbtAssembler::new(&source, &codec, Network::Bitcoin);

    let unsigned = assembler
        .create_asset_send_psbt(&request(40, vec![payment_utxo(0, 596 + 1_092)]))
        .unwrap();

    // 596 from the size model plus the 330 absorbed
    assert_eq!(unsigned.fee, 926);

    let psbt = decode_psbt(Some(&unsigned.psbt_hex), None).unwrap();
    let tx = &psbt.unsigned_tx;
    assert_eq!(tx.input.len(), 2);
    let values: Vec<u64> = tx.output.iter().map(|o| o.value).collect();
    assert_eq!(values, vec![546, 546, 0]);
    assert_eq!(330 + 1_688, sum_outputs(tx) + unsigned.fee);
}

#[test]
fn test_change_at_floor_is_emitted() {
    let source = source_with(vec![asset_outpoint(0, 330, 100, 0)]);
    let codec = MockCodec::default();
    let assembler = PsbtAssembler::new(&source, &codec, Network::Bitcoin);

    let unsigned = assembler
        .create_asset_send_psbt(&request(40, vec![payment_utxo(0, 596 + 1_092 + 216)]))
        .unwrap();

    assert_eq!(unsigned.fee, 596);
    let psbt = decode_psbt(Some(&unsigned.psbt_hex), None).unwrap();
    assert_eq!(psbt.unsigned_tx.output.len(), 4);
    assert_eq!(psbt.unsigned_tx.output[3].value, 546);
}

#[test]
fn test_divisible_amount_uses_base_units() {
    // 2.5 units at divisibility 8
    let source = source_with(vec![
        asset_outpoint(0, 546, 200_000_000, 8),
        asset_outpoint(1, 546, 100_000_000, 8),
    ]);
    let codec = MockCodec::default();
    let assembler = PsbtAssembler::new(&source, &codec, Network::Bitcoin);

    let unsigned = assembler
        .create_asset_send_psbt(&request(250_000_000, vec![payment_utxo(0, 10_000)]))
        .unwrap();

    let psbt = decode_psbt(Some(&unsigned.psbt_hex), None).unwrap();
    assert_eq!(psbt.unsigned_tx.input.len(), 3);
    assert_eq!(codec.messages.borrow()[0].edicts[0].amount, 250_000_000);
}

#[test]
fn test_custom_policy() {
    let source = source_with(vec![asset_outpoint(0, 1_000, 100, 0)]);
    let codec = MockCodec::default();
    let policy = AssemblyPolicy {
        dust_floor: 1_000,
        protocol_tag: 13,
        ..Default::default()
    };
    let assembler = PsbtAssembler::with_policy(&source, &codec, Network::Bitcoin, policy);
    assert_eq!(assembler.policy().dust_floor, 1_000);
    assert_eq!(assembler.network(), Network::Bitcoin);

    let unsigned = assembler
        .create_asset_send_psbt(&request(40, vec![payment_utxo(0, 10_000)]))
        .unwrap();
    let psbt = decode_psbt(Some(&unsigned.psbt_hex), None).unwrap();

    assert_eq!(psbt.unsigned_tx.output[0].value, 1_000);
    assert_eq!(psbt.unsigned_tx.output[1].value, 1_000);
    assert_eq!(codec.messages.borrow()[0].protocol_tag, 13);
}

#[test]
fn test_zero_amount_rejected() {
    let source = source_with(vec![asset_outpoint(0, 546, 100, 0)]);
    let codec = MockCodec::default();
    let assembler = PsbtAssembler::new(&source, &codec, Network::Bitcoin);

    let err = assembler
        .create_asset_send_psbt(&request(0, vec![payment_utxo(0, 10_000)]))
        .unwrap_err();
    assert!(matches!(err, WalletError::InvalidArgument(_)));
}

#[test]
fn test_asset_not_held() {
    let mut other = asset_outpoint(0, 546, 100, 0);
    other.balances[0].id = AssetId::new(5, 5);
    let source = source_with(vec![other]);
    let codec = MockCodec::default();
    let assembler = PsbtAssembler::new(&source, &codec, Network::Bitcoin);

    let err = assembler
        .create_asset_send_psbt(&request(1, vec![payment_utxo(0, 10_000)]))
        .unwrap_err();
    assert!(matches!(err, WalletError::NoAssetUtxos(_)));
}

#[test]
fn test_asset_balance_too_small() {
    let source = source_with(vec![asset_outpoint(0, 546, 100, 0)]);
    let codec = MockCodec::default();
    let assembler = PsbtAssembler::new(&source, &codec, Network::Bitcoin);

    let err = assembler
        .create_asset_send_psbt(&request(101, vec![payment_utxo(0, 10_000)]))
        .unwrap_err();
    assert!(matches!(err, WalletError::InsufficientAssetBalance { .. }));
    assert!(codec.messages.borrow().is_empty());
}

#[test]
fn test_not_enough_for_fees() {
    let source = source_with(vec![asset_outpoint(0, 546, 100, 0)]);
    let codec = MockCodec::default();
    let assembler = PsbtAssembler::new(&source, &codec, Network::Bitcoin);

    let err = assembler.create_asset_send_psbt(&request(1, Vec::new())).unwrap_err();
    assert!(matches!(err, WalletError::InsufficientFunds { available: 0, .. }));

    let err = assembler
        .create_asset_send_psbt(&request(1, vec![payment_utxo(0, 1_200)]))
        .unwrap_err();
    match err {
        WalletError::InsufficientFunds { needed, available } => {
            assert_eq!(needed, 596 + 1_092);
            assert_eq!(available, 1_200);
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_indexer_failure_is_reported() {
    let source = MockSource {
        failure: Some(ProviderError::Unavailable("indexer offline".into())),
        ..Default::default()
    };
    let codec = MockCodec::default();
    let assembler = PsbtAssembler::new(&source, &codec, Network::Bitcoin);

    let err = assembler
        .create_asset_send_psbt(&request(1, vec![payment_utxo(0, 10_000)]))
        .unwrap_err();
    assert!(matches!(err, WalletError::Collaborator { .. }));
    assert!(err.to_string().starts_with("Failed to fetch asset outpoints"));
}

#[test]
fn test_invalid_recipient() {
    let source = source_with(vec![asset_outpoint(0, 546, 100, 0)]);
    let codec = MockCodec::default();
    let assembler = PsbtAssembler::new(&source, &codec, Network::Bitcoin);

    let mut req = request(1, vec![payment_utxo(0, 10_000)]);
    req.to_address = "tb1qw508d6qejxtdg4y5r3zarvary0c5xw7kxpjzsx".to_string();
    let err = assembler.create_asset_send_psbt(&req).unwrap_err();
    assert!(matches!(err, WalletError::InvalidAddress(_)));
}
