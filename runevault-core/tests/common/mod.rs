//! Shared fixtures and in-memory collaborators for the integration tests

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::str::FromStr;

use bitcoin::blockdata::opcodes::all::{OP_PUSHNUM_13, OP_RETURN};
use bitcoin::blockdata::script::Builder;
use bitcoin::consensus::encode::deserialize;
use bitcoin::secp256k1::Secp256k1;
use bitcoin::{Address, Amount, Network, OutPoint, PublicKey, ScriptBuf, Transaction, Txid};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use runevault_common::types::{
    AssetBalance, AssetId, AssetOutpoint, FeeRecommendation, FormattedUtxo, InscriptionInfo, Utxo,
};
use runevault_core::providers::{
    Broadcaster, FeeRateSource, MetadataCodec, ProtocolMessage, ProviderError, PsbtSigner,
    SignRequest, SignedPsbt, UtxoSource,
};

/// Generator point, compressed
pub const SENDER_PUBKEY: &str = "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";
/// 2G, compressed
pub const PAYMENT_PUBKEY: &str = "02c6047f9441ed7d6d3045406e95c07cd85c778e4b8cef3ca7abac09b95c709ee5";
/// Generator point, uncompressed
pub const UNCOMPRESSED_PUBKEY: &str = "0479be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798483ada7726a3c4655da4fbfc0e1108a8fd17b448a68554199c47d08ffb10d4b8";

pub const RECIPIENT: &str = "bc1p0xlxvlhemja6c4dqv22uapctqupfhlxm9h8z3k2e72q4k9hcz7vqzk5jj0";
pub const FUNDING_TXID: &str = "7967a5185e907a25225574544c31f7b059c1a191d65b53dcc1554d339c4f9efc";
pub const ASSET_TXID: &str = "9dcbf5a86b4e70be97fc5c953ad4111dfe0a94ea6768286e5efd6c35fd9ec9d1";
pub const INSCRIPTION_TXID: &str = "4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b";

pub fn pubkey(hex: &str) -> PublicKey {
    PublicKey::from_str(hex).unwrap()
}

/// Key-path taproot address of the sender key
pub fn sender_address() -> Address {
    let secp = Secp256k1::verification_only();
    let xonly = pubkey(SENDER_PUBKEY).inner.x_only_public_key().0;
    Address::p2tr(&secp, xonly, None, Network::Bitcoin)
}

/// Native segwit address of the payment key
pub fn payment_address() -> Address {
    Address::p2wpkh(&pubkey(PAYMENT_PUBKEY), Network::Bitcoin).unwrap()
}

pub fn asset() -> AssetId {
    AssetId::new(2, 1)
}

pub fn outpoint(txid: &str, vout: u32) -> OutPoint {
    OutPoint::new(Txid::from_str(txid).unwrap(), vout)
}

/// Ordinary UTXO at the payment address
pub fn payment_utxo(vout: u32, sats: u64) -> Utxo {
    let address = payment_address();
    Utxo::new(
        outpoint(FUNDING_TXID, vout),
        Amount::from_sat(sats),
        address.to_string(),
        address.script_pubkey(),
    )
}

/// Outpoint at the sender address holding `balance` of [`asset`]
pub fn asset_outpoint(vout: u32, sats: u64, balance: u128, divisibility: u8) -> AssetOutpoint {
    AssetOutpoint {
        outpoint: outpoint(ASSET_TXID, vout),
        value: Amount::from_sat(sats),
        script_pubkey: sender_address().script_pubkey(),
        balances: vec![AssetBalance {
            id: asset(),
            balance,
            divisibility,
            name: Some("TEST".to_string()),
            symbol: Some("T".to_string()),
        }],
    }
}

pub fn formatted(utxo: &Utxo) -> FormattedUtxo {
    FormattedUtxo {
        tx_hash: utxo.outpoint.txid.to_string(),
        tx_output_index: utxo.outpoint.vout,
        btc_value: utxo.value(),
        address: utxo.address.clone(),
        script_pub_key: hex::encode(utxo.script_pubkey.as_bytes()),
        inscriptions: utxo.inscriptions.clone(),
        runes: Vec::new(),
        alkanes: Vec::new(),
    }
}

pub fn sum_outputs(tx: &Transaction) -> u64 {
    tx.output.iter().map(|o| o.value).sum()
}

/// Indexer backed by fixed data
#[derive(Default)]
pub struct MockSource {
    pub utxos: HashMap<String, Vec<FormattedUtxo>>,
    pub asset_outpoints: Vec<AssetOutpoint>,
    pub inscriptions: HashMap<String, InscriptionInfo>,
    pub failure: Option<ProviderError>,
}

impl MockSource {
    fn check(&self) -> Result<(), ProviderError> {
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

impl UtxoSource for MockSource {
    fn get_formatted_utxos(&self, address: &str) -> Result<Vec<FormattedUtxo>, ProviderError> {
        self.check()?;
        Ok(self.utxos.get(address).cloned().unwrap_or_default())
    }

    fn get_asset_outpoints_by_address(&self, _address: &str) -> Result<Vec<AssetOutpoint>, ProviderError> {
        self.check()?;
        Ok(self.asset_outpoints.clone())
    }

    // Unknown ids are dropped, like an index that has not seen them yet
    fn get_inscription_info(&self, ids: &[String]) -> Result<Vec<InscriptionInfo>, ProviderError> {
        self.check()?;
        Ok(ids.iter().filter_map(|id| self.inscriptions.get(id).cloned()).collect())
    }
}

/// Fee service with a fixed recommendation
pub struct MockFeeSource {
    pub fastest: Decimal,
    pub failure: Option<ProviderError>,
}

impl Default for MockFeeSource {
    fn default() -> Self {
        Self {
            fastest: dec!(2),
            failure: None,
        }
    }
}

impl FeeRateSource for MockFeeSource {
    fn get_recommended_fee_rate(&self, _network: Network) -> Result<FeeRecommendation, ProviderError> {
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        Ok(FeeRecommendation {
            fastest: self.fastest,
            half_hour: dec!(1.5),
            hour: dec!(1.2),
            economy: dec!(1),
            minimum: dec!(1),
        })
    }
}

/// Signer that echoes the PSBT back untouched, or declines
#[derive(Default)]
pub struct MockSigner {
    pub decline: bool,
    pub requests: RefCell<Vec<SignRequest>>,
}

impl PsbtSigner for MockSigner {
    fn sign_psbt(&self, request: &SignRequest) -> Result<Option<SignedPsbt>, ProviderError> {
        self.requests.borrow_mut().push(request.clone());
        if self.decline {
            return Ok(None);
        }
        Ok(Some(SignedPsbt {
            signed_psbt_hex: None,
            signed_psbt_base64: Some(request.psbt_base64.clone()),
            txid: None,
        }))
    }
}

/// Broadcaster that records raw transactions and reports their txid
#[derive(Default)]
pub struct MockBroadcaster {
    pub sent: RefCell<Vec<String>>,
}

impl Broadcaster for MockBroadcaster {
    fn broadcast(&self, raw_tx_hex: &str, _network: Network) -> Result<Txid, ProviderError> {
        self.sent.borrow_mut().push(raw_tx_hex.to_string());
        let bytes = hex::decode(raw_tx_hex).map_err(|e| ProviderError::Request(e.to_string()))?;
        let tx: Transaction =
            deserialize(&bytes).map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        Ok(tx.txid())
    }
}

/// Codec emitting `OP_RETURN OP_13` and recording what it was asked to encode
#[derive(Default)]
pub struct MockCodec {
    pub messages: RefCell<Vec<ProtocolMessage>>,
    pub calldata: RefCell<Vec<Vec<u128>>>,
}

impl MockCodec {
    pub fn script() -> ScriptBuf {
        Builder::new()
            .push_opcode(OP_RETURN)
            .push_opcode(OP_PUSHNUM_13)
            .into_script()
    }
}

impl MetadataCodec for MockCodec {
    fn encode_metadata_script(&self, message: &ProtocolMessage) -> Result<ScriptBuf, ProviderError> {
        self.messages.borrow_mut().push(message.clone());
        Ok(Self::script())
    }

    fn encode_calldata(&self, values: &[u128]) -> Result<Vec<u8>, ProviderError> {
        self.calldata.borrow_mut().push(values.to_vec());
        Ok(values.iter().map(|v| *v as u8).collect())
    }
}
