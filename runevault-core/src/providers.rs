//! Contracts for the external collaborators used during assembly
//!
//! Indexers, the fee-rate service, the signer, the broadcaster and the
//! protocol-metadata codec all live outside this crate. Each is a
//! synchronous trait and is called at most a few times per assembly, in
//! sequence. A failure is a [`ProviderError`] and aborts the assembly.

use bitcoin::{Network, ScriptBuf, Txid};
use serde::{Deserialize, Serialize};

use runevault_common::types::{AssetId, AssetOutpoint, FeeRecommendation, FormattedUtxo, InscriptionInfo};
pub use runevault_common::error::ProviderError;

/// UTXO, asset and inscription indexer
pub trait UtxoSource {
    /// All UTXOs owned by `address`, as reported by the indexer
    fn get_formatted_utxos(&self, address: &str) -> Result<Vec<FormattedUtxo>, ProviderError>;

    /// Outpoints owned by `address` with the asset balances each one holds
    fn get_asset_outpoints_by_address(
        &self,
        address: &str,
    ) -> Result<Vec<AssetOutpoint>, ProviderError>;

    /// Location and value of each inscription, in request order
    fn get_inscription_info(&self, ids: &[String]) -> Result<Vec<InscriptionInfo>, ProviderError>;
}

/// Fee-rate service
pub trait FeeRateSource {
    /// Recommended rates in sat/vB for `network`
    fn get_recommended_fee_rate(&self, network: Network) -> Result<FeeRecommendation, ProviderError>;
}

/// Request handed to an external signer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignRequest {
    pub psbt_hex: String,
    pub psbt_base64: String,
    /// Ask the signer to finalize inputs after signing
    pub finalize: bool,
    /// Ask the signer to broadcast on its own
    pub broadcast: bool,
    pub network: Network,
}

/// Signer response; any field may be absent depending on the request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedPsbt {
    pub signed_psbt_hex: Option<String>,
    pub signed_psbt_base64: Option<String>,
    pub txid: Option<String>,
}

/// External signer
pub trait PsbtSigner {
    /// Sign the PSBT; `Ok(None)` means the signer declined
    fn sign_psbt(&self, request: &SignRequest) -> Result<Option<SignedPsbt>, ProviderError>;
}

/// Transaction relay
pub trait Broadcaster {
    /// Broadcast a raw transaction and return its txid
    fn broadcast(&self, raw_tx_hex: &str, network: Network) -> Result<Txid, ProviderError>;
}

/// Instruction moving `amount` of `id` to output `output`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edict {
    pub id: AssetId,
    pub amount: u128,
    pub output: u32,
}

/// Protocol message to embed in the metadata output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolMessage {
    pub protocol_tag: u128,
    pub edicts: Vec<Edict>,
    /// Output receiving unallocated assets
    pub pointer: u32,
    /// Output receiving assets when the message fails
    pub refund_pointer: u32,
    /// Encoded calldata, empty for plain transfers
    pub calldata: Vec<u8>,
}

/// Protocol-metadata codec
pub trait MetadataCodec {
    /// Encode `message` as the complete script of a zero-value output
    fn encode_metadata_script(&self, message: &ProtocolMessage) -> Result<ScriptBuf, ProviderError>;

    /// Encode integer calldata for a contract call
    fn encode_calldata(&self, values: &[u128]) -> Result<Vec<u8>, ProviderError>;
}
