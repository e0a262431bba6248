//! Common data types for RuneVault PSBT assembly
//!
//! These types represent the data exchanged between the indexer-facing
//! collaborators and the transaction assemblers. They are plain values:
//! immutable once fetched and safe to clone into a single assembly call.
//!
//! IMPORTANT: These types MUST NOT contain private keys, seeds, or other sensitive material.

use crate::error::WalletError;
use bitcoin::{Amount, OutPoint, ScriptBuf, Txid};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// Constants for Bitcoin-specific values

/// Constant for dust threshold (minimum output value)
pub const DUST_THRESHOLD: u64 = 546;

/// Minimum fee paid by any assembled transaction, in satoshis
pub const MIN_RELAY_FEE: u64 = 250;

/// Unspent transaction output owned by the wallet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utxo {
    /// Reference to the transaction output (txid and vout)
    pub outpoint: OutPoint,

    /// Amount in this UTXO
    pub amount: Amount,

    /// Address that owns the output
    pub address: String,

    /// Locking script of the output
    pub script_pubkey: ScriptBuf,

    /// Inscription ids known to live on this output
    pub inscriptions: Vec<String>,

    /// Whether the indexer reports protocol-asset balance on this output
    pub has_assets: bool,
}

impl Utxo {
    /// Create a new UTXO
    ///
    /// # Arguments
    /// * `outpoint` - Reference to the transaction output
    /// * `amount` - Amount in this UTXO
    /// * `address` - Owning address
    /// * `script_pubkey` - Locking script of the output
    pub fn new(
        outpoint: OutPoint,
        amount: Amount,
        address: impl Into<String>,
        script_pubkey: ScriptBuf,
    ) -> Self {
        Self {
            outpoint,
            amount,
            address: address.into(),
            script_pubkey,
            inscriptions: Vec::new(),
            has_assets: false,
        }
    }

    /// Attach inscription ids to this UTXO
    pub fn with_inscriptions(mut self, inscriptions: Vec<String>) -> Self {
        self.inscriptions = inscriptions;
        self
    }

    /// Flag this UTXO as carrying protocol assets
    pub fn with_assets(mut self, has_assets: bool) -> Self {
        self.has_assets = has_assets;
        self
    }

    /// Value in satoshis
    pub fn value(&self) -> u64 {
        self.amount.to_sat()
    }

    /// Get a unique identifier for this UTXO
    ///
    /// # Returns
    /// * String representation of the outpoint
    pub fn id(&self) -> String {
        format!("{}:{}", self.outpoint.txid, self.outpoint.vout)
    }

    /// Check if the UTXO amount is below the dust threshold
    pub fn is_dust(&self) -> bool {
        self.amount.to_sat() < DUST_THRESHOLD
    }

    /// Whether the output can be spent for fees without moving tracked assets
    pub fn is_spendable(&self) -> bool {
        self.inscriptions.is_empty() && !self.has_assets
    }
}

/// UTXO record as returned by indexers
///
/// Field names follow the indexer's JSON. Use `Utxo::try_from` to validate
/// and convert it into the strongly-typed representation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattedUtxo {
    pub tx_hash: String,
    pub tx_output_index: u32,
    pub btc_value: u64,
    pub address: String,
    pub script_pub_key: String,
    #[serde(default)]
    pub inscriptions: Vec<String>,
    #[serde(default)]
    pub runes: Vec<serde_json::Value>,
    #[serde(default)]
    pub alkanes: Vec<serde_json::Value>,
}

impl TryFrom<FormattedUtxo> for Utxo {
    type Error = WalletError;

    fn try_from(raw: FormattedUtxo) -> Result<Self, Self::Error> {
        let txid = Txid::from_str(&raw.tx_hash)
            .map_err(|e| WalletError::InvalidUtxo(format!("Invalid txid {}: {}", raw.tx_hash, e)))?;

        let script = hex::decode(&raw.script_pub_key).map_err(|e| {
            WalletError::InvalidUtxo(format!("Invalid script for {}: {}", raw.tx_hash, e))
        })?;

        Ok(Utxo {
            outpoint: OutPoint::new(txid, raw.tx_output_index),
            amount: Amount::from_sat(raw.btc_value),
            address: raw.address,
            script_pubkey: ScriptBuf::from(script),
            inscriptions: raw.inscriptions,
            has_assets: !raw.runes.is_empty() || !raw.alkanes.is_empty(),
        })
    }
}

/// Identifier of a protocol asset: the block and transaction index of its creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetId {
    pub block: u128,
    pub tx: u128,
}

impl AssetId {
    pub fn new(block: u128, tx: u128) -> Self {
        Self { block, tx }
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.block, self.tx)
    }
}

/// A UTXO known to also hold a balance of one protocol asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetUtxo {
    pub utxo: Utxo,
    pub asset_id: AssetId,
    /// Raw (base unit) asset balance on the output
    pub asset_amount: u128,
    pub divisibility: u8,
}

/// Asset balance entry reported by the asset indexer for one outpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetBalance {
    pub id: AssetId,
    pub balance: u128,
    #[serde(default)]
    pub divisibility: u8,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
}

/// Outpoint with all protocol-asset balances it carries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetOutpoint {
    pub outpoint: OutPoint,
    pub value: Amount,
    pub script_pubkey: ScriptBuf,
    pub balances: Vec<AssetBalance>,
}

/// Inscription location data returned by the inscription index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InscriptionInfo {
    /// Value of the output currently holding the inscription
    #[serde(default)]
    pub value: Option<u64>,
    /// `txid:vout:offset` location of the inscribed sat
    #[serde(default)]
    pub satpoint: Option<String>,
    /// Address currently holding the inscription
    #[serde(default)]
    pub address: Option<String>,
}

/// Location of a tracked sat: an outpoint plus the offset inside it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Satpoint {
    pub outpoint: OutPoint,
    pub offset: u64,
}

impl FromStr for Satpoint {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(':');
        let (txid, vout) = match (parts.next(), parts.next()) {
            (Some(txid), Some(vout)) if !txid.is_empty() && !vout.is_empty() => (txid, vout),
            _ => return Err(WalletError::MalformedSatpoint(s.to_string())),
        };

        let txid = Txid::from_str(txid).map_err(|_| WalletError::MalformedSatpoint(s.to_string()))?;
        let vout = vout
            .parse::<u32>()
            .map_err(|_| WalletError::MalformedSatpoint(s.to_string()))?;
        let offset = match parts.next() {
            Some(offset) => offset
                .parse::<u64>()
                .map_err(|_| WalletError::MalformedSatpoint(s.to_string()))?,
            None => 0,
        };

        if parts.next().is_some() {
            return Err(WalletError::MalformedSatpoint(s.to_string()));
        }

        Ok(Satpoint {
            outpoint: OutPoint::new(txid, vout),
            offset,
        })
    }
}

impl fmt::Display for Satpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.outpoint.txid, self.outpoint.vout, self.offset)
    }
}

/// Order in which candidate UTXOs are presented to the selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UtxoOrder {
    /// Largest first, minimizes the input count
    #[default]
    GreatestToLeast,
    /// Smallest first, consolidates small outputs
    LeastToGreatest,
}

/// Fee priority levels offered by the fee-rate service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeePriority {
    #[default]
    Fastest,
    HalfHour,
    Hour,
    Economy,
    Minimum,
}

/// Recommended fee rates in sat/vB
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeRecommendation {
    #[serde(rename = "fastestFee")]
    pub fastest: rust_decimal::Decimal,
    #[serde(rename = "halfHourFee")]
    pub half_hour: rust_decimal::Decimal,
    #[serde(rename = "hourFee")]
    pub hour: rust_decimal::Decimal,
    #[serde(rename = "economyFee")]
    pub economy: rust_decimal::Decimal,
    #[serde(rename = "minimumFee")]
    pub minimum: rust_decimal::Decimal,
}

impl FeeRecommendation {
    /// Fee rate for the given priority
    pub fn for_priority(&self, priority: FeePriority) -> rust_decimal::Decimal {
        match priority {
            FeePriority::Fastest => self.fastest,
            FeePriority::HalfHour => self.half_hour,
            FeePriority::Hour => self.hour,
            FeePriority::Economy => self.economy,
            FeePriority::Minimum => self.minimum,
        }
    }
}

/// Unsigned PSBT ready for an external signer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedPsbt {
    /// Binary PSBT encoded as hex
    pub psbt_hex: String,
    /// Binary PSBT encoded as base64
    pub psbt_base64: String,
    /// Fee paid by the transaction, in satoshis
    pub fee: u64,
}
