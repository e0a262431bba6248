//! Address classification
//!
//! Determines the spending script family of an address from its textual
//! form alone. The caller does not declare a network, so every family is
//! checked against the mainnet patterns and the shared testnet, signet and
//! regtest patterns.

use bitcoin::address::NetworkUnchecked;
use bitcoin::{Address, Network, ScriptBuf};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::WalletError;

/// Script family of an address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressType {
    /// Legacy pay-to-pubkey-hash
    P2pkh,
    /// Segwit v0 nested in pay-to-script-hash
    P2shP2wpkh,
    /// Native segwit v0
    P2wpkh,
    /// Segwit v1 (taproot)
    P2tr,
}

impl AddressType {
    pub fn is_taproot(self) -> bool {
        matches!(self, AddressType::P2tr)
    }

    /// Whether inputs of this type carry a witness
    pub fn is_segwit(self) -> bool {
        !matches!(self, AddressType::P2pkh)
    }
}

impl fmt::Display for AddressType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AddressType::P2pkh => "p2pkh",
            AddressType::P2shP2wpkh => "p2sh-p2wpkh",
            AddressType::P2wpkh => "p2wpkh",
            AddressType::P2tr => "p2tr",
        };
        f.write_str(name)
    }
}

struct Patterns {
    p2pkh: Regex,
    p2sh: Regex,
    p2wpkh: Regex,
    p2tr: Regex,
}

impl Patterns {
    fn build(p2pkh: &str, p2sh: &str, p2wpkh: &str, p2tr: &str) -> Self {
        // Literal patterns, verified by the classifier tests
        Self {
            p2pkh: Regex::new(p2pkh).expect("valid p2pkh pattern"),
            p2sh: Regex::new(p2sh).expect("valid p2sh pattern"),
            p2wpkh: Regex::new(p2wpkh).expect("valid p2wpkh pattern"),
            p2tr: Regex::new(p2tr).expect("valid p2tr pattern"),
        }
    }

    // The native segwit pattern also accepts `bc1p`, so taproot is tested first
    fn classify(&self, address: &str) -> Option<AddressType> {
        if self.p2pkh.is_match(address) {
            Some(AddressType::P2pkh)
        } else if self.p2tr.is_match(address) {
            Some(AddressType::P2tr)
        } else if self.p2sh.is_match(address) {
            Some(AddressType::P2shP2wpkh)
        } else if self.p2wpkh.is_match(address) {
            Some(AddressType::P2wpkh)
        } else {
            None
        }
    }
}

lazy_static! {
    static ref MAINNET: Patterns = Patterns::build(
        r"^1[a-km-zA-HJ-NP-Z1-9]{25,34}$",
        r"^3[a-km-zA-HJ-NP-Z1-9]{25,34}$",
        r"^bc1[qp][a-zA-HJ-NP-Z0-9]{14,74}$",
        r"^bc1p[a-zA-HJ-NP-Z0-9]{14,74}$",
    );

    // Testnet, signet and regtest share version bytes and differ only in the regtest HRP
    static ref TEST_NETWORKS: Patterns = Patterns::build(
        r"^[mn][a-km-zA-HJ-NP-Z1-9]{25,34}$",
        r"^2[a-km-zA-HJ-NP-Z1-9]{25,34}$",
        r"^(tb1[qp]|bcrt1[qp])[a-zA-HJ-NP-Z0-9]{14,74}$",
        r"^(tb1p|bcrt1p)[a-zA-HJ-NP-Z0-9]{14,74}$",
    );
}

/// Classify an address by pattern
///
/// Returns `None` when no family matches. Callers building inputs treat
/// that as fatal unless the UTXO carries its own script.
///
/// # Examples
///
/// ```
/// use runevault_common::address::{classify, AddressType};
///
/// assert_eq!(classify("1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa"), Some(AddressType::P2pkh));
/// assert_eq!(
///     classify("bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4"),
///     Some(AddressType::P2wpkh)
/// );
/// assert_eq!(classify("not-an-address"), None);
/// ```
pub fn classify(address: &str) -> Option<AddressType> {
    MAINNET
        .classify(address)
        .or_else(|| TEST_NETWORKS.classify(address))
}

/// Parse an address and check it belongs to `network`
pub fn parse_address(address: &str, network: Network) -> Result<Address, WalletError> {
    let unchecked = Address::<NetworkUnchecked>::from_str(address)
        .map_err(|e| WalletError::InvalidAddress(format!("{}: {}", address, e)))?;

    unchecked
        .require_network(network)
        .map_err(|e| WalletError::InvalidAddress(format!("{}: {}", address, e)))
}

/// Locking script paying to `address` on `network`
pub fn script_for_address(address: &str, network: Network) -> Result<ScriptBuf, WalletError> {
    Ok(parse_address(address, network)?.script_pubkey())
}
