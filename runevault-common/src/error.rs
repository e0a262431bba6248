//! Error handling for RuneVault
//!
//! A single error type, [`WalletError`], covers every way an assembly or
//! transfer can fail. Variants fall into four groups:
//!
//! - insufficiency: not enough ordinary value, not enough asset balance,
//!   or negative change at the final check
//! - malformed data: unparseable satpoints, lookup results without value
//!   or location, invalid outpoints, addresses and keys
//! - precondition violations: a nested-segwit input without a public key,
//!   an address with no recognised type and no script
//! - collaborator failures: an external source returned an error, or the
//!   signer declined
//!
//! Every failure is returned to the caller immediately. Nothing retries.
//!
//! # Usage
//!
//! ```
//! use runevault_common::error::{ErrorContext, ProviderError, WalletError};
//!
//! fn lookup() -> Result<u64, ProviderError> {
//!     Err(ProviderError::Unavailable("indexer offline".into()))
//! }
//!
//! let err = lookup().context("Failed to fetch utxos").unwrap_err();
//! assert!(matches!(err, WalletError::Collaborator { .. }));
//! ```

use thiserror::Error;

/// Errors raised by assembly and transfer operations
#[derive(Debug, Error)]
pub enum WalletError {
    /// Ordinary UTXOs cannot cover outputs plus fee
    #[error("Insufficient funds: need {needed} sats, have {available} sats")]
    InsufficientFunds { needed: u64, available: u64 },

    /// Matching asset UTXOs cannot cover the requested asset amount
    #[error("Insufficient asset balance: need {needed}, have {available}")]
    InsufficientAssetBalance { needed: String, available: String },

    /// Inputs do not cover outputs plus fee at the final check
    #[error("Negative change: short by {deficit} sats")]
    NegativeChange { deficit: u64 },

    /// The address holds no UTXO carrying the requested asset
    #[error("No UTXOs found for asset {0}")]
    NoAssetUtxos(String),

    #[error("Malformed satpoint: {0}")]
    MalformedSatpoint(String),

    /// An inscription lookup returned no value or no location
    #[error("Missing inscription data: {0}")]
    MissingInscriptionData(String),

    #[error("Invalid UTXO: {0}")]
    InvalidUtxo(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A nested-segwit input needs the owner's public key
    #[error("Public key required to spend {0}")]
    MissingPublicKey(String),

    #[error("Cannot determine address type for {0}")]
    UnclassifiableAddress(String),

    /// An external source failed
    #[error("{context}")]
    Collaborator {
        context: String,
        #[source]
        source: ProviderError,
    },

    /// The signer returned no signed transaction
    #[error("Signer declined to sign the transaction")]
    SignerDeclined,

    #[error("PSBT error: {0}")]
    Psbt(String),
}

/// Errors reported by external collaborators
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

impl From<ProviderError> for WalletError {
    fn from(err: ProviderError) -> Self {
        WalletError::Collaborator {
            context: err.to_string(),
            source: err,
        }
    }
}

impl From<bitcoin::psbt::Error> for WalletError {
    fn from(err: bitcoin::psbt::Error) -> Self {
        WalletError::Psbt(err.to_string())
    }
}

impl From<bitcoin::consensus::encode::Error> for WalletError {
    fn from(err: bitcoin::consensus::encode::Error) -> Self {
        WalletError::Psbt(err.to_string())
    }
}

/// Extension trait for adding context to collaborator results
pub trait ErrorContext<T> {
    /// Convert a collaborator failure into [`WalletError::Collaborator`]
    /// with a human-readable description of the call that failed
    fn context(self, context: impl Into<String>) -> Result<T, WalletError>;
}

impl<T> ErrorContext<T> for Result<T, ProviderError> {
    fn context(self, context: impl Into<String>) -> Result<T, WalletError> {
        self.map_err(|source| WalletError::Collaborator {
            context: format!("{}: {}", context.into(), source),
            source,
        })
    }
}

/// Whether the error means the caller lacks value, as opposed to bad data
pub fn is_insufficiency(err: &WalletError) -> bool {
    matches!(
        err,
        WalletError::InsufficientFunds { .. }
            | WalletError::InsufficientAssetBalance { .. }
            | WalletError::NegativeChange { .. }
            | WalletError::NoAssetUtxos(_)
    )
}

/// Convenience alias
pub type WalletResult<T> = Result<T, WalletError>;
