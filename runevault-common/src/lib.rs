//! RuneVault Common Library
//!
//! Shared building blocks for PSBT assembly over protocol assets and
//! inscriptions: the data model, address classification, the linear fee
//! model, UTXO and asset selection, plus the error, logging and
//! configuration layers every other crate uses.
//!
//! # Modules
//!
//! - `types`: UTXOs, asset identifiers, satpoints and collaborator payloads
//! - `error`: The `WalletError` type and collaborator error conversion
//! - `address`: Address classification and parsing
//! - `fee_estimation`: Transaction size model and fee floor
//! - `utxo_selection`: Ordinary and asset UTXO selection
//! - `logging`: Structured logging on top of `log` and `env_logger`
//! - `config`: TOML configuration, including the assembly policy

/// Core domain types
pub mod types;

/// Error types
pub mod error;

/// Address classification
pub mod address;

/// Transaction size and fee estimation
pub mod fee_estimation;

/// UTXO selection algorithms
pub mod utxo_selection;

/// Structured logging
pub mod logging;

/// Configuration management
pub mod config;

pub use bitcoin::{Address, Amount, Network, OutPoint, ScriptBuf, Transaction, Txid};

pub use address::{classify, AddressType};
pub use config::{AssemblyPolicy, Config, SizeWeights};
pub use error::{ErrorContext, ProviderError, WalletError, WalletResult};
pub use fee_estimation::{estimate_fee, estimate_tx_size};
pub use types::{
    AssetBalance, AssetId, AssetOutpoint, AssetUtxo, FeePriority, FeeRecommendation,
    FormattedUtxo, InscriptionInfo, Satpoint, UnsignedPsbt, Utxo, UtxoOrder, DUST_THRESHOLD,
    MIN_RELAY_FEE,
};
pub use utxo_selection::{
    filter_spendable, find_asset_utxos, select_up_to, sort_utxos, AssetSelection,
    SelectionResult,
};

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

use std::sync::Once;

static INIT: Once = Once::new();

/// Library initialization
///
/// Installs the default logger. Safe to call any number of times; only the
/// first call does any work.
pub fn init() -> Result<(), String> {
    let mut result = Ok(());

    INIT.call_once(|| {
        result = logging::init(&logging::LogConfig::default())
            .map_err(|e| format!("Failed to initialize logging: {}", e));

        if result.is_ok() {
            logging::log_core(
                logging::LogLevel::Debug,
                "runevault-common initialized",
                Some(serde_json::json!({ "version": VERSION })),
            );
        }
    });

    result
}
