//! Configuration management for RuneVault.
//!
//! Settings are stored in TOML. Every protocol constant the assemblers use
//! (dust floor, fee floor, size-model weights, protocol tag, mint opcode)
//! lives in [`AssemblyPolicy`] so test suites and callers can substitute
//! deterministic values. Missing keys fall back to the defaults below.
//!
//! ```
//! use runevault_common::config::Config;
//!
//! let config = Config::from_toml_str("[policy]\ndust_floor = 600\n").unwrap();
//! assert_eq!(config.policy.dust_floor, 600);
//! assert_eq!(config.policy.min_fee, 250);
//! ```

use anyhow::{anyhow, Result};
use bitcoin::Network;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::logging::LogConfig;
use crate::types::{FeePriority, UtxoOrder, DUST_THRESHOLD, MIN_RELAY_FEE};

/// Main configuration structure for RuneVault
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub policy: AssemblyPolicy,

    #[serde(default)]
    pub wallet: WalletConfig,

    #[serde(default)]
    pub logging: LogConfig,
}

/// Constants governing transaction assembly
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyPolicy {
    /// Value of carrier outputs and the smallest change output ever emitted
    #[serde(default = "default_dust_floor")]
    pub dust_floor: u64,

    /// Absolute fee floor in satoshis
    #[serde(default = "default_min_fee")]
    pub min_fee: u64,

    /// Protocol tag passed to the metadata codec
    #[serde(default = "default_protocol_tag")]
    pub protocol_tag: u64,

    /// Opcode placed in mint calldata after the asset id
    #[serde(default = "default_mint_opcode")]
    pub mint_opcode: u64,

    // Kept last: TOML tables must follow plain values
    #[serde(default)]
    pub size_weights: SizeWeights,
}

impl Default for AssemblyPolicy {
    fn default() -> Self {
        Self {
            dust_floor: default_dust_floor(),
            min_fee: default_min_fee(),
            protocol_tag: default_protocol_tag(),
            mint_opcode: default_mint_opcode(),
            size_weights: SizeWeights::default(),
        }
    }
}

/// Byte weights of the linear transaction size model
///
/// The model is an approximation of serialized size. It ignores the
/// witness discount, so it overestimates segwit transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeWeights {
    #[serde(default = "default_base_weight")]
    pub base: usize,
    #[serde(default = "default_taproot_input_weight")]
    pub taproot_input: usize,
    #[serde(default = "default_legacy_input_weight")]
    pub legacy_input: usize,
    #[serde(default = "default_output_weight")]
    pub output: usize,
}

impl Default for SizeWeights {
    fn default() -> Self {
        Self {
            base: default_base_weight(),
            taproot_input: default_taproot_input_weight(),
            legacy_input: default_legacy_input_weight(),
            output: default_output_weight(),
        }
    }
}

/// Wallet-level preferences used by the transfer flows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletConfig {
    /// bitcoin, testnet, signet or regtest
    #[serde(default = "default_network")]
    pub network: String,

    #[serde(default)]
    pub utxo_order: UtxoOrder,

    #[serde(default)]
    pub fee_priority: FeePriority,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            network: default_network(),
            utxo_order: UtxoOrder::default(),
            fee_priority: FeePriority::default(),
        }
    }
}

impl WalletConfig {
    /// Parse the configured network name
    pub fn network(&self) -> Result<Network> {
        Network::from_str(&self.network.to_lowercase())
            .map_err(|_| anyhow!("Invalid network type: {}", self.network))
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path.display(), e))?;

        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).map_err(|e| anyhow!("Failed to parse config file: {}", e))?;

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| anyhow!("Failed to serialize config: {}", e))?;

        fs::write(path, content).map_err(|e| anyhow!("Failed to write config file: {}", e))?;

        log::debug!("Saved configuration to {}", path.display());
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        self.wallet.network()?;

        if self.policy.dust_floor == 0 {
            return Err(anyhow!("Invalid dust floor: must be greater than 0"));
        }

        if self.policy.min_fee == 0 {
            return Err(anyhow!("Invalid minimum fee: must be greater than 0"));
        }

        let weights = &self.policy.size_weights;
        if weights.taproot_input == 0 || weights.legacy_input == 0 || weights.output == 0 {
            anyhow::bail!("Invalid size weights: per-input and per-output weights must be non-zero");
        }

        Ok(())
    }
}

/// Ensure a configuration file exists at the specified path
/// If it doesn't exist, create it with default values
pub fn ensure_config_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        let content = toml::to_string_pretty(&Config::default())
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)
                    .map_err(|e| anyhow!("Failed to create config directory: {}", e))?;
            }
        }

        fs::write(path, content)
            .map_err(|e| anyhow!("Failed to write default config file: {}", e))?;
    }

    Ok(())
}

// Default value functions

fn default_dust_floor() -> u64 {
    DUST_THRESHOLD
}

fn default_min_fee() -> u64 {
    MIN_RELAY_FEE
}

fn default_protocol_tag() -> u64 {
    1
}

fn default_mint_opcode() -> u64 {
    77
}

fn default_base_weight() -> usize {
    10
}

fn default_taproot_input_weight() -> usize {
    64
}

fn default_legacy_input_weight() -> usize {
    42
}

fn default_output_weight() -> usize {
    40
}

fn default_network() -> String {
    "bitcoin".to_string()
}
