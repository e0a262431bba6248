//! Sign-and-broadcast flows
//!
//! [`TransferService`] wires the assemblers to the remaining collaborators:
//! it looks up the fee rate and the payment UTXOs, assembles the PSBT,
//! hands it to the signer, extracts the signed transaction and broadcasts
//! it. Every collaborator is called once, in that order, and the first
//! failure ends the flow.

use bitcoin::consensus::encode::serialize_hex;
use bitcoin::{Network, PublicKey, Txid};
use rust_decimal::Decimal;
use serde_json::json;

use runevault_common::config::{AssemblyPolicy, Config};
use runevault_common::error::{ErrorContext, WalletError};
use runevault_common::logging::{log_network, log_transaction, LogLevel};
use runevault_common::types::{AssetId, FeePriority, UnsignedPsbt, Utxo, UtxoOrder};

use crate::assembly::{AssetSendRequest, InscriptionSendRequest, PsbtAssembler};
use crate::providers::{Broadcaster, FeeRateSource, MetadataCodec, PsbtSigner, SignRequest, UtxoSource};
use crate::psbt::decode_psbt;

/// Inscriptions to move from the ordinals address
#[derive(Debug, Clone)]
pub struct InscriptionTransfer {
    pub inscription_ids: Vec<String>,
    pub ordinal_address: String,
    pub ordinal_pubkey: String,
    /// Address funding the fee; also receives change
    pub payment_address: String,
    pub payment_pubkey: Option<PublicKey>,
    pub to_address: String,
}

/// Asset amount to move from the sender's taproot address
#[derive(Debug, Clone)]
pub struct AssetTransfer {
    pub asset_id: AssetId,
    /// Amount in base units
    pub amount: u128,
    pub sender_address: String,
    pub sender_pubkey: String,
    /// Address funding the fee; also receives change
    pub payment_address: String,
    pub payment_pubkey: Option<PublicKey>,
    pub to_address: String,
    pub fee_override: Option<u64>,
}

/// End-to-end transfers against external collaborators
pub struct TransferService<'a> {
    source: &'a dyn UtxoSource,
    fee_rates: &'a dyn FeeRateSource,
    signer: &'a dyn PsbtSigner,
    broadcaster: &'a dyn Broadcaster,
    codec: &'a dyn MetadataCodec,
    policy: AssemblyPolicy,
    network: Network,
    fee_priority: FeePriority,
    utxo_order: UtxoOrder,
}

impl<'a> TransferService<'a> {
    pub fn new(
        source: &'a dyn UtxoSource,
        fee_rates: &'a dyn FeeRateSource,
        signer: &'a dyn PsbtSigner,
        broadcaster: &'a dyn Broadcaster,
        codec: &'a dyn MetadataCodec,
        network: Network,
    ) -> Self {
        Self {
            source,
            fee_rates,
            signer,
            broadcaster,
            codec,
            policy: AssemblyPolicy::default(),
            network,
            fee_priority: FeePriority::default(),
            utxo_order: UtxoOrder::default(),
        }
    }

    /// Apply policy, network, fee priority and UTXO order from `config`
    pub fn with_config(mut self, config: &Config) -> Result<Self, WalletError> {
        self.network = config
            .wallet
            .network()
            .map_err(|e| WalletError::InvalidArgument(e.to_string()))?;
        self.policy = config.policy.clone();
        self.fee_priority = config.wallet.fee_priority;
        self.utxo_order = config.wallet.utxo_order;
        Ok(self)
    }

    pub fn with_fee_priority(mut self, priority: FeePriority) -> Self {
        self.fee_priority = priority;
        self
    }

    pub fn with_utxo_order(mut self, order: UtxoOrder) -> Self {
        self.utxo_order = order;
        self
    }

    fn assembler(&self) -> PsbtAssembler<'a, dyn UtxoSource + 'a, dyn MetadataCodec + 'a> {
        PsbtAssembler::with_policy(self.source, self.codec, self.network, self.policy.clone())
    }

    /// Fee rate for the configured priority
    pub fn fee_rate(&self) -> Result<Decimal, WalletError> {
        let recommendation = self
            .fee_rates
            .get_recommended_fee_rate(self.network)
            .context("Failed to fetch recommended fee rate")?;

        Ok(recommendation.for_priority(self.fee_priority))
    }

    /// UTXOs owned by `address`, validated
    pub fn fetch_utxos(&self, address: &str) -> Result<Vec<Utxo>, WalletError> {
        let formatted = self
            .source
            .get_formatted_utxos(address)
            .context("Failed to fetch utxos")?;

        log_network(
            LogLevel::Debug,
            "fetched utxos",
            Some(json!({ "address": address, "count": formatted.len() })),
        );

        formatted.into_iter().map(Utxo::try_from).collect()
    }

    /// Move inscriptions to `to_address` and return the broadcast txid
    pub fn send_inscriptions(&self, transfer: &InscriptionTransfer) -> Result<Txid, WalletError> {
        let fee_rate = self.fee_rate()?;
        let spendable_utxos = self.fetch_utxos(&transfer.payment_address)?;

        let unsigned = self.assembler().create_inscriptions_send_psbt(&InscriptionSendRequest {
            inscription_ids: transfer.inscription_ids.clone(),
            from_address: transfer.ordinal_address.clone(),
            sender_pubkey: transfer.ordinal_pubkey.clone(),
            to_address: transfer.to_address.clone(),
            change_address: transfer.payment_address.clone(),
            fee_rate,
            spendable_utxos,
            payment_pubkey: transfer.payment_pubkey,
            utxo_order: self.utxo_order,
        })?;

        self.sign_and_broadcast(&unsigned)
    }

    /// Move an asset amount to `to_address` and return the broadcast txid
    pub fn send_asset(&self, transfer: &AssetTransfer) -> Result<Txid, WalletError> {
        let fee_rate = self.fee_rate()?;
        let spendable_utxos = self.fetch_utxos(&transfer.payment_address)?;

        let unsigned = self.assembler().create_asset_send_psbt(&AssetSendRequest {
            sender_address: transfer.sender_address.clone(),
            sender_pubkey: transfer.sender_pubkey.clone(),
            to_address: transfer.to_address.clone(),
            change_address: transfer.payment_address.clone(),
            asset_id: transfer.asset_id,
            amount: transfer.amount,
            fee_rate,
            fee_override: transfer.fee_override,
            spendable_utxos,
            payment_pubkey: transfer.payment_pubkey,
            utxo_order: self.utxo_order,
        })?;

        self.sign_and_broadcast(&unsigned)
    }

    /// Have the signer finalize `unsigned`, then broadcast the result
    pub fn sign_and_broadcast(&self, unsigned: &UnsignedPsbt) -> Result<Txid, WalletError> {
        let signed = self
            .signer
            .sign_psbt(&SignRequest {
                psbt_hex: unsigned.psbt_hex.clone(),
                psbt_base64: unsigned.psbt_base64.clone(),
                finalize: true,
                broadcast: false,
                network: self.network,
            })
            .context("Signer failed")?
            .ok_or(WalletError::SignerDeclined)?;

        let psbt = decode_psbt(
            signed.signed_psbt_hex.as_deref(),
            signed.signed_psbt_base64.as_deref(),
        )?;
        let raw_tx = serialize_hex(&psbt.extract_tx());

        let txid = self
            .broadcaster
            .broadcast(&raw_tx, self.network)
            .context("Failed to broadcast transaction")?;

        log_transaction(
            LogLevel::Info,
            "broadcast transaction",
            Some(json!({ "txid": txid.to_string(), "fee": unsigned.fee })),
        );

        Ok(txid)
    }
}
