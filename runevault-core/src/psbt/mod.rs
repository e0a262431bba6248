//! Transaction draft and PSBT serialization
//!
//! [`TxDraft`] is the accumulator one assembly call threads through its
//! steps. Inputs and outputs are only ever appended, each outpoint can be
//! spent once, and the running input total is kept alongside. When the
//! outputs are final the draft turns into an unsigned PSBT.

pub mod finalize;

use std::collections::HashSet;

use bitcoin::absolute::LockTime;
use bitcoin::psbt::{Input as PsbtInput, PartiallySignedTransaction as Psbt};
use bitcoin::{OutPoint, PublicKey, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Witness};
use log::{debug, warn};

use runevault_common::address::{classify, AddressType};
use runevault_common::error::WalletError;
use runevault_common::logging::sanitize_for_logging;
use runevault_common::types::{UnsignedPsbt, Utxo};

pub use finalize::finalize_inputs;

const TX_VERSION: i32 = 2;

/// Key material a signer may need for one input
#[derive(Debug, Clone, Default)]
pub struct InputOptions {
    /// Owner's public key, required for nested segwit inputs
    pub pubkey: Option<PublicKey>,
    /// Full previous transaction, attached to legacy inputs when known
    pub previous_tx: Option<Transaction>,
}

impl InputOptions {
    pub fn with_pubkey(pubkey: PublicKey) -> Self {
        Self {
            pubkey: Some(pubkey),
            previous_tx: None,
        }
    }
}

#[derive(Debug, Clone)]
struct DraftInput {
    outpoint: OutPoint,
    value: u64,
    psbt_input: PsbtInput,
}

/// Append-only transaction accumulator
#[derive(Debug, Clone, Default)]
pub struct TxDraft {
    inputs: Vec<DraftInput>,
    outputs: Vec<TxOut>,
    seen: HashSet<OutPoint>,
    input_total: u64,
}

impl TxDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an input spending `utxo`
    ///
    /// The unlocking descriptor depends on the classified owner address:
    ///
    /// - P2PKH: a bare input, with `non_witness_utxo` when the previous
    ///   transaction is supplied
    /// - P2SH-P2WPKH: redeem script `OP_0 <hash160(pubkey)>` and a witness
    ///   output paying to its script hash
    /// - P2WPKH, P2TR and unclassified addresses: a witness output with the
    ///   UTXO's value and script
    ///
    /// Returns `Ok(false)` without changing the draft when the outpoint is
    /// already an input.
    ///
    /// # Errors
    /// * `MissingPublicKey` for a nested segwit input without `pubkey`
    /// * `InvalidPublicKey` for an uncompressed `pubkey`
    /// * `UnclassifiableAddress` for an unknown address with an empty script
    /// * `InvalidArgument` when `previous_tx` is not the funding transaction
    pub fn add_input(&mut self, utxo: &Utxo, options: &InputOptions) -> Result<bool, WalletError> {
        if self.seen.contains(&utxo.outpoint) {
            debug!("Skipping duplicate input {}", sanitize_for_logging(&utxo.id()));
            return Ok(false);
        }

        let psbt_input = match classify(&utxo.address) {
            Some(AddressType::P2pkh) => legacy_input(utxo, options)?,
            Some(AddressType::P2shP2wpkh) => nested_segwit_input(utxo, options)?,
            Some(AddressType::P2wpkh) | Some(AddressType::P2tr) => witness_input(utxo),
            None if !utxo.script_pubkey.is_empty() => witness_input(utxo),
            None => return Err(WalletError::UnclassifiableAddress(utxo.address.clone())),
        };

        self.seen.insert(utxo.outpoint);
        self.input_total += utxo.value();
        self.inputs.push(DraftInput {
            outpoint: utxo.outpoint,
            value: utxo.value(),
            psbt_input,
        });

        Ok(true)
    }

    /// Append an output
    pub fn add_output(&mut self, script_pubkey: ScriptBuf, value: u64) {
        self.outputs.push(TxOut {
            value,
            script_pubkey,
        });
    }

    /// Whether `outpoint` is already spent by this draft
    pub fn contains(&self, outpoint: &OutPoint) -> bool {
        self.seen.contains(outpoint)
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    /// Sum of all input values in satoshis
    pub fn input_total(&self) -> u64 {
        self.input_total
    }

    /// Sum of all output values in satoshis
    pub fn output_total(&self) -> u64 {
        self.outputs.iter().map(|output| output.value).sum()
    }

    /// Outpoints spent by this draft, in input order
    pub fn outpoints(&self) -> Vec<OutPoint> {
        self.inputs.iter().map(|input| input.outpoint).collect()
    }

    /// Input values in satoshis, in input order
    pub fn input_values(&self) -> Vec<u64> {
        self.inputs.iter().map(|input| input.value).collect()
    }

    /// Build the unsigned PSBT
    pub fn into_psbt(self) -> Result<Psbt, WalletError> {
        let unsigned_tx = Transaction {
            version: TX_VERSION,
            lock_time: LockTime::ZERO,
            input: self
                .inputs
                .iter()
                .map(|input| TxIn {
                    previous_output: input.outpoint,
                    script_sig: ScriptBuf::new(),
                    sequence: Sequence::MAX,
                    witness: Witness::new(),
                })
                .collect(),
            output: self.outputs,
        };

        let mut psbt = Psbt::from_unsigned_tx(unsigned_tx)?;
        for (slot, input) in psbt.inputs.iter_mut().zip(self.inputs) {
            *slot = input.psbt_input;
        }

        Ok(psbt)
    }
}

fn witness_input(utxo: &Utxo) -> PsbtInput {
    PsbtInput {
        witness_utxo: Some(TxOut {
            value: utxo.value(),
            script_pubkey: utxo.script_pubkey.clone(),
        }),
        ..Default::default()
    }
}

fn legacy_input(utxo: &Utxo, options: &InputOptions) -> Result<PsbtInput, WalletError> {
    match &options.previous_tx {
        Some(tx) => {
            if tx.txid() != utxo.outpoint.txid {
                return Err(WalletError::InvalidArgument(format!(
                    "Previous transaction {} does not fund {}",
                    tx.txid(),
                    utxo.id()
                )));
            }
            Ok(PsbtInput {
                non_witness_utxo: Some(tx.clone()),
                ..Default::default()
            })
        }
        None => {
            // Signers validating legacy inputs need the full previous transaction
            warn!(
                "Legacy input {} added without its previous transaction",
                sanitize_for_logging(&utxo.id())
            );
            Ok(PsbtInput::default())
        }
    }
}

fn nested_segwit_input(utxo: &Utxo, options: &InputOptions) -> Result<PsbtInput, WalletError> {
    let pubkey = options
        .pubkey
        .ok_or_else(|| WalletError::MissingPublicKey(utxo.address.clone()))?;
    let wpubkey_hash = pubkey
        .wpubkey_hash()
        .ok_or_else(|| WalletError::InvalidPublicKey("Nested segwit requires a compressed key".into()))?;

    let redeem_script = ScriptBuf::new_v0_p2wpkh(&wpubkey_hash);
    let witness_script = ScriptBuf::new_p2sh(&redeem_script.script_hash());

    Ok(PsbtInput {
        witness_utxo: Some(TxOut {
            value: utxo.value(),
            script_pubkey: witness_script,
        }),
        redeem_script: Some(redeem_script),
        ..Default::default()
    })
}

/// Serialize a PSBT into the hex and base64 forms handed to signers
pub fn encode_psbt(psbt: &Psbt, fee: u64) -> UnsignedPsbt {
    let bytes = psbt.serialize();
    UnsignedPsbt {
        psbt_hex: hex::encode(&bytes),
        psbt_base64: base64::encode(&bytes),
        fee,
    }
}

/// Parse a PSBT from its hex form, falling back to base64
pub fn decode_psbt(hex_psbt: Option<&str>, base64_psbt: Option<&str>) -> Result<Psbt, WalletError> {
    let bytes = match (hex_psbt, base64_psbt) {
        (Some(hex_psbt), _) => hex::decode(hex_psbt)
            .map_err(|e| WalletError::Psbt(format!("Invalid PSBT hex: {}", e)))?,
        (None, Some(base64_psbt)) => base64::decode(base64_psbt)
            .map_err(|e| WalletError::Psbt(format!("Invalid PSBT base64: {}", e)))?,
        (None, None) => return Err(WalletError::Psbt("Signer returned no PSBT".to_string())),
    };

    Ok(Psbt::deserialize(&bytes)?)
}
