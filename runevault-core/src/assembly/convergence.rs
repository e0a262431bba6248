//! Fee convergence
//!
//! The fee depends on how many inputs a transaction has, and the number of
//! ordinary inputs depends on how much fee they must cover. Rather than
//! iterate to a fixed point, assembly takes a bounded number of steps:
//!
//! 1. estimate the fee assuming a single ordinary input
//! 2. select ordinary UTXOs for that fee plus the spend target
//! 3. re-estimate with the actual input count
//! 4. reselect once if the selection no longer covers fee plus target
//! 5. re-estimate for the final input count and check coverage
//!
//! Step 5 fails with `InsufficientFunds` rather than looping again.

use rust_decimal::Decimal;
use serde_json::json;

use runevault_common::error::WalletError;
use runevault_common::fee_estimation::estimate_fee;
use runevault_common::logging::{log_selection, LogLevel};
use runevault_common::types::Utxo;
use runevault_common::utxo_selection::{select_up_to, SelectionResult};

/// Parameters of one convergence run
#[derive(Debug, Clone)]
pub struct FeeTarget {
    /// Inputs already committed to the transaction (asset or inscription UTXOs)
    pub fixed_inputs: usize,
    /// Value ordinary UTXOs must cover on top of the fee while selecting
    pub spend_target: u64,
    /// Value ordinary UTXOs must still cover on top of the final fee
    pub final_reserve: u64,
    pub fee_rate: Decimal,
    pub min_fee: u64,
    /// Caller-imposed fee; skips estimation
    pub fixed_fee: Option<u64>,
}

/// Outcome of a convergence run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Converged {
    pub selection: SelectionResult,
    /// Fee for `fixed_inputs + selection.len()` inputs
    pub fee: u64,
    /// Total input count the fee was computed for
    pub assumed_inputs: usize,
}

/// Select ordinary UTXOs and settle the fee
///
/// `size_for_inputs` maps a total input count to an estimated size in bytes.
/// `spendable` must already exclude outpoints spent by the fixed inputs, so
/// that every selected UTXO becomes exactly one input.
pub fn converge<F>(spendable: &[Utxo], target: &FeeTarget, size_for_inputs: F) -> Result<Converged, WalletError>
where
    F: Fn(usize) -> usize,
{
    let fee_for = |ordinary: usize| -> Result<u64, WalletError> {
        match target.fixed_fee {
            Some(fee) => Ok(fee),
            None => estimate_fee(
                size_for_inputs(target.fixed_inputs + ordinary),
                target.fee_rate,
                target.min_fee,
            ),
        }
    };

    let initial_fee = fee_for(1)?;
    let needed = initial_fee + target.spend_target;
    let mut selection = select_up_to(spendable, needed);
    if selection.is_empty() && needed > 0 {
        return Err(WalletError::InsufficientFunds { needed, available: 0 });
    }

    let recomputed_fee = fee_for(selection.len())?;
    if !selection.covers(recomputed_fee + target.spend_target) {
        selection = select_up_to(spendable, recomputed_fee + target.spend_target);
    }

    let fee = fee_for(selection.len())?;
    let required = fee + target.final_reserve;

    log_selection(
        LogLevel::Debug,
        "fee convergence",
        Some(json!({
            "initial_fee": initial_fee,
            "recomputed_fee": recomputed_fee,
            "final_fee": fee,
            "inputs": target.fixed_inputs + selection.len(),
            "gathered": selection.total,
            "required": required,
        })),
    );

    if !selection.covers(required) {
        return Err(WalletError::InsufficientFunds {
            needed: required,
            available: selection.total,
        });
    }

    Ok(Converged {
        assumed_inputs: target.fixed_inputs + selection.len(),
        selection,
        fee,
    })
}
