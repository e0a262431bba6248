//! Fee estimation for assembled transactions
//!
//! Size is estimated with a linear model: a fixed overhead plus a constant
//! per taproot input, per legacy input and per output. It is an
//! approximation traded for speed, not a virtual-size computation, and the
//! weights are configurable through [`SizeWeights`].
//!
//! Fees are `ceil(max(size × rate, min_fee))`. The floor models relay
//! policy and applies regardless of the computed size.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::config::SizeWeights;
use crate::error::WalletError;
use crate::types::DUST_THRESHOLD;

/// Determines if an amount is below the default dust threshold
pub fn is_dust_amount(amount_sats: u64) -> bool {
    amount_sats < DUST_THRESHOLD
}

/// Estimate transaction size in bytes
///
/// # Arguments
/// * `taproot_inputs` - Number of taproot (and other witness) inputs
/// * `legacy_inputs` - Number of legacy inputs
/// * `outputs` - Number of outputs
/// * `weights` - Per-item byte weights
///
/// # Examples
///
/// ```
/// use runevault_common::config::SizeWeights;
/// use runevault_common::fee_estimation::estimate_tx_size;
///
/// assert_eq!(estimate_tx_size(2, 0, 4, &SizeWeights::default()), 298);
/// ```
pub fn estimate_tx_size(
    taproot_inputs: usize,
    legacy_inputs: usize,
    outputs: usize,
    weights: &SizeWeights,
) -> usize {
    weights.base
        + taproot_inputs * weights.taproot_input
        + legacy_inputs * weights.legacy_input
        + outputs * weights.output
}

/// Calculate the total fee for a transaction without any floor
///
/// # Arguments
/// * `fee_rate` - Fee rate in satoshis per vbyte
/// * `tx_size` - Estimated transaction size in vbytes
///
/// # Errors
/// `InvalidArgument` when the product overflows or does not fit in a u64.
pub fn calculate_total_fee(fee_rate: Decimal, tx_size: usize) -> Result<u64, WalletError> {
    fee_rate
        .checked_mul(Decimal::from(tx_size))
        .and_then(|fee| fee.ceil().to_u64())
        .ok_or_else(|| {
            WalletError::InvalidArgument(format!(
                "Fee for {} bytes at {} sat/vB is out of range",
                tx_size, fee_rate
            ))
        })
}

/// Fee for a transaction of `tx_size` bytes, never below `min_fee`
///
/// Negative rates are treated as zero, so the floor applies.
pub fn estimate_fee(tx_size: usize, fee_rate: Decimal, min_fee: u64) -> Result<u64, WalletError> {
    let rate = fee_rate.max(Decimal::ZERO);
    Ok(calculate_total_fee(rate, tx_size)?.max(min_fee))
}
