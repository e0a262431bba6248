//! Selection of UTXOs holding a protocol asset

use std::collections::HashSet;

use rust_decimal::Decimal;
use serde_json::json;

use crate::error::WalletError;
use crate::logging::{log_selection, LogLevel};
use crate::types::{AssetBalance, AssetId, AssetOutpoint, AssetUtxo, Utxo, UtxoOrder};

/// Asset UTXOs chosen to cover a transfer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetSelection {
    pub utxos: Vec<AssetUtxo>,
    /// Satoshis carried by the selected outputs
    pub total_satoshis: u64,
    /// Selected asset balance, normalized by divisibility
    pub total_balance: Decimal,
}

/// Scale a raw asset balance into display units
///
/// A divisibility of 1 is treated as indivisible, matching how indexers
/// report single-decimal assets. Any other divisibility `d` divides by `10^d`.
///
/// `Decimal` has a 96-bit mantissa and at most 28 decimal places, so raw
/// balances above `2^96 - 1` (about 7.9e28) and divisibilities above 28 are
/// rejected with `InvalidArgument` even though the u128 fields can hold them.
pub fn normalize_asset_amount(raw: u128, divisibility: u8) -> Result<Decimal, WalletError> {
    let scale = if divisibility == 1 { 0 } else { u32::from(divisibility) };
    let value = i128::try_from(raw)
        .map_err(|_| WalletError::InvalidArgument(format!("Asset amount {} out of range", raw)))?;

    Decimal::try_from_i128_with_scale(value, scale).map_err(|e| {
        WalletError::InvalidArgument(format!(
            "Cannot normalize asset amount {} with divisibility {}: {}",
            raw, divisibility, e
        ))
    })
}

/// Divisibility reported for `asset_id`, if any outpoint holds it
pub fn asset_divisibility(outpoints: &[AssetOutpoint], asset_id: AssetId) -> Option<u8> {
    outpoints
        .iter()
        .flat_map(|outpoint| outpoint.balances.iter())
        .find(|balance| balance.id == asset_id)
        .map(|balance| balance.divisibility)
}

/// Gather outpoints holding `asset_id` until their balance reaches `target`
///
/// Candidates are the balances whose id matches exactly, sorted by raw
/// balance in `order`. Zero balances are skipped and an outpoint is taken at
/// most once. Each selected output is included whole.
///
/// # Arguments
/// * `outpoints` - Outpoints owned by `owner_address` with their balances
/// * `owner_address` - Address recorded on the returned UTXOs
/// * `asset_id` - Asset to gather
/// * `order` - Sort direction by asset balance
/// * `target` - Required balance in display units
///
/// # Errors
/// `InsufficientAssetBalance` when every matching outpoint together falls short.
pub fn find_asset_utxos(
    outpoints: &[AssetOutpoint],
    owner_address: &str,
    asset_id: AssetId,
    order: UtxoOrder,
    target: Decimal,
) -> Result<AssetSelection, WalletError> {
    let mut candidates: Vec<(&AssetBalance, &AssetOutpoint)> = outpoints
        .iter()
        .flat_map(|outpoint| {
            outpoint
                .balances
                .iter()
                .filter(|balance| balance.id == asset_id)
                .map(move |balance| (balance, outpoint))
        })
        .collect();

    match order {
        UtxoOrder::GreatestToLeast => candidates.sort_by(|a, b| b.0.balance.cmp(&a.0.balance)),
        UtxoOrder::LeastToGreatest => candidates.sort_by(|a, b| a.0.balance.cmp(&b.0.balance)),
    }

    let mut selection = AssetSelection::default();
    let mut seen = HashSet::new();

    for (balance, outpoint) in candidates {
        if selection.total_balance >= target {
            break;
        }
        if balance.balance == 0 || !seen.insert(outpoint.outpoint) {
            continue;
        }

        selection.total_balance += normalize_asset_amount(balance.balance, balance.divisibility)?;
        selection.total_satoshis += outpoint.value.to_sat();
        selection.utxos.push(AssetUtxo {
            utxo: Utxo::new(
                outpoint.outpoint,
                outpoint.value,
                owner_address,
                outpoint.script_pubkey.clone(),
            )
            .with_assets(true),
            asset_id,
            asset_amount: balance.balance,
            divisibility: balance.divisibility,
        });
    }

    log_selection(
        LogLevel::Debug,
        "asset selection",
        Some(json!({
            "asset": asset_id.to_string(),
            "target": target.to_string(),
            "selected": selection.utxos.len(),
            "balance": selection.total_balance.to_string(),
            "satoshis": selection.total_satoshis,
        })),
    );

    if selection.total_balance < target {
        return Err(WalletError::InsufficientAssetBalance {
            needed: target.to_string(),
            available: selection.total_balance.to_string(),
        });
    }

    Ok(selection)
}
