//! Greedy selection of ordinary satoshi UTXOs

use serde_json::json;

use crate::logging::{log_selection, LogLevel};
use crate::types::{Utxo, UtxoOrder};

/// Prefix of a UTXO sequence and its summed value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionResult {
    /// Selected UTXOs, in input order
    pub selected: Vec<Utxo>,
    /// Sum of the selected values in satoshis
    pub total: u64,
}

impl SelectionResult {
    /// Whether the selection reaches `target` satoshis
    pub fn covers(&self, target: u64) -> bool {
        self.total >= target
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }
}

/// Take UTXOs in order until their total reaches `target`
///
/// Returns the shortest prefix whose cumulative value is at least
/// `target`. When no prefix gets there, the whole sequence comes back with
/// its total and the caller detects the shortfall with
/// [`SelectionResult::covers`]. A zero target selects nothing.
pub fn select_up_to(utxos: &[Utxo], target: u64) -> SelectionResult {
    let mut result = SelectionResult::default();

    for utxo in utxos {
        if result.total >= target {
            break;
        }
        result.total = result.total.saturating_add(utxo.value());
        result.selected.push(utxo.clone());
    }

    log_selection(
        LogLevel::Debug,
        "ordinary selection",
        Some(json!({
            "target": target,
            "selected": result.selected.len(),
            "total": result.total,
            "covered": result.covers(target),
        })),
    );

    result
}

/// Return a copy of `utxos` ordered by value
///
/// The sort is stable, so equal values keep their relative order.
pub fn sort_utxos(utxos: &[Utxo], order: UtxoOrder) -> Vec<Utxo> {
    let mut sorted = utxos.to_vec();
    match order {
        UtxoOrder::GreatestToLeast => sorted.sort_by(|a, b| b.amount.cmp(&a.amount)),
        UtxoOrder::LeastToGreatest => sorted.sort_by(|a, b| a.amount.cmp(&b.amount)),
    }
    sorted
}

/// Keep only UTXOs that carry neither inscriptions nor protocol assets
pub fn filter_spendable(utxos: &[Utxo]) -> SelectionResult {
    let selected: Vec<Utxo> = utxos
        .iter()
        .filter(|utxo| utxo.is_spendable())
        .cloned()
        .collect();
    let total = selected.iter().map(Utxo::value).sum();

    SelectionResult { selected, total }
}
