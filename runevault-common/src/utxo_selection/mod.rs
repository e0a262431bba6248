//! UTXO selection
//!
//! Two greedy selectors feed the transaction assemblers:
//!
//! - `ordinary` gathers plain satoshi UTXOs up to a value target. It walks
//!   the caller's order exactly once and stops at the first prefix that
//!   reaches the target. Ordering is the caller's policy, see [`sort_utxos`].
//! - `asset` gathers outpoints holding one protocol asset until the
//!   normalized asset balance reaches the requested amount, tracking the
//!   satoshis that ride along.
//!
//! Neither selector mutates its input.
//!
//! # Examples
//!
//! ```
//! use runevault_common::utxo_selection::select_up_to;
//! use runevault_common::Utxo;
//! use bitcoin::{Amount, OutPoint, ScriptBuf, Txid};
//! use std::str::FromStr;
//!
//! let txid = Txid::from_str("7967a5185e907a25225574544c31f7b059c1a191d65b53dcc1554d339c4f9efc").unwrap();
//! let utxos = vec![
//!     Utxo::new(OutPoint::new(txid, 0), Amount::from_sat(10_000), "addr", ScriptBuf::new()),
//!     Utxo::new(OutPoint::new(txid, 1), Amount::from_sat(50_000), "addr", ScriptBuf::new()),
//! ];
//!
//! let selection = select_up_to(&utxos, 30_000);
//! assert_eq!(selection.selected.len(), 2);
//! assert!(selection.covers(30_000));
//! ```

pub mod asset;
pub mod ordinary;

pub use asset::{
    asset_divisibility, find_asset_utxos, normalize_asset_amount, AssetSelection,
};
pub use ordinary::{filter_spendable, select_up_to, sort_utxos, SelectionResult};
