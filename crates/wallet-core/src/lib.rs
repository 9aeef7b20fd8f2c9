//! Core transaction lifecycle engine for the wallet.
//!
//! This crate owns the transaction table and everything that moves a record
//! through it: building submission parameters, signing and broadcasting,
//! UniswapX order submission, watching records until they settle, and
//! merging activity reported by the backend. [`WalletEngine`] ties these
//! together and [`WalletBuilder`] assembles one from configuration.

pub mod activity;
pub mod builder;
pub mod engine;
pub mod factory;
pub mod monitoring;
pub mod orders;
pub mod state;
pub mod submission;
pub mod utils;

#[cfg(test)]
mod test_utils;

pub use builder::{BuilderError, WalletBuilder, WalletFactories};
pub use engine::{EngineError, WalletEngine};
pub use state::{TransactionAction, TransactionStore, TransactionsState};
