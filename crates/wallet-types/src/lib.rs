//! Common types module for the wallet transaction core.
//!
//! This module defines the data types shared by every wallet crate: transaction
//! records and their tagged type information, transaction requests and receipts,
//! signing artifacts, trade inputs and network configuration. Keeping them in one
//! place lets the store, the signer and the watcher agree on a single vocabulary.

/// Event types published by the transaction store.
pub mod events;
/// Network configuration types.
pub mod networks;
/// Secure string wrapper for key material.
pub mod secret_string;
/// Signing artifacts: signed requests, signer output, delegation and typed data.
pub mod signing;
/// Storage namespaces for persisted data.
pub mod storage;
/// Trade and quote inputs consumed by the params factory.
pub mod trade;
/// Transaction records, requests, receipts and status vocabulary.
pub mod transaction;
/// Tagged per-kind transaction information.
pub mod type_info;
/// Utility functions for formatting and time.
pub mod utils;

pub use alloy::primitives::{Address, Bytes, Signature, TxHash, B256, U256};
pub use events::*;
pub use networks::{NetworkConfig, NetworksConfig};
pub use secret_string::SecretString;
pub use signing::*;
pub use storage::*;
pub use trade::*;
pub use transaction::*;
pub use type_info::*;
pub use utils::{current_timestamp_ms, truncate_id, without_0x_prefix};
