//! Events published whenever the transaction store changes.
//!
//! The watcher subscribes to these to start tracking new records, and the
//! service persists the store after each one.

use crate::{TransactionKey, TransactionStatus};
use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionEvent {
	/// A record was inserted.
	Added { key: TransactionKey },
	/// A record changed; `watch` asks the watcher to (re)start tracking it.
	Updated { key: TransactionKey, watch: bool },
	/// A record reached a final status.
	Finalized {
		key: TransactionKey,
		status: TransactionStatus,
	},
	/// A record moved to a new id (batch to hash, or hash to cancel hash).
	Rekeyed {
		previous: TransactionKey,
		key: TransactionKey,
	},
	/// A record was removed.
	Deleted { key: TransactionKey },
	/// All records of an account on a chain were removed.
	Cleared { address: Address, chain_id: u64 },
	/// The whole table was reset.
	Reset,
}

impl TransactionEvent {
	/// Returns the key of the record the watcher should track, if any.
	pub fn watch_key(&self) -> Option<&TransactionKey> {
		match self {
			TransactionEvent::Added { key } => Some(key),
			TransactionEvent::Updated { key, watch: true } => Some(key),
			TransactionEvent::Rekeyed { key, .. } => Some(key),
			_ => None,
		}
	}
}
