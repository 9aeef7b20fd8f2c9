//! Tracking of pending transactions and orders until they settle.
//!
//! A [`TransactionWatcher`] polls one record at a time. On-chain records are
//! resolved from receipts and the account nonce, UniswapX orders from the
//! relayer. Every outcome is written back through the store's `dispatch`.

mod order;
mod transaction;

use crate::orders::{OrderError, OrderRelayer};
use crate::state::{InvariantViolation, TransactionStore};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tracing::instrument;
use wallet_delivery::{DeliveryError, DeliveryService};
use wallet_types::{truncate_id, NetworksConfig, TransactionKey, TransactionSource};

/// Errors that end a watch early.
#[derive(Debug, Error)]
pub enum WatcherError {
	/// Error raised by the provider after retries were exhausted.
	#[error("Delivery error: {0}")]
	Delivery(#[from] DeliveryError),
	/// Error raised by the order relayer.
	#[error("Order error: {0}")]
	Order(#[from] OrderError),
	/// The store rejected the resulting action.
	#[error("Invariant violation: {0}")]
	Invariant(#[from] InvariantViolation),
	/// An order needs tracking but no relayer is configured.
	#[error("No relayer configured to track order {0}")]
	MissingRelayer(String),
}

/// Result of a single poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PollOutcome {
	/// Still in flight; poll again later.
	Pending,
	/// Nothing left to watch.
	Settled,
}

/// Polls pending records until they reach a final status.
pub struct TransactionWatcher {
	store: Arc<TransactionStore>,
	delivery: Arc<DeliveryService>,
	relayer: Option<Arc<dyn OrderRelayer>>,
	networks: NetworksConfig,
	timeout: Duration,
	poll_interval: Duration,
	active: Mutex<HashSet<TransactionKey>>,
}

impl TransactionWatcher {
	pub fn new(
		store: Arc<TransactionStore>,
		delivery: Arc<DeliveryService>,
		networks: NetworksConfig,
		timeout: Duration,
		poll_interval: Duration,
	) -> Self {
		Self {
			store,
			delivery,
			relayer: None,
			networks,
			timeout,
			poll_interval,
			active: Mutex::new(HashSet::new()),
		}
	}

	pub fn with_relayer(mut self, relayer: Arc<dyn OrderRelayer>) -> Self {
		self.relayer = Some(relayer);
		self
	}

	/// Returns true while `key` is being watched.
	pub fn is_watching(&self, key: &TransactionKey) -> bool {
		self.active
			.lock()
			.map(|active| active.contains(key))
			.unwrap_or(false)
	}

	/// Watches a record until it settles, disappears or the timeout passes.
	///
	/// Returns immediately if the record is already being watched.
	#[instrument(skip_all, fields(tx_id = %truncate_id(&key.id), chain_id = key.chain_id))]
	pub async fn watch(&self, key: TransactionKey) -> Result<(), WatcherError> {
		let Some(_guard) = ActiveGuard::acquire(&self.active, &key) else {
			tracing::debug!("Already watching");
			return Ok(());
		};

		let start_time = tokio::time::Instant::now();

		loop {
			if start_time.elapsed() > self.timeout {
				tracing::warn!(
					tx_id = %truncate_id(&key.id),
					"Transaction monitoring timeout reached after {} seconds",
					self.timeout.as_secs()
				);
				return Ok(());
			}

			let Some(record) = self.store.get(&key).await else {
				tracing::debug!("Record no longer in store");
				return Ok(());
			};
			if record.status.is_terminal() {
				return Ok(());
			}

			let outcome = if record.is_uniswapx_order() && record.hash.is_none() {
				self.poll_order(&record).await?
			} else if record.source == TransactionSource::Interface {
				self.poll_interface_transaction(&record).await?
			} else {
				self.poll_transaction(&record).await?
			};

			if outcome == PollOutcome::Settled {
				return Ok(());
			}
			tokio::time::sleep(self.poll_interval).await;
		}
	}
}

/// Marks a key as watched for as long as the guard lives.
struct ActiveGuard<'a> {
	active: &'a Mutex<HashSet<TransactionKey>>,
	key: TransactionKey,
}

impl<'a> ActiveGuard<'a> {
	fn acquire(active: &'a Mutex<HashSet<TransactionKey>>, key: &TransactionKey) -> Option<Self> {
		let mut set = active.lock().ok()?;
		if !set.insert(key.clone()) {
			return None;
		}
		Some(Self {
			active,
			key: key.clone(),
		})
	}
}

impl Drop for ActiveGuard<'_> {
	fn drop(&mut self) {
		if let Ok(mut set) = self.active.lock() {
			set.remove(&self.key);
		}
	}
}
