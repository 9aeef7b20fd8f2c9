//! Shared handle over the transaction table.

use super::{InvariantViolation, TransactionAction, TransactionsState};
use crate::engine::event_bus::EventBus;
use tokio::sync::{broadcast, RwLock};
use wallet_storage::{StorageError, StorageService};
use wallet_types::{truncate_id, Address, StorageKey, TransactionEvent, TransactionKey, TransactionRecord};

/// Id under which the whole table is persisted.
const STATE_ID: &str = "state";

/// Owns the transaction table.
///
/// Actions are applied one at a time under the write lock, so concurrent
/// dispatchers observe a single total order. The resulting event is
/// published before the lock is released.
pub struct TransactionStore {
	state: RwLock<TransactionsState>,
	event_bus: EventBus,
}

impl TransactionStore {
	pub fn new(event_bus: EventBus) -> Self {
		Self::with_state(TransactionsState::new(), event_bus)
	}

	pub fn with_state(state: TransactionsState, event_bus: EventBus) -> Self {
		Self {
			state: RwLock::new(state),
			event_bus,
		}
	}

	/// Restores the table persisted by [`TransactionStore::persist`], or an
	/// empty one if nothing was stored yet.
	pub async fn load(storage: &StorageService, event_bus: EventBus) -> Result<Self, StorageError> {
		let state = storage
			.retrieve_optional::<TransactionsState>(StorageKey::Transactions, STATE_ID)
			.await?
			.unwrap_or_default();
		tracing::info!(
			pending = state.pending_transactions().len(),
			"Loaded transaction state"
		);
		Ok(Self::with_state(state, event_bus))
	}

	/// Writes a snapshot of the table to storage.
	pub async fn persist(&self, storage: &StorageService) -> Result<(), StorageError> {
		let state = self.state.read().await;
		storage
			.store(StorageKey::Transactions, STATE_ID, &*state)
			.await
	}

	/// Applies an action and publishes the resulting event.
	pub async fn dispatch(&self, action: TransactionAction) -> Result<(), InvariantViolation> {
		let mut state = self.state.write().await;
		match state.reduce(action) {
			Ok(Some(event)) => {
				tracing::debug!(event = ?event, "Applied transaction action");
				self.event_bus.publish(event).ok();
				Ok(())
			}
			Ok(None) => Ok(()),
			Err(violation) => {
				tracing::error!(
					action = violation.action,
					tx_id = %truncate_id(&violation.id),
					reason = %violation.reason,
					"Rejected transaction action"
				);
				Err(violation)
			}
		}
	}

	pub async fn get(&self, key: &TransactionKey) -> Option<TransactionRecord> {
		self.state.read().await.get(key).cloned()
	}

	pub async fn transactions_for(&self, address: &Address) -> Vec<TransactionRecord> {
		self.state.read().await.transactions_for(address)
	}

	pub async fn pending_transactions(&self) -> Vec<TransactionRecord> {
		self.state.read().await.pending_transactions()
	}

	pub async fn snapshot(&self) -> TransactionsState {
		self.state.read().await.clone()
	}

	pub fn subscribe(&self) -> broadcast::Receiver<TransactionEvent> {
		self.event_bus.subscribe()
	}

	pub fn event_bus(&self) -> &EventBus {
		&self.event_bus
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::state::ViolationReason;
	use std::sync::Arc;
	use wallet_storage::implementations::memory::MemoryStorage;
	use wallet_types::{
		Routing, TransactionSource, TransactionTypeInfo, UnknownTransactionInfo,
	};

	fn record(id: &str) -> TransactionRecord {
		TransactionRecord::new(
			id,
			1,
			Address::repeat_byte(0x11),
			TransactionTypeInfo::Unknown(UnknownTransactionInfo::default()),
			Routing::Classic,
			TransactionSource::Wallet,
			1_000,
		)
	}

	#[tokio::test]
	async fn test_dispatch_publishes_events_in_order() {
		let store = TransactionStore::new(EventBus::new(16));
		let mut events = store.subscribe();

		store.dispatch(TransactionAction::Add(record("a"))).await.unwrap();
		store
			.dispatch(TransactionAction::Replace {
				key: record("a").key(),
			})
			.await
			.unwrap();

		assert_eq!(
			events.recv().await.unwrap(),
			TransactionEvent::Added {
				key: record("a").key()
			}
		);
		assert_eq!(
			events.recv().await.unwrap(),
			TransactionEvent::Updated {
				key: record("a").key(),
				watch: true
			}
		);
	}

	#[tokio::test]
	async fn test_violation_publishes_nothing() {
		let store = TransactionStore::new(EventBus::new(16));
		let mut events = store.subscribe();

		let err = store
			.dispatch(TransactionAction::Delete {
				key: record("missing").key(),
			})
			.await
			.unwrap_err();
		assert_eq!(err.reason, ViolationReason::Missing);
		assert!(events.try_recv().is_err());
	}

	#[tokio::test]
	async fn test_concurrent_adds_keep_key_unique() {
		let store = Arc::new(TransactionStore::new(EventBus::new(64)));
		let mut handles = Vec::new();
		for _ in 0..8 {
			let store = store.clone();
			handles.push(tokio::spawn(async move {
				store.dispatch(TransactionAction::Add(record("same"))).await
			}));
		}

		let mut accepted = 0;
		for handle in handles {
			if handle.await.unwrap().is_ok() {
				accepted += 1;
			}
		}
		assert_eq!(accepted, 1);
		assert_eq!(store.pending_transactions().await.len(), 1);
	}

	#[tokio::test]
	async fn test_persist_and_load() {
		let storage = StorageService::new(Box::new(MemoryStorage::new()));

		let empty = TransactionStore::load(&storage, EventBus::default()).await.unwrap();
		assert!(empty.snapshot().await.is_empty());

		let store = TransactionStore::new(EventBus::default());
		store.dispatch(TransactionAction::Add(record("a"))).await.unwrap();
		store.dispatch(TransactionAction::Add(record("b"))).await.unwrap();
		store.persist(&storage).await.unwrap();

		let restored = TransactionStore::load(&storage, EventBus::default()).await.unwrap();
		assert_eq!(restored.snapshot().await, store.snapshot().await);
		assert_eq!(
			restored.get(&record("b").key()).await,
			Some(record("b"))
		);
	}
}
