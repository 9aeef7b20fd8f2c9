//! Transaction state management.
//!
//! [`TransactionsState`] is the plain table and reducer; [`TransactionStore`]
//! owns it behind a lock, publishes every change and persists snapshots.

pub mod store;
pub mod transactions;

pub use store::TransactionStore;
pub use transactions::{
	FinalizedTransaction, InvariantViolation, TransactionAction, TransactionsState,
	ViolationReason,
};
