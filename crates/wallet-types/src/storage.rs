//! Storage namespaces for persisted wallet data.

/// Namespaces under which the wallet persists data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
	/// The full transaction state table.
	Transactions,
}

impl StorageKey {
	/// Returns the string representation of the storage key.
	pub fn as_str(&self) -> &'static str {
		match self {
			StorageKey::Transactions => "transactions",
		}
	}
}
