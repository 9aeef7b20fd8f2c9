//! Transaction table and its reducer.
//!
//! The table is keyed address -> chain id -> transaction id. Every mutation
//! goes through [`TransactionsState::reduce`], which checks the action's
//! preconditions first and leaves the table untouched when they fail.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use wallet_types::{
	Address, NetworkFee, TransactionEvent, TransactionKey, TransactionReceipt, TransactionRecord,
	TransactionRequest, TransactionSource, TransactionStatus, TransactionTypeInfo, TxHash,
};

/// Why an action was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViolationReason {
	#[error("a transaction with this id already exists")]
	DuplicateKey,
	#[error("transaction does not exist")]
	Missing,
	#[error("transaction was not created by the wallet")]
	NotWalletTransaction,
	#[error("transaction was not created by the interface")]
	NotInterfaceTransaction,
	#[error("transaction is not pending")]
	NotPending,
	#[error("transaction is not a bridge transaction")]
	NotBridge,
	#[error("type info does not match the stored transaction type")]
	TypeMismatch,
	#[error("order finalized as successful without a fill transaction hash")]
	MissingFillHash,
	#[error("status {0} is not terminal")]
	NonTerminalStatus(TransactionStatus),
	#[error("cannot move from terminal status {from} to {to}")]
	TerminalStatus {
		from: TransactionStatus,
		to: TransactionStatus,
	},
	#[error("type info is not a fiat on-ramp type")]
	NotFiatOnRamp,
	#[error("transaction was already replaced by its cancellation")]
	AlreadyCancelled,
}

/// A rejected store action. The state is unchanged when this is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{action}: {reason} (id {id})")]
pub struct InvariantViolation {
	pub action: &'static str,
	pub id: String,
	pub reason: ViolationReason,
}

/// Outcome of a mined or otherwise settled wallet transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizedTransaction {
	pub key: TransactionKey,
	pub status: TransactionStatus,
	pub receipt: Option<TransactionReceipt>,
	pub network_fee: Option<NetworkFee>,
	/// Fill transaction hash, required when an order finalizes as successful.
	pub hash: Option<TxHash>,
}

/// Every mutation the store accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum TransactionAction {
	Add(TransactionRecord),
	Update(TransactionRecord),
	UpdateWithoutWatch(TransactionRecord),
	Finalize(FinalizedTransaction),
	InterfaceFinalize {
		key: TransactionKey,
		status: TransactionStatus,
		type_info: Option<TransactionTypeInfo>,
		confirmed_time: u64,
	},
	Cancel {
		key: TransactionKey,
		cancel_request: TransactionRequest,
	},
	Replace {
		key: TransactionKey,
	},
	Delete {
		key: TransactionKey,
	},
	CheckedTransaction {
		key: TransactionKey,
		block_number: u64,
	},
	ConfirmBridgeDeposit {
		key: TransactionKey,
	},
	UpdateTransactionInfo {
		key: TransactionKey,
		type_info: TransactionTypeInfo,
	},
	ApplyTransactionHashToBatch {
		address: Address,
		chain_id: u64,
		batch_id: String,
		hash: TxHash,
	},
	CancelTransactionWithHash {
		key: TransactionKey,
		cancel_hash: TxHash,
	},
	UpsertFiatOnRamp(TransactionRecord),
	ClearAll {
		address: Address,
		chain_id: u64,
	},
	Reset,
}

impl TransactionAction {
	/// Name used in logs and violations.
	pub fn name(&self) -> &'static str {
		match self {
			TransactionAction::Add(_) => "add_transaction",
			TransactionAction::Update(_) => "update_transaction",
			TransactionAction::UpdateWithoutWatch(_) => "update_transaction_without_watch",
			TransactionAction::Finalize(_) => "finalize_transaction",
			TransactionAction::InterfaceFinalize { .. } => "interface_finalize_transaction",
			TransactionAction::Cancel { .. } => "cancel_transaction",
			TransactionAction::Replace { .. } => "replace_transaction",
			TransactionAction::Delete { .. } => "delete_transaction",
			TransactionAction::CheckedTransaction { .. } => "checked_transaction",
			TransactionAction::ConfirmBridgeDeposit { .. } => "confirm_bridge_deposit",
			TransactionAction::UpdateTransactionInfo { .. } => "update_transaction_info",
			TransactionAction::ApplyTransactionHashToBatch { .. } => {
				"apply_transaction_hash_to_batch"
			}
			TransactionAction::CancelTransactionWithHash { .. } => {
				"cancel_transaction_with_hash"
			}
			TransactionAction::UpsertFiatOnRamp(_) => "upsert_fiat_on_ramp_transaction",
			TransactionAction::ClearAll { .. } => "clear_all_transactions",
			TransactionAction::Reset => "reset_transactions",
		}
	}
}

type ChainTransactions = BTreeMap<String, TransactionRecord>;

/// Transactions keyed by sender, chain id and transaction id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionsState(BTreeMap<Address, BTreeMap<u64, ChainTransactions>>);

impl TransactionsState {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn get(&self, key: &TransactionKey) -> Option<&TransactionRecord> {
		self.0.get(&key.from)?.get(&key.chain_id)?.get(&key.id)
	}

	pub fn contains(&self, key: &TransactionKey) -> bool {
		self.get(key).is_some()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// All transactions sent by `address`, oldest first.
	pub fn transactions_for(&self, address: &Address) -> Vec<TransactionRecord> {
		let mut records: Vec<TransactionRecord> = self
			.0
			.get(address)
			.into_iter()
			.flat_map(|chains| chains.values())
			.flat_map(|transactions| transactions.values())
			.cloned()
			.collect();
		records.sort_by_key(|record| record.added_time);
		records
	}

	/// Every record whose status is not terminal, oldest first.
	pub fn pending_transactions(&self) -> Vec<TransactionRecord> {
		let mut records: Vec<TransactionRecord> = self
			.iter()
			.filter(|record| !record.status.is_terminal())
			.cloned()
			.collect();
		records.sort_by_key(|record| record.added_time);
		records
	}

	pub fn iter(&self) -> impl Iterator<Item = &TransactionRecord> {
		self.0
			.values()
			.flat_map(|chains| chains.values())
			.flat_map(|transactions| transactions.values())
	}

	/// Applies one action.
	///
	/// Returns the event describing the change, or `None` when the action was
	/// a tolerated no-op.
	pub fn reduce(
		&mut self,
		action: TransactionAction,
	) -> Result<Option<TransactionEvent>, InvariantViolation> {
		let name = action.name();
		match action {
			TransactionAction::Add(record) => {
				let key = record.key();
				if self.contains(&key) {
					return Err(violation(name, &key.id, ViolationReason::DuplicateKey));
				}
				self.insert(record);
				Ok(Some(TransactionEvent::Added { key }))
			}
			TransactionAction::Update(record) => {
				let key = self.replace_record(name, record)?;
				Ok(Some(TransactionEvent::Updated { key, watch: true }))
			}
			TransactionAction::UpdateWithoutWatch(record) => {
				let key = self.replace_record(name, record)?;
				Ok(Some(TransactionEvent::Updated { key, watch: false }))
			}
			TransactionAction::Finalize(finalized) => {
				let key = finalized.key.clone();
				self.finalize(name, finalized)?;
				let status = self.status_of(&key);
				Ok(Some(TransactionEvent::Finalized { key, status }))
			}
			TransactionAction::InterfaceFinalize {
				key,
				status,
				type_info,
				confirmed_time,
			} => {
				let record = self.entry_mut(name, &key)?;
				require_source(name, record, TransactionSource::Interface)?;
				check_transition(name, record, status)?;
				record.status = status;
				record.confirmed_time = Some(confirmed_time);
				if let Some(type_info) = type_info {
					record.type_info = type_info;
				}
				Ok(Some(TransactionEvent::Finalized { key, status }))
			}
			TransactionAction::Cancel {
				key,
				cancel_request,
			} => {
				let record = self.entry_mut(name, &key)?;
				require_source(name, record, TransactionSource::Wallet)?;
				check_transition(name, record, TransactionStatus::Cancelling)?;
				record.status = TransactionStatus::Cancelling;
				record.cancel_request = Some(cancel_request);
				Ok(Some(TransactionEvent::Updated { key, watch: true }))
			}
			TransactionAction::Replace { key } => {
				let record = self.entry_mut(name, &key)?;
				check_transition(name, record, TransactionStatus::Replacing)?;
				record.status = TransactionStatus::Replacing;
				Ok(Some(TransactionEvent::Updated { key, watch: true }))
			}
			TransactionAction::Delete { key } => {
				self.remove(&key)
					.ok_or_else(|| violation(name, &key.id, ViolationReason::Missing))?;
				Ok(Some(TransactionEvent::Deleted { key }))
			}
			TransactionAction::CheckedTransaction { key, block_number } => {
				let record = self.entry_mut(name, &key)?;
				require_source(name, record, TransactionSource::Interface)?;
				if record.status != TransactionStatus::Pending {
					return Err(violation(name, &key.id, ViolationReason::NotPending));
				}
				record.last_checked_block_number = Some(
					record
						.last_checked_block_number
						.map_or(block_number, |checked| checked.max(block_number)),
				);
				Ok(Some(TransactionEvent::Updated { key, watch: false }))
			}
			TransactionAction::ConfirmBridgeDeposit { key } => {
				let record = self.entry_mut(name, &key)?;
				require_source(name, record, TransactionSource::Interface)?;
				let TransactionTypeInfo::Bridge(info) = &mut record.type_info else {
					return Err(violation(name, &key.id, ViolationReason::NotBridge));
				};
				info.deposit_confirmed = true;
				Ok(Some(TransactionEvent::Updated { key, watch: false }))
			}
			TransactionAction::UpdateTransactionInfo { key, type_info } => {
				let record = self.entry_mut(name, &key)?;
				require_source(name, record, TransactionSource::Interface)?;
				if !record.type_info.same_type(&type_info) {
					return Err(violation(name, &key.id, ViolationReason::TypeMismatch));
				}
				record.type_info = type_info;
				Ok(Some(TransactionEvent::Updated { key, watch: false }))
			}
			TransactionAction::ApplyTransactionHashToBatch {
				address,
				chain_id,
				batch_id,
				hash,
			} => {
				let previous = TransactionKey {
					from: address,
					chain_id,
					id: batch_id,
				};
				if !self.contains(&previous) {
					tracing::debug!(batch_id = %previous.id, "No batch to apply transaction hash to");
					return Ok(None);
				}
				let key = self.rekey(name, &previous, hash, |record| {
					record.hash = Some(hash);
				})?;
				Ok(Some(TransactionEvent::Rekeyed { previous, key }))
			}
			TransactionAction::CancelTransactionWithHash { key, cancel_hash } => {
				let record = self
					.get(&key)
					.ok_or_else(|| violation(name, &key.id, ViolationReason::Missing))?;
				require_source(name, record, TransactionSource::Interface)?;
				if record.cancelled {
					return Err(violation(name, &key.id, ViolationReason::AlreadyCancelled));
				}
				let new_key = self.rekey(name, &key, cancel_hash, |record| {
					record.hash = Some(cancel_hash);
					record.cancelled = true;
				})?;
				Ok(Some(TransactionEvent::Rekeyed {
					previous: key,
					key: new_key,
				}))
			}
			TransactionAction::UpsertFiatOnRamp(record) => {
				let key = record.key();
				if !record.type_info.is_fiat_on_ramp() {
					return Err(violation(name, &key.id, ViolationReason::NotFiatOnRamp));
				}
				match self.get(&key) {
					Some(existing) => {
						check_transition(name, existing, record.status)?;
						self.insert(record);
						Ok(Some(TransactionEvent::Updated { key, watch: false }))
					}
					None => {
						self.insert(record);
						Ok(Some(TransactionEvent::Added { key }))
					}
				}
			}
			TransactionAction::ClearAll { address, chain_id } => {
				if let Some(chains) = self.0.get_mut(&address) {
					chains.remove(&chain_id);
					if chains.is_empty() {
						self.0.remove(&address);
					}
				}
				Ok(Some(TransactionEvent::Cleared { address, chain_id }))
			}
			TransactionAction::Reset => {
				self.0.clear();
				Ok(Some(TransactionEvent::Reset))
			}
		}
	}

	fn insert(&mut self, record: TransactionRecord) {
		self.0
			.entry(record.from)
			.or_default()
			.entry(record.chain_id)
			.or_default()
			.insert(record.id.clone(), record);
	}

	fn remove(&mut self, key: &TransactionKey) -> Option<TransactionRecord> {
		let chains = self.0.get_mut(&key.from)?;
		let transactions = chains.get_mut(&key.chain_id)?;
		let removed = transactions.remove(&key.id)?;
		if transactions.is_empty() {
			chains.remove(&key.chain_id);
		}
		if chains.is_empty() {
			self.0.remove(&key.from);
		}
		Some(removed)
	}

	fn entry_mut(
		&mut self,
		action: &'static str,
		key: &TransactionKey,
	) -> Result<&mut TransactionRecord, InvariantViolation> {
		self.0
			.get_mut(&key.from)
			.and_then(|chains| chains.get_mut(&key.chain_id))
			.and_then(|transactions| transactions.get_mut(&key.id))
			.ok_or_else(|| violation(action, &key.id, ViolationReason::Missing))
	}

	fn status_of(&self, key: &TransactionKey) -> TransactionStatus {
		self.get(key)
			.map(|record| record.status)
			.unwrap_or(TransactionStatus::Unknown)
	}

	fn replace_record(
		&mut self,
		action: &'static str,
		record: TransactionRecord,
	) -> Result<TransactionKey, InvariantViolation> {
		let key = record.key();
		let existing = self
			.get(&key)
			.ok_or_else(|| violation(action, &key.id, ViolationReason::Missing))?;
		check_transition(action, existing, record.status)?;
		self.insert(record);
		Ok(key)
	}

	fn finalize(
		&mut self,
		action: &'static str,
		finalized: FinalizedTransaction,
	) -> Result<(), InvariantViolation> {
		let FinalizedTransaction {
			key,
			status,
			receipt,
			network_fee,
			hash,
		} = finalized;

		if !status.is_terminal() {
			return Err(violation(
				action,
				&key.id,
				ViolationReason::NonTerminalStatus(status),
			));
		}

		let record = self.entry_mut(action, &key)?;
		require_source(action, record, TransactionSource::Wallet)?;
		let fill_hash = if record.is_uniswapx_order() && status == TransactionStatus::Success {
			Some(hash.ok_or_else(|| violation(action, &key.id, ViolationReason::MissingFillHash))?)
		} else {
			None
		};

		record.status = status;
		if receipt.is_some() {
			record.receipt = receipt;
		}
		if network_fee.is_some() {
			record.network_fee = network_fee;
		}
		if fill_hash.is_some() {
			record.hash = fill_hash;
		}
		Ok(())
	}

	/// Moves a record to the key derived from `hash`, applying `apply` to it.
	fn rekey<F>(
		&mut self,
		action: &'static str,
		previous: &TransactionKey,
		hash: TxHash,
		apply: F,
	) -> Result<TransactionKey, InvariantViolation>
	where
		F: FnOnce(&mut TransactionRecord),
	{
		let key = TransactionKey {
			from: previous.from,
			chain_id: previous.chain_id,
			id: hash.to_string(),
		};
		if key != *previous && self.contains(&key) {
			return Err(violation(action, &key.id, ViolationReason::DuplicateKey));
		}

		let mut record = self
			.remove(previous)
			.ok_or_else(|| violation(action, &previous.id, ViolationReason::Missing))?;
		record.id = key.id.clone();
		apply(&mut record);
		self.insert(record);
		Ok(key)
	}
}

fn violation(action: &'static str, id: &str, reason: ViolationReason) -> InvariantViolation {
	InvariantViolation {
		action,
		id: id.to_string(),
		reason,
	}
}

fn require_source(
	action: &'static str,
	record: &TransactionRecord,
	source: TransactionSource,
) -> Result<(), InvariantViolation> {
	if record.source == source {
		return Ok(());
	}
	let reason = match source {
		TransactionSource::Wallet => ViolationReason::NotWalletTransaction,
		TransactionSource::Interface => ViolationReason::NotInterfaceTransaction,
	};
	Err(violation(action, &record.id, reason))
}

/// Terminal records never return to an in-flight status.
fn check_transition(
	action: &'static str,
	record: &TransactionRecord,
	to: TransactionStatus,
) -> Result<(), InvariantViolation> {
	let in_flight = matches!(
		to,
		TransactionStatus::Pending | TransactionStatus::Cancelling | TransactionStatus::Replacing
	);
	if record.status.is_terminal() && in_flight {
		return Err(violation(
			action,
			&record.id,
			ViolationReason::TerminalStatus {
				from: record.status,
				to,
			},
		));
	}
	Ok(())
}
