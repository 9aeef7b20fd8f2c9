//! Receipt and nonce polling for on-chain records.

use super::{PollOutcome, TransactionWatcher, WatcherError};
use crate::state::{FinalizedTransaction, TransactionAction};
use crate::utils::{get_receipt_with_retry, network_fee};
use wallet_types::{
	current_timestamp_ms, truncate_id, TransactionReceipt, TransactionRecord, TransactionStatus,
	TxHash,
};

impl TransactionWatcher {
	/// Polls a wallet-submitted transaction.
	///
	/// A mined receipt finalizes the record. While a cancellation is racing
	/// the original, a mined original means the cancellation lost, and a nonce
	/// that moved past the original without its receipt means it won.
	pub(super) async fn poll_transaction(
		&self,
		record: &TransactionRecord,
	) -> Result<PollOutcome, WatcherError> {
		let Some(hash) = record.hash else {
			// Batched calls are rekeyed to their hash, which starts a new watch.
			tracing::debug!("No transaction hash yet");
			return Ok(PollOutcome::Settled);
		};

		if let Some(receipt) = self.fetch_receipt(record.chain_id, hash).await? {
			self.settle_mined(record, receipt).await?;
			return Ok(PollOutcome::Settled);
		}

		if record.status == TransactionStatus::Cancelling {
			if let Some(nonce) = record.nonce() {
				let account_nonce = self
					.delivery
					.get_transaction_count(record.chain_id, &record.from)
					.await?;
				if account_nonce > nonce {
					// The original may have been mined since the first lookup.
					match self.fetch_receipt(record.chain_id, hash).await? {
						Some(receipt) => self.settle_mined(record, receipt).await?,
						None => {
							self.finalize(record, TransactionStatus::Cancelled, None, None)
								.await?
						}
					}
					return Ok(PollOutcome::Settled);
				}
			}
		}

		tracing::debug!(tx_hash = %hash, "Waiting for transaction to be mined");
		Ok(PollOutcome::Pending)
	}

	/// Finalizes a record whose own transaction was mined.
	///
	/// The status is read again from the store, since a cancellation may have
	/// been recorded while the receipt was being fetched.
	async fn settle_mined(
		&self,
		record: &TransactionRecord,
		mut receipt: TransactionReceipt,
	) -> Result<(), WatcherError> {
		let Some(current) = self.store.get(&record.key()).await else {
			return Ok(());
		};
		if current.status.is_terminal() {
			return Ok(());
		}
		receipt.confirmed_time = Some(current_timestamp_ms());
		let status = match (current.status, receipt.status) {
			(TransactionStatus::Cancelling, _) => TransactionStatus::FailedCancel,
			(_, true) => TransactionStatus::Success,
			(_, false) => TransactionStatus::Failed,
		};
		self.finalize(&current, status, Some(receipt), None).await
	}

	/// Polls a transaction submitted by the web interface.
	///
	/// The interface owns these records, so the watcher only reports what it
	/// sees: the final status once mined, otherwise the block it last checked.
	pub(super) async fn poll_interface_transaction(
		&self,
		record: &TransactionRecord,
	) -> Result<PollOutcome, WatcherError> {
		let key = record.key();
		if let Some(hash) = record.hash {
			if let Some(receipt) = self.fetch_receipt(record.chain_id, hash).await? {
				let status = if receipt.status {
					TransactionStatus::Success
				} else {
					TransactionStatus::Failed
				};
				self.store
					.dispatch(TransactionAction::InterfaceFinalize {
						key,
						status,
						type_info: None,
						confirmed_time: current_timestamp_ms(),
					})
					.await?;
				tracing::info!(status = %status, "Interface transaction settled");
				return Ok(PollOutcome::Settled);
			}
		}

		if record.status == TransactionStatus::Pending {
			let block_number = self.delivery.get_block_number(record.chain_id).await?;
			self.store
				.dispatch(TransactionAction::CheckedTransaction { key, block_number })
				.await?;
		}
		Ok(PollOutcome::Pending)
	}

	/// Fetches a receipt, retrying network errors with exponential backoff.
	pub(super) async fn fetch_receipt(
		&self,
		chain_id: u64,
		hash: TxHash,
	) -> Result<Option<TransactionReceipt>, WatcherError> {
		Ok(get_receipt_with_retry(&self.delivery, chain_id, hash, self.poll_interval).await?)
	}

	pub(super) async fn finalize(
		&self,
		record: &TransactionRecord,
		status: TransactionStatus,
		receipt: Option<TransactionReceipt>,
		hash: Option<TxHash>,
	) -> Result<(), WatcherError> {
		let fee = receipt
			.as_ref()
			.map(|receipt| network_fee(receipt, record.chain_id, self.networks.get(&record.chain_id)));
		self.store
			.dispatch(TransactionAction::Finalize(FinalizedTransaction {
				key: record.key(),
				status,
				receipt,
				network_fee: fee,
				hash,
			}))
			.await?;
		tracing::info!(tx_id = %truncate_id(&record.id), status = %status, "Transaction settled");
		Ok(())
	}
}
