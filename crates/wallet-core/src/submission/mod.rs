//! Submission of signed transactions and their cancellation.
//!
//! The service broadcasts through a [`TransactionSigner`] and records the
//! result in the [`TransactionStore`]; the watcher picks the record up from
//! the store's events.

use crate::factory::SubmitTransactionParams;
use crate::state::{FinalizedTransaction, InvariantViolation, TransactionAction, TransactionStore};
use crate::utils::network_fee;
use alloy::sol;
use alloy::sol_types::SolCall;
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;
use wallet_delivery::signer::{sign_request, SignerError, TransactionSigner};
use wallet_types::{
	current_timestamp_ms, truncate_id, Address, Bytes, NetworkConfig, Routing, TransactionKey,
	TransactionRecord, TransactionRequest, TransactionSource, TransactionStatus,
	TransactionTypeInfo, TxHash, U256,
};

sol! {
	function approve(address spender, uint256 amount) external returns (bool);
}

/// Errors raised while submitting or cancelling a transaction.
#[derive(Debug, Error)]
pub enum SubmissionError {
	/// Error raised by the signer while signing or broadcasting.
	#[error("Signer error: {0}")]
	Signer(#[from] SignerError),
	/// The store rejected the resulting action.
	#[error("Invariant violation: {0}")]
	Invariant(#[from] InvariantViolation),
	/// The transaction is not in the store.
	#[error("Transaction not found: {0}")]
	NotFound(String),
	/// The transaction cannot be cancelled by the wallet.
	#[error("Transaction cannot be cancelled: {0}")]
	NotCancellable(String),
}

/// Submits signed transactions for one account on one chain.
pub struct TransactionService {
	store: Arc<TransactionStore>,
	signer: Arc<dyn TransactionSigner>,
	network: Option<NetworkConfig>,
}

impl TransactionService {
	pub fn new(
		store: Arc<TransactionStore>,
		signer: Arc<dyn TransactionSigner>,
		network: Option<NetworkConfig>,
	) -> Self {
		Self {
			store,
			signer,
			network,
		}
	}

	/// Broadcasts a signed transaction and records it as pending.
	#[instrument(skip_all, fields(chain_id = params.chain_id))]
	pub async fn submit_transaction(
		&self,
		params: SubmitTransactionParams,
	) -> Result<TransactionRecord, SubmissionError> {
		let hash = self
			.signer
			.send_transaction(&params.request.signed_request)
			.await?;
		if hash != params.request.hash {
			tracing::warn!(
				expected = %params.request.hash,
				returned = %hash,
				"RPC returned a different transaction hash"
			);
		}

		let record = build_record(params, hash, current_timestamp_ms());
		self.store
			.dispatch(TransactionAction::Add(record.clone()))
			.await?;

		tracing::info!(tx_id = %truncate_id(&record.id), tx_hash = %hash, "Submitted transaction");
		Ok(record)
	}

	/// Broadcasts a signed transaction, waits for inclusion and records the
	/// final outcome.
	#[instrument(skip_all, fields(chain_id = params.chain_id))]
	pub async fn submit_transaction_sync(
		&self,
		params: SubmitTransactionParams,
	) -> Result<TransactionRecord, SubmissionError> {
		let mut receipt = self
			.signer
			.send_transaction_sync(&params.request.signed_request)
			.await?;
		let now = current_timestamp_ms();
		receipt.confirmed_time = Some(now);

		let chain_id = params.chain_id;
		let record = build_record(params, receipt.transaction_hash, now);
		let key = record.key();
		self.store
			.dispatch(TransactionAction::Add(record.clone()))
			.await?;

		let status = if receipt.status {
			TransactionStatus::Success
		} else {
			TransactionStatus::Failed
		};
		let fee = network_fee(&receipt, chain_id, self.network.as_ref());
		self.store
			.dispatch(TransactionAction::Finalize(FinalizedTransaction {
				key: key.clone(),
				status,
				receipt: Some(receipt),
				network_fee: Some(fee),
				hash: None,
			}))
			.await?;

		tracing::info!(tx_id = %truncate_id(&key.id), status = %status, "Submitted transaction synchronously");
		self.store
			.get(&key)
			.await
			.ok_or(SubmissionError::NotFound(key.id))
	}

	/// Replaces a pending transaction with a no-op at the same nonce.
	///
	/// Approvals are cancelled with a zero approval of the same spender,
	/// everything else with a zero-value transfer to self. Fees are bumped so
	/// the node accepts the replacement.
	#[instrument(skip_all, fields(tx_id = %truncate_id(&key.id), chain_id = key.chain_id))]
	pub async fn cancel_transaction(&self, key: &TransactionKey) -> Result<TxHash, SubmissionError> {
		let record = self
			.store
			.get(key)
			.await
			.ok_or_else(|| SubmissionError::NotFound(key.id.clone()))?;
		let cancel_request = build_cancel_request(&record)?;

		let signed = sign_request(self.signer.as_ref(), cancel_request).await?;
		self.store
			.dispatch(TransactionAction::Cancel {
				key: key.clone(),
				cancel_request: signed.request.clone(),
			})
			.await?;

		let hash = match self.signer.send_transaction(&signed.signed_request).await {
			Ok(hash) => hash,
			Err(e) => {
				tracing::warn!(error = %e, "Cancellation broadcast failed, restoring transaction");
				self.restore_after_failed_cancel(&record).await;
				return Err(e.into());
			}
		};
		tracing::info!(cancel_hash = %hash, "Sent cancellation");
		Ok(hash)
	}

	/// Puts back the status and cancel request a record had before an
	/// unsent cancellation, unless something else settled it meanwhile.
	async fn restore_after_failed_cancel(&self, previous: &TransactionRecord) {
		let Some(mut current) = self.store.get(&previous.key()).await else {
			return;
		};
		if current.status != TransactionStatus::Cancelling {
			return;
		}
		current.status = previous.status;
		current.cancel_request = previous.cancel_request.clone();
		if let Err(e) = self
			.store
			.dispatch(TransactionAction::UpdateWithoutWatch(current))
			.await
		{
			tracing::error!(error = %e, "Failed to restore transaction after cancellation");
		}
	}
}

fn build_record(params: SubmitTransactionParams, hash: TxHash, now: u64) -> TransactionRecord {
	let routing = match params.type_info {
		TransactionTypeInfo::Bridge(_) => Routing::Bridge,
		_ => Routing::Classic,
	};
	let id = params.tx_id.unwrap_or_else(|| hash.to_string());

	let mut record = TransactionRecord::new(
		id,
		params.chain_id,
		params.account,
		params.type_info,
		routing,
		TransactionSource::Wallet,
		now,
	);
	let mut options = params.options;
	options.rpc_submission_timestamp_ms = Some(now);

	record.hash = Some(hash);
	record.options = Some(options);
	record.transaction_origin_type = params.transaction_origin_type;
	record
}

fn build_cancel_request(record: &TransactionRecord) -> Result<TransactionRequest, SubmissionError> {
	if record.is_uniswapx_order() {
		return Err(SubmissionError::NotCancellable(
			"orders are cancelled through the relayer".into(),
		));
	}
	let original = record
		.options
		.as_ref()
		.map(|options| &options.request)
		.ok_or_else(|| SubmissionError::NotCancellable("no signed request recorded".into()))?;
	let nonce = original
		.nonce
		.ok_or_else(|| SubmissionError::NotCancellable("signed request has no nonce".into()))?;

	let (to, data): (Address, Bytes) = match &record.type_info {
		TransactionTypeInfo::Approve(info) => (
			info.token_address,
			approveCall {
				spender: info.spender,
				amount: U256::ZERO,
			}
			.abi_encode()
			.into(),
		),
		_ => (record.from, Default::default()),
	};

	Ok(TransactionRequest {
		chain_id: Some(record.chain_id),
		from: Some(record.from),
		to: Some(to),
		data,
		value: U256::ZERO,
		nonce: Some(nonce),
		gas_limit: None,
		gas_price: original.gas_price.map(bump_fee),
		max_fee_per_gas: original.max_fee_per_gas.map(bump_fee),
		max_priority_fee_per_gas: original.max_priority_fee_per_gas.map(bump_fee),
	})
}

/// Raises a fee by 20%.
fn bump_fee(fee: u128) -> u128 {
	fee.saturating_mul(12) / 10
}
