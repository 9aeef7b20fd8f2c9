//! UniswapX order submission and tracking.
//!
//! Orders are signed off-chain and handed to a relayer that finds a filler.
//! The wallet keeps a pending record keyed by the order hash; the watcher
//! later polls the relayer for its outcome.

use crate::factory::SubmitUniswapXOrderParams;
use crate::state::{FinalizedTransaction, InvariantViolation, TransactionAction, TransactionStore};
use crate::utils::get_receipt_with_retry;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::instrument;
use wallet_delivery::{DeliveryError, DeliveryService};
use wallet_types::{
	current_timestamp_ms, truncate_id, Bytes, Routing, TransactionRecord,
	TransactionSource, TransactionStatus, TxHash, B256,
};

mod extract;
pub mod relayer;

pub use extract::{
	extract_rest_uniswapx_order_details, map_uniswapx_status, RestAmount, RestToken,
	RestUniswapXOrder, UniswapXOrderStatus, UniswapXOrderType,
};
pub(crate) use extract::currency_id;

/// Errors raised while submitting or tracking an order.
#[derive(Debug, Error)]
pub enum OrderError {
	/// The relayer could not be reached.
	#[error("Relayer error: {0}")]
	Relayer(String),
	/// The relayer refused the order.
	#[error("Order rejected: {0}")]
	Rejected(String),
	/// The relayer answered with an unexpected body.
	#[error("Invalid relayer response: {0}")]
	InvalidResponse(String),
	/// The approval the order depends on reverted.
	#[error("Approval {0} failed")]
	ApprovalFailed(TxHash),
	/// The approval the order depends on was not mined in time.
	#[error("Approval {0} not mined in time")]
	ApprovalTimeout(TxHash),
	/// Error raised by the provider while checking the approval.
	#[error("Delivery error: {0}")]
	Delivery(#[from] DeliveryError),
	/// The store rejected the resulting action.
	#[error("Invariant violation: {0}")]
	Invariant(#[from] InvariantViolation),
}

/// Order payload accepted by the relayer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSubmission {
	pub encoded_order: Bytes,
	/// 65-byte permit signature.
	pub signature: Bytes,
	pub chain_id: u64,
	pub routing: Routing,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub quote_id: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub request_id: Option<String>,
}

/// Relayer view of a single order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusResponse {
	pub order_hash: B256,
	pub order_status: UniswapXOrderStatus,
	/// Fill transaction, present once the order is filled.
	#[serde(default)]
	pub tx_hash: Option<TxHash>,
}

/// Trait defining the interface for a UniswapX order relayer.
#[async_trait]
pub trait OrderRelayer: Send + Sync {
	/// Hands a signed order to the relayer.
	async fn submit_order(&self, order: &OrderSubmission) -> Result<(), OrderError>;

	/// Looks up an order, `None` if the relayer does not know it.
	async fn order_status(
		&self,
		chain_id: u64,
		order_hash: &B256,
	) -> Result<Option<OrderStatusResponse>, OrderError>;
}

/// How long to wait for an approval the order depends on.
#[derive(Debug, Clone, Copy)]
pub struct ApprovalWait {
	pub poll_interval: Duration,
	pub timeout: Duration,
}

impl Default for ApprovalWait {
	fn default() -> Self {
		Self {
			poll_interval: Duration::from_secs(2),
			timeout: Duration::from_secs(300),
		}
	}
}

/// Submits UniswapX orders and records them in the store.
pub struct UniswapXOrderService {
	store: Arc<TransactionStore>,
	relayer: Arc<dyn OrderRelayer>,
	delivery: Arc<DeliveryService>,
	approval_wait: ApprovalWait,
}

impl UniswapXOrderService {
	pub fn new(
		store: Arc<TransactionStore>,
		relayer: Arc<dyn OrderRelayer>,
		delivery: Arc<DeliveryService>,
	) -> Self {
		Self {
			store,
			relayer,
			delivery,
			approval_wait: ApprovalWait::default(),
		}
	}

	pub fn with_approval_wait(mut self, approval_wait: ApprovalWait) -> Self {
		self.approval_wait = approval_wait;
		self
	}

	/// Records the order as pending and hands it to the relayer.
	///
	/// The record is persisted with the rest of the transaction table. A
	/// failed approval or relayer submission finalizes it as failed before
	/// the error is returned.
	#[instrument(skip_all, fields(order_hash = %params.quote.order_hash, chain_id = params.chain_id))]
	pub async fn submit_order(
		&self,
		params: SubmitUniswapXOrderParams,
	) -> Result<TransactionRecord, OrderError> {
		let order_hash = params.quote.order_hash;
		let submission = OrderSubmission {
			encoded_order: params.quote.encoded_order.clone(),
			signature: Bytes::from(params.permit.signature.as_bytes().to_vec()),
			chain_id: params.chain_id,
			routing: params.routing,
			quote_id: params.quote.quote_id.clone(),
			request_id: params.quote.request_id.clone(),
		};

		let mut record = TransactionRecord::new(
			params
				.tx_id
				.clone()
				.unwrap_or_else(|| order_hash.to_string()),
			params.chain_id,
			params.account,
			params.type_info.clone(),
			params.routing,
			TransactionSource::Wallet,
			current_timestamp_ms(),
		);
		record.order_hash = Some(order_hash);
		let key = record.key();

		self.store
			.dispatch(TransactionAction::Add(record.clone()))
			.await?;

		let result = match params.approve_tx_hash {
			Some(approval) => match self.wait_for_approval(params.chain_id, approval).await {
				Ok(()) => self.relayer.submit_order(&submission).await,
				Err(e) => Err(e),
			},
			None => self.relayer.submit_order(&submission).await,
		};

		if let Err(e) = result {
			tracing::warn!(tx_id = %truncate_id(&key.id), error = %e, "Order submission failed");
			self.store
				.dispatch(TransactionAction::Finalize(FinalizedTransaction {
					key,
					status: TransactionStatus::Failed,
					receipt: None,
					network_fee: None,
					hash: None,
				}))
				.await?;
			return Err(e);
		}

		tracing::info!(tx_id = %truncate_id(&record.id), "Submitted UniswapX order");
		Ok(record)
	}

	/// Returns the relayer's current view of an order.
	pub async fn order_status(
		&self,
		chain_id: u64,
		order_hash: &B256,
	) -> Result<Option<OrderStatusResponse>, OrderError> {
		self.relayer.order_status(chain_id, order_hash).await
	}

	async fn wait_for_approval(&self, chain_id: u64, hash: TxHash) -> Result<(), OrderError> {
		let start = tokio::time::Instant::now();
		loop {
			let receipt =
				get_receipt_with_retry(&self.delivery, chain_id, hash, self.approval_wait.poll_interval)
					.await?;
			if let Some(receipt) = receipt {
				if receipt.status {
					return Ok(());
				}
				return Err(OrderError::ApprovalFailed(hash));
			}
			if start.elapsed() >= self.approval_wait.timeout {
				return Err(OrderError::ApprovalTimeout(hash));
			}
			tokio::time::sleep(self.approval_wait.poll_interval).await;
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::engine::event_bus::EventBus;
	use crate::factory::SignedPermit;
	use crate::test_utils::{receipt, ScriptedDelivery};
	use alloy::sol_types::eip712_domain;
	use std::collections::{BTreeMap, HashMap};
	use std::sync::atomic::Ordering;
	use std::sync::Mutex;
	use wallet_delivery::DeliveryInterface;
	use wallet_storage::implementations::memory::MemoryStorage;
	use wallet_storage::StorageService;
	use wallet_types::{
		Address, AnalyticsContext, Signature, SwapTradeAmounts, SwapTransactionInfo,
		TransactionTypeInfo, TypedDataRequest, UniswapXQuote, U256,
	};

	#[derive(Default)]
	struct StubRelayer {
		reject: bool,
		submitted: Mutex<Vec<OrderSubmission>>,
	}

	#[async_trait]
	impl OrderRelayer for StubRelayer {
		async fn submit_order(&self, order: &OrderSubmission) -> Result<(), OrderError> {
			if self.reject {
				return Err(OrderError::Rejected("400: quote expired".into()));
			}
			self.submitted.lock().unwrap().push(order.clone());
			Ok(())
		}

		async fn order_status(
			&self,
			_chain_id: u64,
			_order_hash: &B256,
		) -> Result<Option<OrderStatusResponse>, OrderError> {
			Ok(None)
		}
	}

	fn params(approve_tx_hash: Option<TxHash>) -> SubmitUniswapXOrderParams {
		SubmitUniswapXOrderParams {
			tx_id: None,
			chain_id: 1,
			account: Address::repeat_byte(0x11),
			routing: Routing::DutchV2,
			quote: UniswapXQuote {
				order_hash: B256::repeat_byte(0xaa),
				encoded_order: Bytes::from_static(&[0x01, 0x02]),
				swapper: Address::repeat_byte(0x11),
				deadline: 1_700_000_000,
				quote_id: Some("quote-1".into()),
				request_id: None,
			},
			permit: SignedPermit {
				request: TypedDataRequest {
					domain: eip712_domain! { name: "Permit2", chain_id: 1, },
					types: BTreeMap::new(),
					value: serde_json::json!({}),
				},
				signature: Signature::new(U256::from(1u64), U256::from(2u64), false),
			},
			type_info: TransactionTypeInfo::Swap(SwapTransactionInfo {
				input_currency_id: "1-0x01".into(),
				output_currency_id: "1-0x02".into(),
				trade: SwapTradeAmounts::ExactInput {
					input_currency_amount_raw: "100".into(),
					expected_output_currency_amount_raw: "90".into(),
					minimum_output_currency_amount_raw: "89".into(),
				},
				is_uniswapx_order: true,
				quote_id: Some("quote-1".into()),
				gas_use_estimate: None,
				slippage_tolerance_bips: Some(50),
			}),
			approve_tx_hash,
			analytics: AnalyticsContext::default(),
		}
	}

	fn service(
		relayer: Arc<StubRelayer>,
		delivery: Arc<ScriptedDelivery>,
	) -> (UniswapXOrderService, Arc<TransactionStore>) {
		let store = Arc::new(TransactionStore::new(EventBus::new(16)));
		let mut providers: HashMap<u64, Arc<dyn DeliveryInterface>> = HashMap::new();
		providers.insert(1, delivery);
		let service = UniswapXOrderService::new(
			store.clone(),
			relayer,
			Arc::new(DeliveryService::new(providers, HashMap::new())),
		)
		.with_approval_wait(ApprovalWait {
			poll_interval: Duration::from_millis(5),
			timeout: Duration::from_millis(50),
		});
		(service, store)
	}

	#[tokio::test]
	async fn test_submit_records_pending_order() {
		let relayer = Arc::new(StubRelayer::default());
		let (service, store) = service(relayer.clone(), Arc::default());

		let record = service.submit_order(params(None)).await.unwrap();
		assert_eq!(record.id, B256::repeat_byte(0xaa).to_string());
		assert_eq!(record.order_hash, Some(B256::repeat_byte(0xaa)));
		assert!(record.is_uniswapx_order());

		let stored = store.get(&record.key()).await.unwrap();
		assert_eq!(stored.status, TransactionStatus::Pending);

		let submitted = relayer.submitted.lock().unwrap().clone();
		assert_eq!(submitted.len(), 1);
		assert_eq!(submitted[0].signature.len(), 65);
		assert_eq!(submitted[0].quote_id.as_deref(), Some("quote-1"));
	}

	#[tokio::test]
	async fn test_pending_order_survives_reload() {
		let (service, store) = service(Arc::default(), Arc::default());
		let record = service.submit_order(params(None)).await.unwrap();

		let storage = StorageService::new(Box::new(MemoryStorage::new()));
		store.persist(&storage).await.unwrap();
		let restored = TransactionStore::load(&storage, EventBus::new(16)).await.unwrap();

		let pending = restored.pending_transactions().await;
		assert_eq!(pending.len(), 1);
		assert_eq!(pending[0].key(), record.key());
		assert_eq!(pending[0].order_hash, Some(B256::repeat_byte(0xaa)));
	}

	#[tokio::test]
	async fn test_rejected_order_finalized_failed() {
		let relayer = Arc::new(StubRelayer {
			reject: true,
			..Default::default()
		});
		let (service, store) = service(relayer, Arc::default());

		let err = service.submit_order(params(None)).await.unwrap_err();
		assert!(matches!(err, OrderError::Rejected(_)));

		let pending = store.pending_transactions().await;
		assert!(pending.is_empty());
		let records = store.transactions_for(&Address::repeat_byte(0x11)).await;
		assert_eq!(records[0].status, TransactionStatus::Failed);
	}

	#[tokio::test]
	async fn test_waits_for_mined_approval() {
		let relayer = Arc::new(StubRelayer::default());
		let delivery = Arc::new(ScriptedDelivery::default());
		let approval = B256::repeat_byte(0x0a);
		delivery.set_receipt(receipt(approval, 5, true));
		let (service, _) = service(relayer.clone(), delivery);

		service.submit_order(params(Some(approval))).await.unwrap();
		assert_eq!(relayer.submitted.lock().unwrap().len(), 1);
	}

	#[tokio::test]
	async fn test_approval_lookup_retries_network_errors() {
		let relayer = Arc::new(StubRelayer::default());
		let delivery = Arc::new(ScriptedDelivery::default());
		let approval = B256::repeat_byte(0x0c);
		delivery.set_receipt(receipt(approval, 5, true));
		delivery.failures.store(2, Ordering::SeqCst);
		let (service, store) = service(relayer.clone(), delivery.clone());

		let record = service.submit_order(params(Some(approval))).await.unwrap();
		assert_eq!(delivery.failures.load(Ordering::SeqCst), 0);
		assert_eq!(relayer.submitted.lock().unwrap().len(), 1);
		assert_eq!(
			store.get(&record.key()).await.unwrap().status,
			TransactionStatus::Pending
		);
	}

	#[tokio::test]
	async fn test_reverted_approval_fails_order() {
		let relayer = Arc::new(StubRelayer::default());
		let delivery = Arc::new(ScriptedDelivery::default());
		let approval = B256::repeat_byte(0x0a);
		delivery.set_receipt(receipt(approval, 5, false));
		let (service, store) = service(relayer.clone(), delivery);

		let err = service.submit_order(params(Some(approval))).await.unwrap_err();
		assert!(matches!(err, OrderError::ApprovalFailed(hash) if hash == approval));
		assert!(relayer.submitted.lock().unwrap().is_empty());
		assert!(store.pending_transactions().await.is_empty());
	}

	#[tokio::test]
	async fn test_unmined_approval_times_out() {
		let (service, _) = service(Arc::default(), Arc::default());
		let err = service
			.submit_order(params(Some(B256::repeat_byte(0x0b))))
			.await
			.unwrap_err();
		assert!(matches!(err, OrderError::ApprovalTimeout(_)));
	}
}
