//! Wallet engine that ties the transaction store to its watcher.
//!
//! The engine owns the shared services and runs the main loop: every record
//! the store announces for watching gets a watch task, pending records are
//! resumed on start, and the table is snapshotted to storage periodically
//! and on shutdown.

pub mod event_bus;

use crate::monitoring::TransactionWatcher;
use crate::orders::{OrderRelayer, UniswapXOrderService};
use crate::state::TransactionStore;
use crate::submission::TransactionService;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::Semaphore;
use wallet_account::AccountService;
use wallet_config::Config;
use wallet_delivery::signer::{
	BundledDelegationTransactionSignerService, DelegationInfoProvider, TransactionSigner,
	TransactionSignerService,
};
use wallet_delivery::DeliveryService;
use wallet_storage::StorageService;
use wallet_types::{Address, TransactionKey};

/// Upper bound on watch tasks running at once.
const MAX_CONCURRENT_WATCHES: usize = 100;

/// Errors that can occur during engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Service error: {0}")]
	Service(String),
	#[error("Handler error: {0}")]
	Handler(String),
}

/// Main wallet engine.
#[derive(Clone)]
pub struct WalletEngine {
	/// Wallet configuration.
	pub(crate) config: Config,
	/// Storage the transaction table is persisted to.
	pub(crate) storage: Arc<StorageService>,
	/// Accounts holding signing keys.
	pub(crate) accounts: Arc<AccountService>,
	/// Per-chain RPC providers.
	pub(crate) delivery: Arc<DeliveryService>,
	/// Transaction table.
	pub(crate) store: Arc<TransactionStore>,
	/// Watcher resolving pending records.
	pub(crate) watcher: Arc<TransactionWatcher>,
	/// UniswapX order relayer, if configured.
	pub(crate) relayer: Option<Arc<dyn OrderRelayer>>,
}

impl WalletEngine {
	pub fn new(
		config: Config,
		storage: Arc<StorageService>,
		accounts: Arc<AccountService>,
		delivery: Arc<DeliveryService>,
		store: Arc<TransactionStore>,
		relayer: Option<Arc<dyn OrderRelayer>>,
	) -> Self {
		let mut watcher = TransactionWatcher::new(
			store.clone(),
			delivery.clone(),
			config.networks.clone(),
			Duration::from_secs(config.wallet.monitoring_timeout_minutes * 60),
			Duration::from_secs(config.wallet.poll_interval_seconds),
		);
		if let Some(relayer) = &relayer {
			watcher = watcher.with_relayer(relayer.clone());
		}

		Self {
			config,
			storage,
			accounts,
			delivery,
			store,
			watcher: Arc::new(watcher),
			relayer,
		}
	}

	/// Submission service signing with `account` on `chain_id`.
	pub fn transaction_service(&self, account: Address, chain_id: u64) -> TransactionService {
		let signer = Arc::new(self.signer(account, chain_id));
		self.service_with_signer(chain_id, signer)
	}

	/// Submission service that bundles a delegation authorization into the
	/// first transaction of a delegated account.
	pub fn bundled_transaction_service(
		&self,
		account: Address,
		chain_id: u64,
		delegation: Arc<dyn DelegationInfoProvider>,
	) -> TransactionService {
		let signer = Arc::new(BundledDelegationTransactionSignerService::new(
			self.signer(account, chain_id),
			delegation,
		));
		self.service_with_signer(chain_id, signer)
	}

	/// Order service backed by the configured relayer.
	pub fn order_service(&self) -> Result<UniswapXOrderService, EngineError> {
		let relayer = self
			.relayer
			.clone()
			.ok_or_else(|| EngineError::Config("No UniswapX relayer configured".into()))?;
		Ok(UniswapXOrderService::new(
			self.store.clone(),
			relayer,
			self.delivery.clone(),
		))
	}

	fn signer(&self, account: Address, chain_id: u64) -> TransactionSignerService {
		TransactionSignerService::new(
			account,
			chain_id,
			self.accounts.clone(),
			self.delivery.clone(),
		)
	}

	fn service_with_signer(
		&self,
		chain_id: u64,
		signer: Arc<dyn TransactionSigner>,
	) -> TransactionService {
		TransactionService::new(
			self.store.clone(),
			signer,
			self.config.networks.get(&chain_id).cloned(),
		)
	}

	/// Main execution loop, until ctrl-c.
	pub async fn run(&self) -> Result<(), EngineError> {
		self.run_until(async {
			tokio::signal::ctrl_c().await.ok();
		})
		.await
	}

	/// Main execution loop, until `shutdown` completes.
	pub async fn run_until<S>(&self, shutdown: S) -> Result<(), EngineError>
	where
		S: Future<Output = ()>,
	{
		// Subscribed before resuming so no event in between is missed.
		let mut event_receiver = self.store.subscribe();

		let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_WATCHES));

		self.resume_pending(&semaphore).await;

		let store = self.store.clone();
		let storage = self.storage.clone();
		let persist_interval =
			tokio::time::interval(Duration::from_secs(self.config.wallet.persist_interval_seconds));
		let persist_handle = tokio::spawn(async move {
			let mut interval = persist_interval;
			interval.tick().await;
			loop {
				interval.tick().await;
				if let Err(e) = store.persist(&storage).await {
					tracing::warn!("Transaction state snapshot failed: {}", e);
				}
			}
		});

		tokio::pin!(shutdown);
		loop {
			tokio::select! {
				received = event_receiver.recv() => {
					match received {
						Ok(event) => {
							if let Some(key) = event.watch_key() {
								self.spawn_watch(&semaphore, key.clone()).await;
							}
						}
						Err(RecvError::Lagged(skipped)) => {
							tracing::warn!(skipped, "Event receiver lagged, resuming pending transactions");
							self.resume_pending(&semaphore).await;
						}
						Err(RecvError::Closed) => break,
					}
				}

				_ = &mut shutdown => {
					break;
				}
			}
		}

		persist_handle.abort();
		self.store
			.persist(&self.storage)
			.await
			.map_err(|e| EngineError::Service(format!("Failed to persist transactions: {}", e)))?;
		tracing::info!("Wallet engine stopped");
		Ok(())
	}

	/// Starts watching every record that has not reached a final status.
	async fn resume_pending(&self, semaphore: &Arc<Semaphore>) {
		let pending = self.store.pending_transactions().await;
		if !pending.is_empty() {
			tracing::info!(count = pending.len(), "Resuming pending transactions");
		}
		for record in pending {
			self.spawn_watch(semaphore, record.key()).await;
		}
	}

	async fn spawn_watch(&self, semaphore: &Arc<Semaphore>, key: TransactionKey) {
		if self.watcher.is_watching(&key) {
			return;
		}
		self.spawn_handler(semaphore, move |engine| async move {
			engine
				.watcher
				.watch(key)
				.await
				.map_err(|e| EngineError::Handler(format!("Failed to watch transaction: {}", e)))
		})
		.await;
	}

	/// Returns the transaction store.
	pub fn store(&self) -> &Arc<TransactionStore> {
		&self.store
	}

	/// Returns a reference to the configuration.
	pub fn config(&self) -> &Config {
		&self.config
	}

	/// Returns a reference to the storage service.
	pub fn storage(&self) -> &Arc<StorageService> {
		&self.storage
	}

	/// Helper method to spawn handler tasks with semaphore-based concurrency control.
	async fn spawn_handler<F, Fut>(&self, semaphore: &Arc<Semaphore>, handler: F)
	where
		F: FnOnce(WalletEngine) -> Fut + Send + 'static,
		Fut: Future<Output = Result<(), EngineError>> + Send,
	{
		let engine = self.clone();
		match semaphore.clone().acquire_owned().await {
			Ok(permit) => {
				tokio::spawn(async move {
					let _permit = permit; // Keep permit alive for duration of task
					if let Err(e) = handler(engine).await {
						tracing::error!("Handler error: {}", e);
					}
				});
			}
			Err(e) => {
				tracing::error!("Failed to acquire semaphore permit: {}", e);
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::factory::SubmitTransactionParams;
	use crate::state::TransactionAction;
	use crate::test_utils::{receipt, ScriptedDelivery};
	use alloy::primitives::keccak256;
	use event_bus::EventBus;
	use std::collections::HashMap;
	use std::str::FromStr;
	use wallet_delivery::DeliveryInterface;
	use wallet_storage::implementations::memory::MemoryStorage;
	use wallet_types::{
		AnalyticsContext, Bytes, Routing, SignedTransactionRequest, StorageKey,
		TransactionOptions, TransactionOriginType, TransactionRecord, TransactionRequest,
		TransactionSource, TransactionStatus, TransactionTypeInfo, UnknownTransactionInfo, B256,
	};

	const CONFIG: &str = r#"
[wallet]
id = "engine-test"
poll_interval_seconds = 1

[networks.1]
rpc_url = "http://localhost:8545"

[storage]
primary = "memory"
[storage.implementations.memory]

[account]
primary = "local"
[account.implementations.local]
private_key = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"
"#;

	fn engine(delivery: Arc<ScriptedDelivery>) -> WalletEngine {
		let mut providers: HashMap<u64, Arc<dyn DeliveryInterface>> = HashMap::new();
		providers.insert(1, delivery);
		WalletEngine::new(
			Config::from_str(CONFIG).unwrap(),
			Arc::new(StorageService::new(Box::new(MemoryStorage::new()))),
			Arc::new(AccountService::default()),
			Arc::new(DeliveryService::new(providers, HashMap::new())),
			Arc::new(TransactionStore::new(EventBus::new(64))),
			None,
		)
	}

	fn account() -> Address {
		Address::repeat_byte(0x11)
	}

	async fn wait_for_status(store: &TransactionStore, key: &TransactionKey, status: TransactionStatus) {
		tokio::time::timeout(Duration::from_secs(10), async {
			while store.get(key).await.map(|record| record.status) != Some(status) {
				tokio::time::sleep(Duration::from_millis(20)).await;
			}
		})
		.await
		.unwrap();
	}

	#[tokio::test]
	async fn test_submitted_transaction_is_watched_to_completion() {
		let delivery = Arc::new(ScriptedDelivery::default());
		let engine = engine(delivery.clone());
		let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
		let runner = tokio::spawn({
			let engine = engine.clone();
			async move {
				engine
					.run_until(async {
						shutdown_rx.await.ok();
					})
					.await
			}
		});
		tokio::task::yield_now().await;

		let raw = Bytes::from_static(&[0x02, 0x01, 0x02]);
		let request = TransactionRequest {
			chain_id: Some(1),
			from: Some(account()),
			nonce: Some(0),
			..Default::default()
		};
		let service = engine.transaction_service(account(), 1);
		let record = service
			.submit_transaction(SubmitTransactionParams {
				tx_id: Some("tx-1".into()),
				chain_id: 1,
				account: account(),
				request: SignedTransactionRequest::new(request.clone(), raw.clone(), 0),
				options: TransactionOptions {
					request,
					..Default::default()
				},
				type_info: TransactionTypeInfo::Unknown(UnknownTransactionInfo::default()),
				transaction_origin_type: TransactionOriginType::Internal,
				analytics: AnalyticsContext::default(),
			})
			.await
			.unwrap();
		assert_eq!(record.hash, Some(keccak256(&raw)));

		delivery.set_receipt(receipt(keccak256(&raw), 7, true));
		wait_for_status(engine.store(), &record.key(), TransactionStatus::Success).await;

		shutdown_tx.send(()).unwrap();
		runner.await.unwrap().unwrap();
		assert!(engine
			.storage()
			.exists(StorageKey::Transactions, "state")
			.await
			.unwrap());
	}

	#[tokio::test]
	async fn test_pending_records_resumed_on_start() {
		let delivery = Arc::new(ScriptedDelivery::default());
		let engine = engine(delivery.clone());
		let hash = B256::repeat_byte(0x09);
		let mut record = TransactionRecord::new(
			"restored",
			1,
			account(),
			TransactionTypeInfo::Unknown(UnknownTransactionInfo::default()),
			Routing::Classic,
			TransactionSource::Wallet,
			1_000,
		);
		record.hash = Some(hash);
		engine
			.store()
			.dispatch(TransactionAction::Add(record.clone()))
			.await
			.unwrap();
		delivery.set_receipt(receipt(hash, 3, false));

		let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
		let runner = tokio::spawn({
			let engine = engine.clone();
			async move {
				engine
					.run_until(async {
						shutdown_rx.await.ok();
					})
					.await
			}
		});

		wait_for_status(engine.store(), &record.key(), TransactionStatus::Failed).await;
		shutdown_tx.send(()).unwrap();
		runner.await.unwrap().unwrap();
	}

	#[test]
	fn test_order_service_requires_relayer() {
		let engine = engine(Arc::default());
		assert!(matches!(engine.order_service(), Err(EngineError::Config(_))));
	}
}
