//! Helpers shared by the submission service, the order service and the
//! watcher.

use backoff::ExponentialBackoffBuilder;
use std::time::Duration;
use wallet_delivery::{DeliveryError, DeliveryService};
use wallet_types::{Address, NetworkConfig, NetworkFee, TransactionReceipt, TxHash};

/// Fee paid for a mined transaction, in the chain's native currency.
///
/// Chains missing from the configuration are priced in ETH at the zero
/// address.
pub fn network_fee(
	receipt: &TransactionReceipt,
	chain_id: u64,
	network: Option<&NetworkConfig>,
) -> NetworkFee {
	match network {
		Some(network) => NetworkFee::from_receipt(
			receipt,
			chain_id,
			&network.native_currency_symbol,
			network.native_currency_address,
		),
		None => NetworkFee::from_receipt(receipt, chain_id, "ETH", Address::ZERO),
	}
}

/// Fetches a receipt, retrying network errors with exponential backoff.
///
/// Retries start at `poll_interval` (at most 500ms) and give up after ten
/// poll intervals. Other delivery errors are returned at once.
pub async fn get_receipt_with_retry(
	delivery: &DeliveryService,
	chain_id: u64,
	hash: TxHash,
	poll_interval: Duration,
) -> Result<Option<TransactionReceipt>, DeliveryError> {
	let policy = ExponentialBackoffBuilder::new()
		.with_initial_interval(poll_interval.min(Duration::from_millis(500)))
		.with_max_elapsed_time(Some(poll_interval.saturating_mul(10)))
		.build();

	backoff::future::retry(policy, move || async move {
		delivery.get_receipt(chain_id, &hash).await.map_err(|e| match e {
			DeliveryError::Network(_) => {
				tracing::debug!(error = %e, "Receipt lookup failed, retrying");
				backoff::Error::transient(e)
			}
			_ => backoff::Error::permanent(e),
		})
	})
	.await
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_utils::{receipt as mined_receipt, ScriptedDelivery};
	use std::collections::HashMap;
	use std::sync::atomic::Ordering;
	use std::sync::Arc;
	use wallet_delivery::DeliveryInterface;
	use wallet_types::B256;

	fn delivery(scripted: Arc<ScriptedDelivery>) -> DeliveryService {
		let mut providers: HashMap<u64, Arc<dyn DeliveryInterface>> = HashMap::new();
		providers.insert(1, scripted);
		DeliveryService::new(providers, HashMap::new())
	}

	#[tokio::test]
	async fn test_receipt_lookup_retries_network_errors() {
		let scripted = Arc::new(ScriptedDelivery::default());
		let hash = B256::repeat_byte(0x01);
		scripted.set_receipt(mined_receipt(hash, 4, true));
		scripted.failures.store(2, Ordering::SeqCst);

		let found = get_receipt_with_retry(&delivery(scripted.clone()), 1, hash, Duration::from_millis(5))
			.await
			.unwrap();
		assert_eq!(found.unwrap().block_number, 4);
		assert_eq!(scripted.failures.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn test_receipt_lookup_unknown_chain_not_retried() {
		let result = get_receipt_with_retry(
			&delivery(Arc::default()),
			10,
			B256::ZERO,
			Duration::from_secs(1),
		)
		.await;
		assert!(matches!(result, Err(DeliveryError::NoProviderAvailable)));
	}

	fn receipt() -> TransactionReceipt {
		TransactionReceipt {
			transaction_hash: TxHash::ZERO,
			block_hash: B256::ZERO,
			block_number: 1,
			transaction_index: 0,
			gas_used: 100,
			effective_gas_price: 3,
			status: true,
			confirmed_time: None,
		}
	}

	#[test]
	fn test_fee_uses_configured_currency() {
		let network = NetworkConfig {
			rpc_url: "http://localhost:8545".into(),
			direct_rpc_url: None,
			native_currency_symbol: "POL".into(),
			native_currency_address: Address::repeat_byte(0x10),
		};
		let fee = network_fee(&receipt(), 137, Some(&network));
		assert_eq!(fee.token_symbol, "POL");
		assert_eq!(fee.quantity, "300");

		let fee = network_fee(&receipt(), 1, None);
		assert_eq!(fee.token_symbol, "ETH");
		assert_eq!(fee.token_address, Address::ZERO);
	}
}
