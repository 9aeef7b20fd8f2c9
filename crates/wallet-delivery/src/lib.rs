//! Transaction delivery module for the wallet.
//!
//! This module wraps the RPC providers used to populate, broadcast and track
//! transactions, one provider per chain plus an optional direct client used
//! for delegation-bundled broadcasts. The [`signer`] module builds the
//! transaction signer services on top of it.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use wallet_types::{Address, Bytes, NetworksConfig, TransactionReceipt, TransactionRequest, TxHash};

/// Re-export implementations
pub mod implementations {
	pub mod evm {
		pub mod alloy;
	}
}

pub mod signer;

/// Errors that can occur during transaction delivery operations.
#[derive(Debug, Error)]
pub enum DeliveryError {
	/// Error that occurs during network communication.
	#[error("Network error: {0}")]
	Network(String),
	/// Error that occurs when a transaction execution fails.
	#[error("Transaction failed: {0}")]
	TransactionFailed(String),
	/// Error that occurs when no suitable provider is available for the operation.
	#[error("No provider available")]
	NoProviderAvailable,
}

/// Current fee market data for a chain.
///
/// EIP-1559 chains report the fee pair; others only a gas price.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeeData {
	pub max_fee_per_gas: Option<u128>,
	pub max_priority_fee_per_gas: Option<u128>,
	pub gas_price: Option<u128>,
}

/// Trait defining the interface for a chain's RPC provider.
#[async_trait]
pub trait DeliveryInterface: Send + Sync {
	/// Returns the next nonce for `address`, counting pending transactions.
	async fn get_transaction_count(&self, address: &Address) -> Result<u64, DeliveryError>;

	/// Estimates the gas limit of a request.
	async fn estimate_gas(&self, request: &TransactionRequest) -> Result<u64, DeliveryError>;

	/// Returns the current fee market data.
	async fn get_fee_data(&self) -> Result<FeeData, DeliveryError>;

	/// Broadcasts a signed transaction and returns its hash.
	async fn send_raw_transaction(&self, raw: &Bytes) -> Result<TxHash, DeliveryError>;

	/// Broadcasts a signed transaction and waits for its receipt.
	///
	/// Uses the non-standard `eth_sendRawTransactionSync` method, which not
	/// every node supports.
	async fn send_raw_transaction_sync(
		&self,
		raw: &Bytes,
	) -> Result<TransactionReceipt, DeliveryError>;

	/// Retrieves the receipt for a transaction, `None` while it is not mined.
	async fn get_receipt(&self, hash: &TxHash) -> Result<Option<TransactionReceipt>, DeliveryError>;

	/// Returns the latest block number.
	async fn get_block_number(&self) -> Result<u64, DeliveryError>;
}

/// Service that routes provider calls to the right chain.
#[derive(Default)]
pub struct DeliveryService {
	/// Standard providers keyed by chain id.
	providers: HashMap<u64, Arc<dyn DeliveryInterface>>,
	/// Direct clients keyed by chain id.
	direct_providers: HashMap<u64, Arc<dyn DeliveryInterface>>,
}

impl DeliveryService {
	pub fn new(
		providers: HashMap<u64, Arc<dyn DeliveryInterface>>,
		direct_providers: HashMap<u64, Arc<dyn DeliveryInterface>>,
	) -> Self {
		Self {
			providers,
			direct_providers,
		}
	}

	/// Builds HTTP providers for every configured network.
	pub fn from_networks(networks: &NetworksConfig) -> Result<Self, DeliveryError> {
		use implementations::evm::alloy::create_http_delivery;

		let mut providers = HashMap::new();
		let mut direct_providers = HashMap::new();

		for (chain_id, network) in networks {
			providers.insert(*chain_id, create_http_delivery(*chain_id, &network.rpc_url)?);
			if let Some(direct_url) = &network.direct_rpc_url {
				direct_providers.insert(*chain_id, create_http_delivery(*chain_id, direct_url)?);
			}
			tracing::debug!(chain_id = chain_id, direct = network.direct_rpc_url.is_some(), "Configured provider");
		}

		Ok(Self::new(providers, direct_providers))
	}

	/// Returns the standard provider for a chain.
	pub fn provider(&self, chain_id: u64) -> Result<Arc<dyn DeliveryInterface>, DeliveryError> {
		self.providers
			.get(&chain_id)
			.cloned()
			.ok_or(DeliveryError::NoProviderAvailable)
	}

	/// Returns the direct client for a chain.
	pub fn direct_provider(&self, chain_id: u64) -> Result<Arc<dyn DeliveryInterface>, DeliveryError> {
		self.direct_providers
			.get(&chain_id)
			.cloned()
			.ok_or(DeliveryError::NoProviderAvailable)
	}

	/// Returns the chain ids with a standard provider.
	pub fn chain_ids(&self) -> Vec<u64> {
		let mut ids: Vec<u64> = self.providers.keys().copied().collect();
		ids.sort_unstable();
		ids
	}

	/// Retrieves a receipt on a specific chain.
	pub async fn get_receipt(
		&self,
		chain_id: u64,
		hash: &TxHash,
	) -> Result<Option<TransactionReceipt>, DeliveryError> {
		self.provider(chain_id)?.get_receipt(hash).await
	}

	/// Gets the pending nonce of an address on a specific chain.
	pub async fn get_transaction_count(
		&self,
		chain_id: u64,
		address: &Address,
	) -> Result<u64, DeliveryError> {
		self.provider(chain_id)?.get_transaction_count(address).await
	}

	/// Gets the latest block number on a specific chain.
	pub async fn get_block_number(&self, chain_id: u64) -> Result<u64, DeliveryError> {
		self.provider(chain_id)?.get_block_number().await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::signer::stubs::StubDelivery;

	#[tokio::test]
	async fn test_routes_by_chain() {
		let mut providers: HashMap<u64, Arc<dyn DeliveryInterface>> = HashMap::new();
		providers.insert(1, Arc::new(StubDelivery::with_block(100)));
		providers.insert(10, Arc::new(StubDelivery::with_block(200)));
		let service = DeliveryService::new(providers, HashMap::new());

		assert_eq!(service.get_block_number(1).await.unwrap(), 100);
		assert_eq!(service.get_block_number(10).await.unwrap(), 200);
		assert!(matches!(
			service.get_block_number(5).await,
			Err(DeliveryError::NoProviderAvailable)
		));
		assert_eq!(service.chain_ids(), vec![1, 10]);
	}

	#[test]
	fn test_missing_direct_client() {
		let service = DeliveryService::default();
		assert!(matches!(
			service.direct_provider(1),
			Err(DeliveryError::NoProviderAvailable)
		));
	}
}
