//! Alloy-based EVM provider.
//!
//! Transactions are signed by the wallet's own signer services, so the
//! provider is built without fillers or a wallet and only relays raw bytes.

use crate::{DeliveryError, DeliveryInterface, FeeData};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionReceipt as RpcReceipt;
use async_trait::async_trait;
use std::sync::Arc;
use wallet_types::{Address, Bytes, TransactionReceipt, TransactionRequest, TxHash};

/// Alloy-based delivery implementation for one chain.
pub struct AlloyDelivery {
	chain_id: u64,
	provider: DynProvider,
}

impl AlloyDelivery {
	/// Creates a provider connected to `rpc_url` over HTTP.
	pub fn new(chain_id: u64, rpc_url: &str) -> Result<Self, DeliveryError> {
		let url = rpc_url.parse().map_err(|e| {
			DeliveryError::Network(format!("Invalid RPC URL for network {}: {}", chain_id, e))
		})?;

		let provider = ProviderBuilder::new()
			.disable_recommended_fillers()
			.connect_http(url);

		Ok(Self {
			chain_id,
			provider: DynProvider::new(provider),
		})
	}
}

#[async_trait]
impl DeliveryInterface for AlloyDelivery {
	async fn get_transaction_count(&self, address: &Address) -> Result<u64, DeliveryError> {
		self.provider
			.get_transaction_count(*address)
			.pending()
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to get nonce: {}", e)))
	}

	async fn estimate_gas(&self, request: &TransactionRequest) -> Result<u64, DeliveryError> {
		self.provider
			.estimate_gas(request.into())
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to estimate gas: {}", e)))
	}

	async fn get_fee_data(&self) -> Result<FeeData, DeliveryError> {
		match self.provider.estimate_eip1559_fees().await {
			Ok(estimate) => Ok(FeeData {
				max_fee_per_gas: Some(estimate.max_fee_per_gas),
				max_priority_fee_per_gas: Some(estimate.max_priority_fee_per_gas),
				gas_price: None,
			}),
			Err(e) => {
				tracing::debug!(chain_id = self.chain_id, error = %e, "EIP-1559 fee estimation unavailable");
				let gas_price = self
					.provider
					.get_gas_price()
					.await
					.map_err(|e| DeliveryError::Network(format!("Failed to get gas price: {}", e)))?;
				Ok(FeeData {
					gas_price: Some(gas_price),
					..Default::default()
				})
			}
		}
	}

	async fn send_raw_transaction(&self, raw: &Bytes) -> Result<TxHash, DeliveryError> {
		let pending = self
			.provider
			.send_raw_transaction(raw)
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to send transaction: {}", e)))?;

		let tx_hash = *pending.tx_hash();
		tracing::info!(tx_hash = %tx_hash, chain_id = self.chain_id, "Submitted transaction");
		Ok(tx_hash)
	}

	async fn send_raw_transaction_sync(
		&self,
		raw: &Bytes,
	) -> Result<TransactionReceipt, DeliveryError> {
		let receipt: RpcReceipt = self
			.provider
			.raw_request("eth_sendRawTransactionSync".into(), (raw.clone(),))
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to send transaction: {}", e)))?;

		if !receipt.status() {
			tracing::warn!(tx_hash = %receipt.transaction_hash, chain_id = self.chain_id, "Transaction reverted");
		}
		Ok(TransactionReceipt::from(&receipt))
	}

	async fn get_receipt(&self, hash: &TxHash) -> Result<Option<TransactionReceipt>, DeliveryError> {
		self.provider
			.get_transaction_receipt(*hash)
			.await
			.map(|receipt| receipt.as_ref().map(TransactionReceipt::from))
			.map_err(|e| {
				DeliveryError::Network(format!(
					"Failed to get receipt on chain {}: {}",
					self.chain_id, e
				))
			})
	}

	async fn get_block_number(&self) -> Result<u64, DeliveryError> {
		self.provider
			.get_block_number()
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to get block number: {}", e)))
	}
}

/// Factory function to create an HTTP provider for one chain.
pub fn create_http_delivery(
	chain_id: u64,
	rpc_url: &str,
) -> Result<Arc<dyn DeliveryInterface>, DeliveryError> {
	Ok(Arc::new(AlloyDelivery::new(chain_id, rpc_url)?))
}
