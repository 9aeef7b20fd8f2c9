//! HTTP client for the UniswapX order API.

use super::{OrderError, OrderRelayer, OrderStatusResponse, OrderSubmission};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use wallet_config::RelayerConfig;
use wallet_types::B256;

#[derive(Debug, Deserialize)]
struct OrdersResponse {
	#[serde(default)]
	orders: Vec<OrderStatusResponse>,
}

/// Relayer backed by the public order API.
pub struct HttpOrderRelayer {
	client: reqwest::Client,
	base_url: String,
}

impl HttpOrderRelayer {
	pub fn new(config: &RelayerConfig) -> Result<Self, OrderError> {
		let client = reqwest::Client::builder()
			.pool_idle_timeout(Duration::from_secs(90))
			.pool_max_idle_per_host(10)
			.timeout(Duration::from_secs(config.timeout_seconds))
			.build()
			.map_err(|e| OrderError::Relayer(e.to_string()))?;
		Ok(Self {
			client,
			base_url: config.base_url.trim_end_matches('/').to_string(),
		})
	}
}

#[async_trait]
impl OrderRelayer for HttpOrderRelayer {
	async fn submit_order(&self, order: &OrderSubmission) -> Result<(), OrderError> {
		let url = format!("{}/order", self.base_url);
		let response = self
			.client
			.post(&url)
			.json(order)
			.send()
			.await
			.map_err(|e| OrderError::Relayer(e.to_string()))?;

		let status = response.status();
		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			return Err(OrderError::Rejected(format!("{}: {}", status, body)));
		}
		Ok(())
	}

	async fn order_status(
		&self,
		chain_id: u64,
		order_hash: &B256,
	) -> Result<Option<OrderStatusResponse>, OrderError> {
		let url = format!("{}/orders", self.base_url);
		let response = self
			.client
			.get(&url)
			.query(&[
				("orderHash", order_hash.to_string()),
				("chainId", chain_id.to_string()),
			])
			.send()
			.await
			.map_err(|e| OrderError::Relayer(e.to_string()))?
			.error_for_status()
			.map_err(|e| OrderError::Relayer(e.to_string()))?;

		let body: OrdersResponse = response
			.json()
			.await
			.map_err(|e| OrderError::InvalidResponse(e.to_string()))?;
		Ok(body
			.orders
			.into_iter()
			.find(|order| order.order_hash == *order_hash))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::orders::UniswapXOrderStatus;

	#[test]
	fn test_base_url_trailing_slash_trimmed() {
		let relayer = HttpOrderRelayer::new(&RelayerConfig {
			base_url: "https://orders.example.org/v2/".into(),
			timeout_seconds: 5,
		})
		.unwrap();
		assert_eq!(relayer.base_url, "https://orders.example.org/v2");
	}

	#[test]
	fn test_orders_response_parsing() {
		let hash = B256::repeat_byte(0x01);
		let body: OrdersResponse = serde_json::from_value(serde_json::json!({
			"orders": [{
				"orderHash": hash,
				"orderStatus": "filled",
				"txHash": B256::repeat_byte(0x02),
				"chainId": 1
			}]
		}))
		.unwrap();

		assert_eq!(body.orders.len(), 1);
		assert_eq!(body.orders[0].order_status, UniswapXOrderStatus::Filled);
		assert_eq!(body.orders[0].tx_hash, Some(B256::repeat_byte(0x02)));

		let empty: OrdersResponse = serde_json::from_str("{}").unwrap();
		assert!(empty.orders.is_empty());
	}
}
