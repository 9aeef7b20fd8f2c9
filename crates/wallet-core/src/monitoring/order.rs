//! Relayer polling for UniswapX orders.

use super::{PollOutcome, TransactionWatcher, WatcherError};
use crate::orders::{map_uniswapx_status, UniswapXOrderStatus};
use wallet_types::{TransactionRecord, TransactionStatus};

impl TransactionWatcher {
	/// Polls the relayer for an order's status.
	///
	/// Relayer errors are logged and retried on the next poll. A filled order
	/// is finalized with its fill transaction hash; a fill reported without
	/// one is polled again.
	pub(super) async fn poll_order(
		&self,
		record: &TransactionRecord,
	) -> Result<PollOutcome, WatcherError> {
		let relayer = self
			.relayer
			.as_ref()
			.ok_or_else(|| WatcherError::MissingRelayer(record.id.clone()))?;
		let Some(order_hash) = record.order_hash else {
			tracing::warn!("Order record has no order hash");
			return Ok(PollOutcome::Settled);
		};

		let response = match relayer.order_status(record.chain_id, &order_hash).await {
			Ok(Some(response)) => response,
			Ok(None) => {
				tracing::debug!(order_hash = %order_hash, "Order not yet known to relayer");
				return Ok(PollOutcome::Pending);
			}
			Err(e) => {
				tracing::warn!(order_hash = %order_hash, error = %e, "Failed to fetch order status");
				return Ok(PollOutcome::Pending);
			}
		};

		let status = map_uniswapx_status(response.order_status);
		match status {
			TransactionStatus::Pending | TransactionStatus::Unknown => Ok(PollOutcome::Pending),
			TransactionStatus::Success => {
				let Some(fill_hash) = response.tx_hash else {
					tracing::debug!(order_hash = %order_hash, "Order filled without fill hash yet");
					return Ok(PollOutcome::Pending);
				};
				let receipt = self.fetch_receipt(record.chain_id, fill_hash).await?;
				self.finalize(record, status, receipt, Some(fill_hash))
					.await?;
				Ok(PollOutcome::Settled)
			}
			_ => {
				if response.order_status == UniswapXOrderStatus::InsufficientFunds {
					tracing::info!(order_hash = %order_hash, "Order failed for insufficient funds");
				}
				self.finalize(record, status, None, None).await?;
				Ok(PollOutcome::Settled)
			}
		}
	}
}
