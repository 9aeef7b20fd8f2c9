//! Translation of UniswapX orders reported by the data API into records.

use serde::{Deserialize, Serialize};
use wallet_types::{
	Address, Routing, SwapTradeAmounts, SwapTransactionInfo, TransactionOriginType,
	TransactionRecord, TransactionSource, TransactionStatus, TransactionTypeInfo, B256,
};

/// Order status as reported by the relayer and the data API.
///
/// The data API reports upper case names, the relayer lower case ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UniswapXOrderStatus {
	#[serde(alias = "open")]
	Open,
	#[serde(alias = "filled")]
	Filled,
	#[serde(alias = "cancelled")]
	Cancelled,
	#[serde(alias = "expired")]
	Expired,
	#[serde(alias = "error")]
	Error,
	#[serde(alias = "insufficient-funds")]
	InsufficientFunds,
	#[serde(other)]
	Unspecified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UniswapXOrderType {
	Dutch,
	DutchV2,
	DutchV3,
	Priority,
	Limit,
	#[serde(other)]
	Unspecified,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestToken {
	pub address: String,
	pub symbol: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestAmount {
	pub raw: String,
}

/// A UniswapX order as returned by the data API. Every field may be absent.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RestUniswapXOrder {
	pub chain_id: Option<u64>,
	pub offerer: Option<String>,
	pub order_hash: Option<String>,
	/// Creation time in milliseconds, as a decimal string.
	pub timestamp_millis: Option<String>,
	pub input_token: Option<RestToken>,
	pub input_token_amount: Option<RestAmount>,
	pub output_token: Option<RestToken>,
	pub output_token_amount: Option<RestAmount>,
	pub status: Option<UniswapXOrderStatus>,
	pub order_type: Option<UniswapXOrderType>,
}

/// Maps a remote order status onto the local status vocabulary.
pub fn map_uniswapx_status(status: UniswapXOrderStatus) -> TransactionStatus {
	match status {
		UniswapXOrderStatus::Filled => TransactionStatus::Success,
		UniswapXOrderStatus::Open => TransactionStatus::Pending,
		UniswapXOrderStatus::Cancelled => TransactionStatus::Cancelled,
		UniswapXOrderStatus::Error
		| UniswapXOrderStatus::Expired
		| UniswapXOrderStatus::InsufficientFunds => TransactionStatus::Failed,
		UniswapXOrderStatus::Unspecified => TransactionStatus::Unknown,
	}
}

/// Builds a swap record from a remote order.
///
/// Orders missing their hash, chain or tokens, and limit orders, yield
/// `None`. Malformed fields are logged and also yield `None`.
pub fn extract_rest_uniswapx_order_details(order: &RestUniswapXOrder) -> Option<TransactionRecord> {
	match try_extract(order) {
		Ok(record) => record,
		Err(error) => {
			tracing::error!(
				file = "orders::extract",
				function = "extract_rest_uniswapx_order_details",
				error = %error,
				"Failed to extract UniswapX order"
			);
			None
		}
	}
}

fn try_extract(order: &RestUniswapXOrder) -> Result<Option<TransactionRecord>, String> {
	let (Some(order_hash), Some(chain_id), Some(input_token), Some(output_token)) = (
		order.order_hash.as_deref().filter(|hash| !hash.is_empty()),
		order.chain_id.filter(|chain_id| *chain_id != 0),
		order.input_token.as_ref(),
		order.output_token.as_ref(),
	) else {
		return Ok(None);
	};

	if order.order_type == Some(UniswapXOrderType::Limit) {
		return Ok(None);
	}

	let hash: B256 = order_hash
		.parse()
		.map_err(|e| format!("invalid order hash {}: {}", order_hash, e))?;
	// Not an on-chain transaction, so the offerer stands in as sender.
	let offerer: Address = order
		.offerer
		.as_deref()
		.ok_or("missing offerer")?
		.parse()
		.map_err(|e| format!("invalid offerer: {}", e))?;
	let added_time = match order.timestamp_millis.as_deref() {
		Some(millis) => millis
			.parse::<u64>()
			.map_err(|e| format!("invalid timestamp {}: {}", millis, e))?,
		None => 0,
	};

	let amount = |value: &Option<RestAmount>| {
		value
			.as_ref()
			.map_or_else(|| "0".to_string(), |amount| amount.raw.clone())
	};
	let output_amount = amount(&order.output_token_amount);
	let type_info = TransactionTypeInfo::Swap(SwapTransactionInfo {
		input_currency_id: currency_id(chain_id, &input_token.address),
		output_currency_id: currency_id(chain_id, &output_token.address),
		trade: SwapTradeAmounts::ExactInput {
			input_currency_amount_raw: amount(&order.input_token_amount),
			expected_output_currency_amount_raw: output_amount.clone(),
			minimum_output_currency_amount_raw: output_amount,
		},
		is_uniswapx_order: true,
		quote_id: None,
		gas_use_estimate: None,
		slippage_tolerance_bips: None,
	});

	let mut record = TransactionRecord::new(
		order_hash,
		chain_id,
		offerer,
		type_info,
		Routing::DutchV2,
		TransactionSource::Wallet,
		added_time,
	);
	record.status = map_uniswapx_status(order.status.unwrap_or(UniswapXOrderStatus::Unspecified));
	record.order_hash = Some(hash);
	record.transaction_origin_type = TransactionOriginType::Internal;
	Ok(Some(record))
}

/// Currency id in the form `{chainId}-{address}`.
pub(crate) fn currency_id(chain_id: u64, address: &str) -> String {
	format!("{}-{}", chain_id, address)
}
