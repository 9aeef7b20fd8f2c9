//! Trade and quote inputs.
//!
//! Quotes are computed elsewhere; these types only carry what the params
//! factory and the order service need to tag and submit them.

use crate::Routing;
use alloy::primitives::{Address, Bytes, B256};
use serde::{Deserialize, Serialize};

/// Direction of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TradeType {
	ExactInput,
	ExactOutput,
}

/// A quoted trade, as handed over by the routing layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
	pub routing: Routing,
	pub trade_type: TradeType,
	/// Currency id in the form `{chainId}-{tokenAddress}`.
	pub input_currency_id: String,
	pub output_currency_id: String,
	/// Raw input amount, decimal string.
	pub input_amount_raw: String,
	/// Raw output amount, decimal string.
	pub output_amount_raw: String,
	pub slippage_tolerance_bips: u32,
	pub quote_id: Option<String>,
	pub gas_use_estimate: Option<String>,
}

/// A UniswapX order quote returned by the routing API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UniswapXQuote {
	pub order_hash: B256,
	pub encoded_order: Bytes,
	pub swapper: Address,
	pub deadline: u64,
	pub quote_id: Option<String>,
	pub request_id: Option<String>,
}

/// Analytics tags carried through submission unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsContext {
	pub route: Option<String>,
	pub session_id: Option<String>,
	#[serde(default)]
	pub tags: std::collections::BTreeMap<String, String>,
}

