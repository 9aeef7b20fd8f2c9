//! Construction of submission parameters for each transaction kind.
//!
//! The factory is pure: it tags already-signed requests with their type info
//! and the fields shared by every submission, and fails fast on data it
//! cannot tag.

use alloy::primitives::address;
use thiserror::Error;
use wallet_types::{
	Address, AnalyticsContext, ApproveTransactionInfo, BridgeTransactionInfo, GasEstimate,
	Permit2ApproveTransactionInfo, Routing, Signature, SignedTransactionRequest,
	SwapTradeAmounts, SwapTransactionInfo, Trade, TradeType, TransactionOptions,
	TransactionOriginType, TransactionTypeInfo, TxHash, TypedDataRequest, UniswapXQuote,
	WrapTransactionInfo, U256,
};

const PERMIT2_ADDRESS: Address = address!("000000000022D473030F116dDEE9F6B43aC78BA3");
const ZKSYNC_PERMIT2_ADDRESS: Address = address!("0000000000225e31D15943971F47aD3022F714Fa");
const ZKSYNC_CHAIN_ID: u64 = 324;

const BIPS_BASE: u64 = 10_000;

/// Errors raised while building submission parameters.
#[derive(Debug, Error)]
pub enum FactoryError {
	/// A field the transaction kind needs is absent.
	#[error("Missing field: {0}")]
	MissingField(&'static str),
	/// An amount is not a non-negative decimal integer.
	#[error("Invalid amount '{0}'")]
	InvalidAmount(String),
	/// The trade cannot be described as the requested kind.
	#[error("Invalid trade: {0}")]
	InvalidTrade(String),
	/// The routing is not an off-chain order routing.
	#[error("Routing {0:?} is not a UniswapX order routing")]
	InvalidRouting(Routing),
}

/// Returns the Permit2 contract address on `chain_id`.
pub fn permit2_address(chain_id: u64) -> Address {
	match chain_id {
		ZKSYNC_CHAIN_ID => ZKSYNC_PERMIT2_ADDRESS,
		_ => PERMIT2_ADDRESS,
	}
}

/// Context shared by every transaction of one user flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseTransactionContext {
	pub chain_id: u64,
	pub account: Address,
	pub submit_via_private_rpc: bool,
	pub user_submission_timestamp_ms: Option<u64>,
	pub analytics: AnalyticsContext,
}

/// Everything needed to submit one signed on-chain transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitTransactionParams {
	/// Id to record the transaction under; the hash is used when absent.
	pub tx_id: Option<String>,
	pub chain_id: u64,
	pub account: Address,
	pub request: SignedTransactionRequest,
	pub options: TransactionOptions,
	pub type_info: TransactionTypeInfo,
	pub transaction_origin_type: TransactionOriginType,
	pub analytics: AnalyticsContext,
}

/// A permit signed over EIP-712 typed data.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedPermit {
	pub request: TypedDataRequest,
	pub signature: Signature,
}

/// Everything needed to submit one UniswapX order.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitUniswapXOrderParams {
	pub tx_id: Option<String>,
	pub chain_id: u64,
	pub account: Address,
	pub routing: Routing,
	pub quote: UniswapXQuote,
	pub permit: SignedPermit,
	pub type_info: TransactionTypeInfo,
	/// Approval that must be mined before the order can be filled.
	pub approve_tx_hash: Option<TxHash>,
	pub analytics: AnalyticsContext,
}

pub struct ApprovalTransactionData {
	pub signed_tx: SignedTransactionRequest,
	pub gas_estimate: Option<GasEstimate>,
	pub swap_tx_id: Option<String>,
}

pub struct PermitTransactionData {
	pub signed_tx: SignedTransactionRequest,
	pub token_address: Address,
	pub amount: Option<String>,
}

pub struct SwapTransactionData {
	pub signed_tx: SignedTransactionRequest,
	pub trade: Trade,
	pub includes_delegation: bool,
	pub is_smart_wallet_transaction: bool,
	pub tx_id: Option<String>,
}

pub struct WrapTransactionData {
	pub signed_tx: SignedTransactionRequest,
	/// Raw amount of the input currency.
	pub input_currency_amount_raw: String,
	/// True when the input is the native currency, i.e. a wrap rather than an unwrap.
	pub input_is_native: bool,
	pub gas_estimate: Option<GasEstimate>,
	pub tx_id: Option<String>,
}

pub struct UniswapXOrderTransactionData {
	pub signed_permit: SignedPermit,
	pub quote: UniswapXQuote,
	pub routing: Routing,
	pub trade: Trade,
	pub approve_tx_hash: Option<TxHash>,
	pub tx_id: Option<String>,
}

/// Builds submission parameters for one account on one chain.
pub struct TransactionParamsFactory {
	context: BaseTransactionContext,
}

impl TransactionParamsFactory {
	pub fn new(context: BaseTransactionContext) -> Self {
		Self { context }
	}

	pub fn create_approval_params(
		&self,
		data: ApprovalTransactionData,
	) -> Result<SubmitTransactionParams, FactoryError> {
		let token_address = data
			.signed_tx
			.request
			.to
			.ok_or(FactoryError::MissingField("to"))?;

		let type_info = TransactionTypeInfo::Approve(ApproveTransactionInfo {
			token_address,
			spender: permit2_address(self.context.chain_id),
			approval_amount: None,
			swap_tx_id: data.swap_tx_id,
			gas_estimate: data.gas_estimate,
		});
		let options = self.options(&data.signed_tx, false, false);
		Ok(self.build(data.signed_tx, options, type_info, None))
	}

	pub fn create_permit_params(
		&self,
		data: PermitTransactionData,
	) -> Result<SubmitTransactionParams, FactoryError> {
		let spender = data
			.signed_tx
			.request
			.to
			.ok_or(FactoryError::MissingField("to"))?;
		if let Some(amount) = &data.amount {
			parse_amount(amount)?;
		}

		let type_info = TransactionTypeInfo::Permit2Approve(Permit2ApproveTransactionInfo {
			token_address: data.token_address,
			spender,
			amount: data.amount,
		});
		let options = self.options(&data.signed_tx, false, false);
		Ok(self.build(data.signed_tx, options, type_info, None))
	}

	pub fn create_swap_params(
		&self,
		data: SwapTransactionData,
	) -> Result<SubmitTransactionParams, FactoryError> {
		let type_info = trade_to_transaction_info(&data.trade)?;
		let options = self.options(
			&data.signed_tx,
			data.includes_delegation,
			data.is_smart_wallet_transaction,
		);
		Ok(self.build(data.signed_tx, options, type_info, data.tx_id))
	}

	pub fn create_wrap_params(
		&self,
		data: WrapTransactionData,
	) -> Result<SubmitTransactionParams, FactoryError> {
		parse_amount(&data.input_currency_amount_raw)?;

		let type_info = TransactionTypeInfo::Wrap(WrapTransactionInfo {
			unwrapped: !data.input_is_native,
			currency_amount_raw: data.input_currency_amount_raw,
			swap_tx_id: None,
			gas_estimate: data.gas_estimate,
		});
		let options = self.options(&data.signed_tx, false, false);
		Ok(self.build(data.signed_tx, options, type_info, data.tx_id))
	}

	pub fn create_uniswapx_order_params(
		&self,
		data: UniswapXOrderTransactionData,
	) -> Result<SubmitUniswapXOrderParams, FactoryError> {
		if !data.routing.is_uniswapx() {
			return Err(FactoryError::InvalidRouting(data.routing));
		}
		let type_info = trade_to_transaction_info(&data.trade)?;

		Ok(SubmitUniswapXOrderParams {
			tx_id: data.tx_id,
			chain_id: self.context.chain_id,
			account: self.context.account,
			routing: data.routing,
			quote: data.quote,
			permit: data.signed_permit,
			type_info,
			approve_tx_hash: data.approve_tx_hash,
			analytics: self.context.analytics.clone(),
		})
	}

	fn options(
		&self,
		signed_tx: &SignedTransactionRequest,
		includes_delegation: bool,
		is_smart_wallet_transaction: bool,
	) -> TransactionOptions {
		TransactionOptions {
			request: signed_tx.request.clone(),
			private_rpc: self.context.submit_via_private_rpc,
			includes_delegation,
			is_smart_wallet_transaction,
			user_submission_timestamp_ms: self.context.user_submission_timestamp_ms,
			rpc_submission_timestamp_ms: None,
			signature_timestamp_ms: Some(signed_tx.timestamp_before_sign),
		}
	}

	fn build(
		&self,
		request: SignedTransactionRequest,
		options: TransactionOptions,
		type_info: TransactionTypeInfo,
		tx_id: Option<String>,
	) -> SubmitTransactionParams {
		SubmitTransactionParams {
			tx_id,
			chain_id: self.context.chain_id,
			account: self.context.account,
			request,
			options,
			type_info,
			transaction_origin_type: TransactionOriginType::Internal,
			analytics: self.context.analytics.clone(),
		}
	}
}

/// Describes a trade as the type info recorded for its transaction.
///
/// Bridge trades become [`TransactionTypeInfo::Bridge`]; everything else is a
/// swap whose slippage bound is derived from the quoted amounts.
pub fn trade_to_transaction_info(trade: &Trade) -> Result<TransactionTypeInfo, FactoryError> {
	if trade.input_currency_id.is_empty() || trade.output_currency_id.is_empty() {
		return Err(FactoryError::InvalidTrade("currency ids are required".into()));
	}
	if u64::from(trade.slippage_tolerance_bips) > BIPS_BASE {
		return Err(FactoryError::InvalidTrade(format!(
			"slippage tolerance {} bips exceeds 100%",
			trade.slippage_tolerance_bips
		)));
	}
	let input_amount = parse_amount(&trade.input_amount_raw)?;
	let output_amount = parse_amount(&trade.output_amount_raw)?;

	if trade.routing == Routing::Bridge {
		return Ok(TransactionTypeInfo::Bridge(BridgeTransactionInfo {
			input_currency_id: trade.input_currency_id.clone(),
			input_currency_amount_raw: input_amount.to_string(),
			output_currency_id: trade.output_currency_id.clone(),
			output_currency_amount_raw: output_amount.to_string(),
			quote_id: trade.quote_id.clone(),
			deposit_confirmed: false,
		}));
	}

	let slippage = U256::from(trade.slippage_tolerance_bips);
	let base = U256::from(BIPS_BASE);
	let amounts = match trade.trade_type {
		TradeType::ExactInput => SwapTradeAmounts::ExactInput {
			input_currency_amount_raw: input_amount.to_string(),
			expected_output_currency_amount_raw: output_amount.to_string(),
			minimum_output_currency_amount_raw: (output_amount.saturating_mul(base - slippage)
				/ base)
				.to_string(),
		},
		TradeType::ExactOutput => SwapTradeAmounts::ExactOutput {
			output_currency_amount_raw: output_amount.to_string(),
			expected_input_currency_amount_raw: input_amount.to_string(),
			maximum_input_currency_amount_raw: (input_amount.saturating_mul(base + slippage)
				/ base)
				.to_string(),
		},
	};

	Ok(TransactionTypeInfo::Swap(SwapTransactionInfo {
		input_currency_id: trade.input_currency_id.clone(),
		output_currency_id: trade.output_currency_id.clone(),
		trade: amounts,
		is_uniswapx_order: trade.routing.is_uniswapx(),
		quote_id: trade.quote_id.clone(),
		gas_use_estimate: trade.gas_use_estimate.clone(),
		slippage_tolerance_bips: Some(trade.slippage_tolerance_bips),
	}))
}

fn parse_amount(raw: &str) -> Result<U256, FactoryError> {
	if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
		return Err(FactoryError::InvalidAmount(raw.to_string()));
	}
	U256::from_str_radix(raw, 10).map_err(|_| FactoryError::InvalidAmount(raw.to_string()))
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy::sol_types::eip712_domain;
	use std::collections::BTreeMap;
	use wallet_types::{Bytes, TransactionRequest, B256};

	fn context(chain_id: u64) -> BaseTransactionContext {
		BaseTransactionContext {
			chain_id,
			account: Address::repeat_byte(0x11),
			submit_via_private_rpc: true,
			user_submission_timestamp_ms: Some(1_700_000_000_000),
			analytics: AnalyticsContext::default(),
		}
	}

	fn signed(to: Option<Address>) -> SignedTransactionRequest {
		SignedTransactionRequest::new(
			TransactionRequest {
				chain_id: Some(1),
				to,
				nonce: Some(1),
				..Default::default()
			},
			Bytes::from_static(&[0x02, 0x01]),
			1_700_000_000_500,
		)
	}

	fn trade(routing: Routing, trade_type: TradeType) -> Trade {
		Trade {
			routing,
			trade_type,
			input_currency_id: "1-0x0000000000000000000000000000000000000000".into(),
			output_currency_id: "1-0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48".into(),
			input_amount_raw: "1000".into(),
			output_amount_raw: "2000".into(),
			slippage_tolerance_bips: 50,
			quote_id: Some("quote-1".into()),
			gas_use_estimate: None,
		}
	}

	#[test]
	fn test_approval_spender_is_permit2() {
		let token = Address::repeat_byte(0x22);
		let params = TransactionParamsFactory::new(context(1))
			.create_approval_params(ApprovalTransactionData {
				signed_tx: signed(Some(token)),
				gas_estimate: None,
				swap_tx_id: Some("swap-1".into()),
			})
			.unwrap();

		let TransactionTypeInfo::Approve(info) = &params.type_info else {
			panic!("expected approve info");
		};
		assert_eq!(info.token_address, token);
		assert_eq!(info.spender, PERMIT2_ADDRESS);
		assert_eq!(info.swap_tx_id.as_deref(), Some("swap-1"));
		assert_eq!(params.transaction_origin_type, TransactionOriginType::Internal);
		assert!(params.options.private_rpc);
		assert_eq!(params.options.signature_timestamp_ms, Some(1_700_000_000_500));
		assert_eq!(params.tx_id, None);
	}

	#[test]
	fn test_zksync_uses_its_own_permit2() {
		assert_eq!(permit2_address(324), ZKSYNC_PERMIT2_ADDRESS);
		assert_eq!(permit2_address(10), PERMIT2_ADDRESS);
	}

	#[test]
	fn test_approval_without_target_rejected() {
		let result = TransactionParamsFactory::new(context(1)).create_approval_params(
			ApprovalTransactionData {
				signed_tx: signed(None),
				gas_estimate: None,
				swap_tx_id: None,
			},
		);
		assert!(matches!(result, Err(FactoryError::MissingField("to"))));
	}

	#[test]
	fn test_permit_spender_is_target() {
		let spender = Address::repeat_byte(0x33);
		let params = TransactionParamsFactory::new(context(1))
			.create_permit_params(PermitTransactionData {
				signed_tx: signed(Some(spender)),
				token_address: Address::repeat_byte(0x22),
				amount: Some("500".into()),
			})
			.unwrap();
		let TransactionTypeInfo::Permit2Approve(info) = &params.type_info else {
			panic!("expected permit info");
		};
		assert_eq!(info.spender, spender);
	}

	#[test]
	fn test_swap_params_carry_delegation_flags() {
		let params = TransactionParamsFactory::new(context(1))
			.create_swap_params(SwapTransactionData {
				signed_tx: signed(Some(Address::repeat_byte(0x44))),
				trade: trade(Routing::Classic, TradeType::ExactInput),
				includes_delegation: true,
				is_smart_wallet_transaction: true,
				tx_id: Some("swap-1".into()),
			})
			.unwrap();

		assert!(params.options.includes_delegation);
		assert!(params.options.is_smart_wallet_transaction);
		assert_eq!(params.tx_id.as_deref(), Some("swap-1"));
		assert!(matches!(params.type_info, TransactionTypeInfo::Swap(_)));
	}

	#[test]
	fn test_exact_input_minimum_output() {
		let TransactionTypeInfo::Swap(info) =
			trade_to_transaction_info(&trade(Routing::Classic, TradeType::ExactInput)).unwrap()
		else {
			panic!("expected swap info");
		};
		assert_eq!(
			info.trade,
			SwapTradeAmounts::ExactInput {
				input_currency_amount_raw: "1000".into(),
				expected_output_currency_amount_raw: "2000".into(),
				minimum_output_currency_amount_raw: "1990".into(),
			}
		);
		assert!(!info.is_uniswapx_order);
	}

	#[test]
	fn test_exact_output_maximum_input() {
		let TransactionTypeInfo::Swap(info) =
			trade_to_transaction_info(&trade(Routing::DutchV2, TradeType::ExactOutput)).unwrap()
		else {
			panic!("expected swap info");
		};
		assert_eq!(
			info.trade,
			SwapTradeAmounts::ExactOutput {
				output_currency_amount_raw: "2000".into(),
				expected_input_currency_amount_raw: "1000".into(),
				maximum_input_currency_amount_raw: "1005".into(),
			}
		);
		assert!(info.is_uniswapx_order);
	}

	#[test]
	fn test_bridge_trade_becomes_bridge_info() {
		let info = trade_to_transaction_info(&trade(Routing::Bridge, TradeType::ExactInput)).unwrap();
		let TransactionTypeInfo::Bridge(info) = info else {
			panic!("expected bridge info");
		};
		assert_eq!(info.output_currency_amount_raw, "2000");
		assert!(!info.deposit_confirmed);
	}

	#[test]
	fn test_malformed_trade_rejected() {
		let mut bad = trade(Routing::Classic, TradeType::ExactInput);
		bad.input_amount_raw = "1.5".into();
		assert!(matches!(
			trade_to_transaction_info(&bad),
			Err(FactoryError::InvalidAmount(_))
		));

		let mut bad = trade(Routing::Classic, TradeType::ExactInput);
		bad.output_currency_id.clear();
		assert!(matches!(
			trade_to_transaction_info(&bad),
			Err(FactoryError::InvalidTrade(_))
		));
	}

	#[test]
	fn test_wrap_direction() {
		let factory = TransactionParamsFactory::new(context(1));
		let wrap = |input_is_native| {
			factory
				.create_wrap_params(WrapTransactionData {
					signed_tx: signed(Some(Address::repeat_byte(0x55))),
					input_currency_amount_raw: "42".into(),
					input_is_native,
					gas_estimate: None,
					tx_id: None,
				})
				.unwrap()
				.type_info
		};

		let TransactionTypeInfo::Wrap(info) = wrap(true) else {
			panic!("expected wrap info");
		};
		assert!(!info.unwrapped);
		let TransactionTypeInfo::Wrap(info) = wrap(false) else {
			panic!("expected wrap info");
		};
		assert!(info.unwrapped);
	}

	#[test]
	fn test_order_params_require_order_routing() {
		let factory = TransactionParamsFactory::new(context(1));
		let data = |routing| UniswapXOrderTransactionData {
			signed_permit: SignedPermit {
				request: TypedDataRequest {
					domain: eip712_domain! { name: "Permit2", chain_id: 1, },
					types: BTreeMap::new(),
					value: serde_json::json!({}),
				},
				signature: Signature::new(U256::from(1u64), U256::from(2u64), false),
			},
			quote: UniswapXQuote {
				order_hash: B256::repeat_byte(0x0a),
				encoded_order: Bytes::from_static(&[0x01]),
				swapper: Address::repeat_byte(0x11),
				deadline: 1_700_000_600,
				quote_id: None,
				request_id: None,
			},
			routing,
			trade: trade(routing, TradeType::ExactInput),
			approve_tx_hash: None,
			tx_id: Some("order-1".into()),
		};

		assert!(matches!(
			factory.create_uniswapx_order_params(data(Routing::Classic)),
			Err(FactoryError::InvalidRouting(Routing::Classic))
		));

		let params = factory
			.create_uniswapx_order_params(data(Routing::Priority))
			.unwrap();
		assert_eq!(params.routing, Routing::Priority);
		assert_eq!(params.chain_id, 1);
		assert_eq!(params.account, Address::repeat_byte(0x11));
	}
}
