//! Per-kind transaction information.
//!
//! Every record carries exactly one `TransactionTypeInfo` variant. The variant
//! is serialized with an inline `type` tag so persisted state stays readable
//! and can be matched exhaustively when displayed or updated.

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

/// Tagged transaction information, one variant per transaction kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TransactionTypeInfo {
	#[serde(rename = "approve")]
	Approve(ApproveTransactionInfo),
	#[serde(rename = "permit2approve")]
	Permit2Approve(Permit2ApproveTransactionInfo),
	#[serde(rename = "swap")]
	Swap(SwapTransactionInfo),
	#[serde(rename = "wrap")]
	Wrap(WrapTransactionInfo),
	#[serde(rename = "bridge")]
	Bridge(BridgeTransactionInfo),
	#[serde(rename = "send")]
	Send(SendTransactionInfo),
	#[serde(rename = "receive")]
	Receive(ReceiveTransactionInfo),
	#[serde(rename = "nft-approve")]
	NftApprove(NftApproveTransactionInfo),
	#[serde(rename = "nft-mint")]
	NftMint(NftMintTransactionInfo),
	#[serde(rename = "nft-trade")]
	NftTrade(NftTradeTransactionInfo),
	#[serde(rename = "onramp-purchase")]
	OnRampPurchase(FiatOnRampTransactionInfo),
	#[serde(rename = "onramp-transfer")]
	OnRampTransfer(FiatOnRampTransactionInfo),
	#[serde(rename = "offramp-sale")]
	OffRampSale(FiatOnRampTransactionInfo),
	#[serde(rename = "local-onramp")]
	LocalOnRamp(LocalFiatRampTransactionInfo),
	#[serde(rename = "local-offramp")]
	LocalOffRamp(LocalFiatRampTransactionInfo),
	#[serde(rename = "wc-confirm")]
	WcConfirm(WcConfirmTransactionInfo),
	#[serde(rename = "unknown")]
	Unknown(UnknownTransactionInfo),
}

impl TransactionTypeInfo {
	/// Returns the wire tag of this variant.
	pub fn type_name(&self) -> &'static str {
		match self {
			TransactionTypeInfo::Approve(_) => "approve",
			TransactionTypeInfo::Permit2Approve(_) => "permit2approve",
			TransactionTypeInfo::Swap(_) => "swap",
			TransactionTypeInfo::Wrap(_) => "wrap",
			TransactionTypeInfo::Bridge(_) => "bridge",
			TransactionTypeInfo::Send(_) => "send",
			TransactionTypeInfo::Receive(_) => "receive",
			TransactionTypeInfo::NftApprove(_) => "nft-approve",
			TransactionTypeInfo::NftMint(_) => "nft-mint",
			TransactionTypeInfo::NftTrade(_) => "nft-trade",
			TransactionTypeInfo::OnRampPurchase(_) => "onramp-purchase",
			TransactionTypeInfo::OnRampTransfer(_) => "onramp-transfer",
			TransactionTypeInfo::OffRampSale(_) => "offramp-sale",
			TransactionTypeInfo::LocalOnRamp(_) => "local-onramp",
			TransactionTypeInfo::LocalOffRamp(_) => "local-offramp",
			TransactionTypeInfo::WcConfirm(_) => "wc-confirm",
			TransactionTypeInfo::Unknown(_) => "unknown",
		}
	}

	/// Returns true if both values are the same variant.
	pub fn same_type(&self, other: &TransactionTypeInfo) -> bool {
		std::mem::discriminant(self) == std::mem::discriminant(other)
	}

	/// Returns true for fiat on-ramp and off-ramp variants.
	pub fn is_fiat_on_ramp(&self) -> bool {
		matches!(
			self,
			TransactionTypeInfo::LocalOnRamp(_)
				| TransactionTypeInfo::LocalOffRamp(_)
				| TransactionTypeInfo::OnRampPurchase(_)
				| TransactionTypeInfo::OnRampTransfer(_)
				| TransactionTypeInfo::OffRampSale(_)
		)
	}
}

/// Gas estimate attached to approval and wrap steps of a multi-step flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasEstimate {
	pub gas_limit: u64,
	/// Estimated total fee in wei, as a decimal string.
	pub gas_fee: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveTransactionInfo {
	pub token_address: Address,
	pub spender: Address,
	/// Raw approval amount; absent means unlimited.
	pub approval_amount: Option<String>,
	/// Id of the swap this approval unlocks.
	pub swap_tx_id: Option<String>,
	pub gas_estimate: Option<GasEstimate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permit2ApproveTransactionInfo {
	pub token_address: Address,
	pub spender: Address,
	pub amount: Option<String>,
}

/// Amounts of a swap, by trade direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tradeType", rename_all = "camelCase")]
pub enum SwapTradeAmounts {
	#[serde(rename_all = "camelCase")]
	ExactInput {
		input_currency_amount_raw: String,
		expected_output_currency_amount_raw: String,
		minimum_output_currency_amount_raw: String,
	},
	#[serde(rename_all = "camelCase")]
	ExactOutput {
		output_currency_amount_raw: String,
		expected_input_currency_amount_raw: String,
		maximum_input_currency_amount_raw: String,
	},
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapTransactionInfo {
	/// Currency id in the form `{chainId}-{tokenAddress}`.
	pub input_currency_id: String,
	pub output_currency_id: String,
	pub trade: SwapTradeAmounts,
	#[serde(default)]
	pub is_uniswapx_order: bool,
	pub quote_id: Option<String>,
	pub gas_use_estimate: Option<String>,
	pub slippage_tolerance_bips: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WrapTransactionInfo {
	/// True when converting the wrapped token back to the native currency.
	pub unwrapped: bool,
	pub currency_amount_raw: String,
	pub swap_tx_id: Option<String>,
	pub gas_estimate: Option<GasEstimate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeTransactionInfo {
	pub input_currency_id: String,
	pub input_currency_amount_raw: String,
	pub output_currency_id: String,
	pub output_currency_amount_raw: String,
	pub quote_id: Option<String>,
	/// Set once the destination chain deposit is observed.
	#[serde(default)]
	pub deposit_confirmed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssetType {
	Currency,
	Erc721,
	Erc1155,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendTransactionInfo {
	pub asset_type: AssetType,
	pub recipient: Address,
	pub token_address: Address,
	pub currency_amount_raw: Option<String>,
	pub token_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiveTransactionInfo {
	pub asset_type: AssetType,
	pub sender: Address,
	pub token_address: Address,
	pub currency_amount_raw: Option<String>,
	pub token_id: Option<String>,
}

/// Display summary of an NFT.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NftSummaryInfo {
	pub token_id: String,
	pub name: String,
	pub collection_name: String,
	pub image_url: Option<String>,
	pub address: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NftApproveTransactionInfo {
	pub nft_summary_info: NftSummaryInfo,
	pub spender: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NftMintTransactionInfo {
	pub nft_summary_info: NftSummaryInfo,
	pub purchase_currency_id: Option<String>,
	pub purchase_currency_amount_raw: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NftTradeType {
	Buy,
	Sell,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NftTradeTransactionInfo {
	pub nft_summary_info: NftSummaryInfo,
	pub purchase_currency_id: String,
	pub purchase_currency_amount_raw: String,
	pub trade_type: NftTradeType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceProviderInfo {
	pub name: String,
	pub logo_url: Option<String>,
}

/// Details of a completed fiat on-ramp or off-ramp provider transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FiatOnRampTransactionInfo {
	/// Provider-side transaction id.
	pub id: String,
	pub explorer_url: Option<String>,
	pub input_symbol: Option<String>,
	pub input_currency_amount: Option<String>,
	pub output_symbol: Option<String>,
	pub output_currency_amount: Option<String>,
	pub destination_token_address: Option<Address>,
	pub service_provider: ServiceProviderInfo,
	pub network_fee: Option<String>,
	pub transaction_fee: Option<String>,
	pub total_fee: Option<String>,
}

/// Placeholder for a ramp started locally, before the provider reports back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalFiatRampTransactionInfo {
	pub service_provider: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DappInfo {
	pub name: Option<String>,
	pub url: String,
	pub icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WcConfirmTransactionInfo {
	pub dapp: DappInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnknownTransactionInfo {
	pub token_address: Option<Address>,
	pub dapp_url: Option<String>,
}
