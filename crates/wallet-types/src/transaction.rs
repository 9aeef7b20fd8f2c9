//! Transaction records and the status vocabulary shared by on-chain
//! transactions and off-chain orders.

use crate::TransactionTypeInfo;
use alloy::primitives::{Address, Bytes, TxHash, TxKind, B256, U256};
use alloy::rpc::types::TransactionInput;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a transaction or order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransactionStatus {
	/// Broadcast or submitted, outcome unknown.
	Pending,
	/// A cancellation request has been sent and is racing the original.
	Cancelling,
	/// The cancellation won, or the order was cancelled.
	Cancelled,
	/// The cancellation lost and the original was mined.
	FailedCancel,
	/// A replacement transaction has been sent.
	Replacing,
	/// Mined successfully, or order filled.
	#[serde(rename = "confirmed")]
	Success,
	/// Mined and reverted, or order expired/errored.
	Failed,
	/// Status could not be determined.
	Unknown,
}

impl TransactionStatus {
	/// Returns true for statuses a record can never leave once reached.
	pub fn is_terminal(&self) -> bool {
		matches!(
			self,
			TransactionStatus::Success
				| TransactionStatus::Failed
				| TransactionStatus::Cancelled
				| TransactionStatus::FailedCancel
		)
	}
}

impl fmt::Display for TransactionStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			TransactionStatus::Pending => "pending",
			TransactionStatus::Cancelling => "cancelling",
			TransactionStatus::Cancelled => "cancelled",
			TransactionStatus::FailedCancel => "failedCancel",
			TransactionStatus::Replacing => "replacing",
			TransactionStatus::Success => "confirmed",
			TransactionStatus::Failed => "failed",
			TransactionStatus::Unknown => "unknown",
		};
		write!(f, "{}", s)
	}
}

/// How a trade is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Routing {
	/// Regular on-chain transaction.
	Classic,
	/// Cross-chain bridge transaction.
	Bridge,
	/// UniswapX Dutch auction order, version 2.
	DutchV2,
	/// UniswapX Dutch auction order, version 3.
	DutchV3,
	/// UniswapX priority order.
	Priority,
}

impl Routing {
	/// Returns true for off-chain UniswapX order routings.
	pub fn is_uniswapx(&self) -> bool {
		matches!(self, Routing::DutchV2 | Routing::DutchV3 | Routing::Priority)
	}
}

/// Which side of the application produced the record.
///
/// Resolved once when the record is built; actions that only apply to one
/// side check this field instead of inspecting the record shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransactionSource {
	/// Created by the wallet's own submission pipeline.
	Wallet,
	/// Created by the web interface and tracked by block polling.
	Interface,
}

/// Whether the transaction was initiated by this wallet or observed externally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransactionOriginType {
	Internal,
	External,
}

/// An EVM transaction request, possibly partially populated.
///
/// Fee fields are either the EIP-1559 pair or `gas_price`; the signer picks
/// the envelope type from whichever is present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
	pub chain_id: Option<u64>,
	pub from: Option<Address>,
	pub to: Option<Address>,
	#[serde(default)]
	pub data: Bytes,
	#[serde(default)]
	pub value: U256,
	pub nonce: Option<u64>,
	pub gas_limit: Option<u64>,
	pub gas_price: Option<u128>,
	pub max_fee_per_gas: Option<u128>,
	pub max_priority_fee_per_gas: Option<u128>,
}

impl TransactionRequest {
	/// Returns true once nonce, gas, chain and fee fields are all set.
	pub fn is_populated(&self) -> bool {
		self.chain_id.is_some()
			&& self.nonce.is_some()
			&& self.gas_limit.is_some()
			&& (self.gas_price.is_some()
				|| (self.max_fee_per_gas.is_some() && self.max_priority_fee_per_gas.is_some()))
	}
}

impl From<&TransactionRequest> for alloy::rpc::types::TransactionRequest {
	fn from(request: &TransactionRequest) -> Self {
		alloy::rpc::types::TransactionRequest {
			from: request.from,
			to: request.to.map(TxKind::Call),
			value: Some(request.value),
			input: TransactionInput::new(request.data.clone()),
			nonce: request.nonce,
			chain_id: request.chain_id,
			gas: request.gas_limit,
			gas_price: request.gas_price,
			max_fee_per_gas: request.max_fee_per_gas,
			max_priority_fee_per_gas: request.max_priority_fee_per_gas,
			..Default::default()
		}
	}
}

/// Receipt of a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
	pub transaction_hash: TxHash,
	pub block_hash: B256,
	pub block_number: u64,
	pub transaction_index: u64,
	pub gas_used: u64,
	pub effective_gas_price: u128,
	/// True if execution succeeded.
	pub status: bool,
	/// Milliseconds timestamp when the wallet observed inclusion.
	pub confirmed_time: Option<u64>,
}

impl From<&alloy::rpc::types::TransactionReceipt> for TransactionReceipt {
	fn from(receipt: &alloy::rpc::types::TransactionReceipt) -> Self {
		Self {
			transaction_hash: receipt.transaction_hash,
			block_hash: receipt.block_hash.unwrap_or_default(),
			block_number: receipt.block_number.unwrap_or(0),
			transaction_index: receipt.transaction_index.unwrap_or(0),
			gas_used: receipt.gas_used,
			effective_gas_price: receipt.effective_gas_price,
			status: receipt.status(),
			confirmed_time: None,
		}
	}
}

/// Fee paid for a mined transaction, denominated in the native currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkFee {
	/// Raw amount in wei, as a decimal string.
	pub quantity: String,
	pub token_symbol: String,
	pub token_address: Address,
	pub chain_id: u64,
}

impl NetworkFee {
	/// Computes the fee from a receipt as gas used times effective gas price.
	pub fn from_receipt(
		receipt: &TransactionReceipt,
		chain_id: u64,
		token_symbol: &str,
		token_address: Address,
	) -> Self {
		let quantity =
			U256::from(receipt.gas_used).saturating_mul(U256::from(receipt.effective_gas_price));
		Self {
			quantity: quantity.to_string(),
			token_symbol: token_symbol.to_string(),
			token_address,
			chain_id,
		}
	}
}

/// Submission options attached to wallet-originated records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionOptions {
	/// The populated request that was signed.
	pub request: TransactionRequest,
	/// True when the transaction was routed through a private RPC.
	#[serde(default)]
	pub private_rpc: bool,
	/// True when the signed payload carried a delegation authorization.
	#[serde(default)]
	pub includes_delegation: bool,
	/// True when the account is a delegated smart wallet.
	#[serde(default)]
	pub is_smart_wallet_transaction: bool,
	/// When the user confirmed the action, in milliseconds.
	pub user_submission_timestamp_ms: Option<u64>,
	/// When the RPC accepted the transaction, in milliseconds.
	pub rpc_submission_timestamp_ms: Option<u64>,
	/// When the transaction was signed, in milliseconds.
	pub signature_timestamp_ms: Option<u64>,
}

/// Identity of a record in the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionKey {
	pub from: Address,
	pub chain_id: u64,
	pub id: String,
}

impl fmt::Display for TransactionKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}/{}/{}", self.from, self.chain_id, self.id)
	}
}

/// A tracked transaction or off-chain order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
	/// Transaction hash once known, otherwise a synthetic or order id.
	pub id: String,
	pub chain_id: u64,
	pub from: Address,
	pub status: TransactionStatus,
	pub type_info: TransactionTypeInfo,
	/// Creation time in milliseconds.
	pub added_time: u64,
	pub routing: Routing,
	pub source: TransactionSource,
	pub transaction_origin_type: TransactionOriginType,
	pub hash: Option<TxHash>,
	/// Order hash for UniswapX orders.
	pub order_hash: Option<B256>,
	pub options: Option<TransactionOptions>,
	pub receipt: Option<TransactionReceipt>,
	pub network_fee: Option<NetworkFee>,
	pub cancel_request: Option<TransactionRequest>,
	/// Highest block at which the interface checked this transaction.
	pub last_checked_block_number: Option<u64>,
	pub confirmed_time: Option<u64>,
	/// Set when the record was re-keyed to its cancellation hash.
	#[serde(default)]
	pub cancelled: bool,
}

impl TransactionRecord {
	/// Creates a pending record with every optional field unset.
	pub fn new(
		id: impl Into<String>,
		chain_id: u64,
		from: Address,
		type_info: TransactionTypeInfo,
		routing: Routing,
		source: TransactionSource,
		added_time: u64,
	) -> Self {
		Self {
			id: id.into(),
			chain_id,
			from,
			status: TransactionStatus::Pending,
			type_info,
			added_time,
			routing,
			source,
			transaction_origin_type: TransactionOriginType::Internal,
			hash: None,
			order_hash: None,
			options: None,
			receipt: None,
			network_fee: None,
			cancel_request: None,
			last_checked_block_number: None,
			confirmed_time: None,
			cancelled: false,
		}
	}

	/// Returns the store key of this record.
	pub fn key(&self) -> TransactionKey {
		TransactionKey {
			from: self.from,
			chain_id: self.chain_id,
			id: self.id.clone(),
		}
	}

	/// Returns true for UniswapX off-chain orders.
	pub fn is_uniswapx_order(&self) -> bool {
		self.routing.is_uniswapx()
	}

	/// Returns true if this record originated from the wallet pipeline.
	pub fn is_wallet(&self) -> bool {
		self.source == TransactionSource::Wallet
	}

	/// Returns the nonce of the signed request, if known.
	pub fn nonce(&self) -> Option<u64> {
		self.options.as_ref().and_then(|o| o.request.nonce)
	}
}
