//! Records built from the on-chain activity reported by the data API.
//!
//! The API labels each transaction and lists the token movements it caused.
//! The label picks the kind of record; the movements fill in its amounts.
//! Anything the label does not cover, or that lacks the movements its kind
//! needs, becomes an `Unknown` record.

use crate::orders::{currency_id, RestAmount};
use serde::{Deserialize, Serialize};
use wallet_types::{
	Address, ApproveTransactionInfo, AssetType, BridgeTransactionInfo, NetworkFee,
	NftMintTransactionInfo, NftSummaryInfo, ReceiveTransactionInfo, Routing,
	SendTransactionInfo, SwapTradeAmounts, SwapTransactionInfo, TransactionOptions,
	TransactionOriginType, TransactionRecord, TransactionSource, TransactionStatus,
	TransactionTypeInfo, TxHash, UnknownTransactionInfo, WrapTransactionInfo,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OnChainTransactionLabel {
	Send,
	Receive,
	Swap,
	UniswapX,
	Wrap,
	Unwrap,
	Withdraw,
	Lend,
	Approve,
	Bridge,
	Mint,
	Cancel,
	Claim,
	CreatePair,
	CreatePool,
	IncreaseLiquidity,
	DecreaseLiquidity,
	#[serde(other)]
	Unspecified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OnChainTransactionStatus {
	Pending,
	Confirmed,
	Failed,
	#[serde(other)]
	Unspecified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferDirection {
	Send,
	Receive,
}

/// Token or NFT moved by a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RestAsset {
	pub address: Option<Address>,
	pub symbol: Option<String>,
	/// Present for NFTs.
	pub token_id: Option<String>,
	pub name: Option<String>,
	pub collection_name: Option<String>,
	pub image_url: Option<String>,
	/// `ERC721` or `ERC1155` for NFTs, absent for currencies.
	pub standard: Option<String>,
}

impl RestAsset {
	fn asset_type(&self) -> AssetType {
		match self.standard.as_deref() {
			Some("ERC721") => AssetType::Erc721,
			Some("ERC1155") => AssetType::Erc1155,
			_ => AssetType::Currency,
		}
	}

	fn token_address(&self) -> Address {
		self.address.unwrap_or(Address::ZERO)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestTransfer {
	pub direction: TransferDirection,
	#[serde(default)]
	pub asset: RestAsset,
	pub amount: Option<RestAmount>,
	pub from: Option<Address>,
	pub to: Option<Address>,
	/// Chain the transfer happened on, if other than the transaction's.
	pub chain_id: Option<u64>,
}

impl RestTransfer {
	fn amount_raw(&self) -> Option<String> {
		self.amount.as_ref().map(|amount| amount.raw.clone())
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestApproval {
	pub token_address: Address,
	pub spender: Address,
	pub amount: Option<RestAmount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestFee {
	pub symbol: String,
	pub address: Address,
	pub amount: Option<RestAmount>,
}

/// An on-chain transaction as returned by the data API.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RestOnChainTransaction {
	pub chain_id: u64,
	pub transaction_hash: Option<String>,
	/// Timestamp in milliseconds, as a decimal string.
	pub timestamp_millis: Option<String>,
	pub from: Option<String>,
	pub to: Option<Address>,
	pub label: Option<OnChainTransactionLabel>,
	pub status: Option<OnChainTransactionStatus>,
	pub fee: Option<RestFee>,
	pub transfers: Vec<RestTransfer>,
	pub approvals: Vec<RestApproval>,
	pub dapp_url: Option<String>,
}

impl RestOnChainTransaction {
	fn sent(&self) -> Option<&RestTransfer> {
		self.transfers
			.iter()
			.find(|transfer| transfer.direction == TransferDirection::Send)
	}

	fn received(&self) -> Option<&RestTransfer> {
		self.transfers
			.iter()
			.find(|transfer| transfer.direction == TransferDirection::Receive)
	}
}

/// Maps the API status, reading it as the status of a cancellation when the
/// transaction was labelled as one.
pub fn map_on_chain_status(status: OnChainTransactionStatus, is_cancel: bool) -> TransactionStatus {
	match (status, is_cancel) {
		(OnChainTransactionStatus::Failed, true) => TransactionStatus::FailedCancel,
		(OnChainTransactionStatus::Failed, false) => TransactionStatus::Failed,
		(OnChainTransactionStatus::Pending, true) => TransactionStatus::Cancelling,
		(OnChainTransactionStatus::Pending, false) => TransactionStatus::Pending,
		(OnChainTransactionStatus::Confirmed, true) => TransactionStatus::Cancelled,
		(OnChainTransactionStatus::Confirmed, false) => TransactionStatus::Success,
		(OnChainTransactionStatus::Unspecified, _) => TransactionStatus::Unknown,
	}
}

/// Builds a record from an on-chain transaction.
///
/// Returns `None`, after logging, when the hash, sender or timestamp cannot
/// be parsed.
pub fn extract_rest_on_chain_transaction_details(
	transaction: &RestOnChainTransaction,
) -> Option<TransactionRecord> {
	match try_extract(transaction) {
		Ok(record) => Some(record),
		Err(error) => {
			tracing::error!(
				file = "activity",
				function = "extract_rest_on_chain_transaction_details",
				error = %error,
				"Failed to extract on-chain transaction"
			);
			None
		}
	}
}

fn try_extract(transaction: &RestOnChainTransaction) -> Result<TransactionRecord, String> {
	let raw_hash = transaction
		.transaction_hash
		.as_deref()
		.ok_or("missing transaction hash")?;
	let hash: TxHash = raw_hash
		.parse()
		.map_err(|e| format!("invalid transaction hash {}: {}", raw_hash, e))?;
	let from: Address = transaction
		.from
		.as_deref()
		.ok_or("missing sender")?
		.parse()
		.map_err(|e| format!("invalid sender: {}", e))?;
	let added_time = match transaction.timestamp_millis.as_deref() {
		Some(millis) => millis
			.parse::<u64>()
			.map_err(|e| format!("invalid timestamp {}: {}", millis, e))?,
		None => 0,
	};

	let label = transaction
		.label
		.unwrap_or(OnChainTransactionLabel::Unspecified);
	let type_info = parse_type_info(transaction, label).unwrap_or_else(|| parse_unknown(transaction));
	let routing = if label == OnChainTransactionLabel::UniswapX {
		Routing::DutchV2
	} else {
		Routing::Classic
	};
	let chain_id = transaction.chain_id;

	let mut record = TransactionRecord::new(
		hash.to_string(),
		chain_id,
		from,
		type_info,
		routing,
		TransactionSource::Wallet,
		added_time,
	);
	record.hash = Some(hash);
	record.status = map_on_chain_status(
		transaction
			.status
			.unwrap_or(OnChainTransactionStatus::Unspecified),
		label == OnChainTransactionLabel::Cancel,
	);
	record.options = Some(TransactionOptions::default());
	record.transaction_origin_type = TransactionOriginType::Internal;
	record.network_fee = transaction.fee.as_ref().map(|fee| NetworkFee {
		quantity: fee
			.amount
			.as_ref()
			.map_or_else(|| "0".to_string(), |amount| amount.raw.clone()),
		token_symbol: fee.symbol.clone(),
		token_address: fee.address,
		chain_id,
	});
	Ok(record)
}

fn parse_type_info(
	transaction: &RestOnChainTransaction,
	label: OnChainTransactionLabel,
) -> Option<TransactionTypeInfo> {
	use OnChainTransactionLabel as Label;

	let chain_id = transaction.chain_id;
	match label {
		Label::Send => {
			let sent = transaction.sent()?;
			Some(TransactionTypeInfo::Send(SendTransactionInfo {
				asset_type: sent.asset.asset_type(),
				recipient: sent.to?,
				token_address: sent.asset.token_address(),
				currency_amount_raw: sent.amount_raw(),
				token_id: sent.asset.token_id.clone(),
			}))
		}
		Label::Receive => {
			let received = transaction.received()?;
			Some(TransactionTypeInfo::Receive(ReceiveTransactionInfo {
				asset_type: received.asset.asset_type(),
				sender: received.from?,
				token_address: received.asset.token_address(),
				currency_amount_raw: received.amount_raw(),
				token_id: received.asset.token_id.clone(),
			}))
		}
		Label::Swap | Label::UniswapX => {
			let (sent, received) = (transaction.sent()?, transaction.received()?);
			let output = received.amount_raw()?;
			Some(TransactionTypeInfo::Swap(SwapTransactionInfo {
				input_currency_id: currency_id(chain_id, &sent.asset.token_address().to_string()),
				output_currency_id: currency_id(
					chain_id,
					&received.asset.token_address().to_string(),
				),
				trade: SwapTradeAmounts::ExactInput {
					input_currency_amount_raw: sent.amount_raw()?,
					expected_output_currency_amount_raw: output.clone(),
					minimum_output_currency_amount_raw: output,
				},
				is_uniswapx_order: label == Label::UniswapX,
				quote_id: None,
				gas_use_estimate: None,
				slippage_tolerance_bips: None,
			}))
		}
		Label::Wrap | Label::Unwrap | Label::Withdraw | Label::Lend => {
			let sent = transaction.sent()?;
			Some(TransactionTypeInfo::Wrap(WrapTransactionInfo {
				unwrapped: matches!(label, Label::Unwrap | Label::Withdraw),
				currency_amount_raw: sent.amount_raw()?,
				swap_tx_id: None,
				gas_estimate: None,
			}))
		}
		Label::Approve => {
			let approval = transaction.approvals.first()?;
			Some(TransactionTypeInfo::Approve(ApproveTransactionInfo {
				token_address: approval.token_address,
				spender: approval.spender,
				approval_amount: approval.amount.as_ref().map(|amount| amount.raw.clone()),
				swap_tx_id: None,
				gas_estimate: None,
			}))
		}
		Label::Bridge => {
			let (sent, received) = (transaction.sent()?, transaction.received()?);
			Some(TransactionTypeInfo::Bridge(BridgeTransactionInfo {
				input_currency_id: currency_id(
					sent.chain_id.unwrap_or(chain_id),
					&sent.asset.token_address().to_string(),
				),
				input_currency_amount_raw: sent.amount_raw()?,
				output_currency_id: currency_id(
					received.chain_id.unwrap_or(chain_id),
					&received.asset.token_address().to_string(),
				),
				output_currency_amount_raw: received.amount_raw()?,
				quote_id: None,
				deposit_confirmed: transaction.status == Some(OnChainTransactionStatus::Confirmed),
			}))
		}
		Label::Mint => {
			let minted = transaction
				.transfers
				.iter()
				.find(|transfer| {
					transfer.direction == TransferDirection::Receive
						&& transfer.asset.token_id.is_some()
				})?;
			let paid = transaction.sent();
			Some(TransactionTypeInfo::NftMint(NftMintTransactionInfo {
				nft_summary_info: NftSummaryInfo {
					token_id: minted.asset.token_id.clone()?,
					name: minted.asset.name.clone().unwrap_or_default(),
					collection_name: minted.asset.collection_name.clone().unwrap_or_default(),
					image_url: minted.asset.image_url.clone(),
					address: minted.asset.token_address(),
				},
				purchase_currency_id: paid
					.map(|paid| currency_id(chain_id, &paid.asset.token_address().to_string())),
				purchase_currency_amount_raw: paid.and_then(RestTransfer::amount_raw),
			}))
		}
		_ => None,
	}
}

fn parse_unknown(transaction: &RestOnChainTransaction) -> TransactionTypeInfo {
	TransactionTypeInfo::Unknown(UnknownTransactionInfo {
		token_address: transaction.to,
		dapp_url: transaction.dapp_url.clone(),
	})
}
