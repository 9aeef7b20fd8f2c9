//! Conversion of wallet transaction requests into signable consensus
//! transactions.
//!
//! The envelope type follows the fee fields of the request: the EIP-1559 pair
//! selects a type-2 transaction, a bare `gas_price` a legacy one. Type-4
//! transactions are only built explicitly, with their authorization list.

use crate::AccountError;
use alloy::consensus::{SignableTransaction, TxEip1559, TxEip7702, TxEnvelope, TxLegacy};
use alloy::eips::eip2718::Encodable2718;
use alloy::eips::eip7702::SignedAuthorization;
use alloy::primitives::TxKind;
use wallet_types::{Bytes, Signature, TransactionRequest, B256};

/// A consensus transaction ready to be signed.
#[derive(Debug, Clone, PartialEq)]
pub enum UnsignedTransaction {
	Legacy(TxLegacy),
	Eip1559(TxEip1559),
	Eip7702(TxEip7702),
}

struct CommonFields {
	chain_id: u64,
	nonce: u64,
	gas_limit: u64,
}

fn common_fields(request: &TransactionRequest) -> Result<CommonFields, AccountError> {
	Ok(CommonFields {
		chain_id: request
			.chain_id
			.ok_or_else(|| AccountError::InvalidRequest("missing chain id".into()))?,
		nonce: request
			.nonce
			.ok_or_else(|| AccountError::InvalidRequest("missing nonce".into()))?,
		gas_limit: request
			.gas_limit
			.ok_or_else(|| AccountError::InvalidRequest("missing gas limit".into()))?,
	})
}

impl UnsignedTransaction {
	/// Builds a legacy or EIP-1559 transaction from a populated request.
	pub fn from_request(request: &TransactionRequest) -> Result<Self, AccountError> {
		let common = common_fields(request)?;
		let to = request.to.map(TxKind::Call).unwrap_or(TxKind::Create);

		match (
			request.max_fee_per_gas,
			request.max_priority_fee_per_gas,
			request.gas_price,
		) {
			(Some(max_fee_per_gas), Some(max_priority_fee_per_gas), _) => {
				Ok(Self::Eip1559(TxEip1559 {
					chain_id: common.chain_id,
					nonce: common.nonce,
					gas_limit: common.gas_limit,
					max_fee_per_gas,
					max_priority_fee_per_gas,
					to,
					value: request.value,
					access_list: Default::default(),
					input: request.data.clone(),
				}))
			}
			(_, _, Some(gas_price)) => Ok(Self::Legacy(TxLegacy {
				chain_id: Some(common.chain_id),
				nonce: common.nonce,
				gas_price,
				gas_limit: common.gas_limit,
				to,
				value: request.value,
				input: request.data.clone(),
			})),
			_ => Err(AccountError::InvalidRequest("missing fee fields".into())),
		}
	}

	/// Builds a type-4 transaction carrying the given authorizations.
	///
	/// Requires EIP-1559 fees and a call target.
	pub fn eip7702(
		request: &TransactionRequest,
		authorization_list: Vec<SignedAuthorization>,
	) -> Result<Self, AccountError> {
		let common = common_fields(request)?;
		let to = request
			.to
			.ok_or_else(|| AccountError::InvalidRequest("delegation transaction needs a target".into()))?;
		let (Some(max_fee_per_gas), Some(max_priority_fee_per_gas)) =
			(request.max_fee_per_gas, request.max_priority_fee_per_gas)
		else {
			return Err(AccountError::InvalidRequest(
				"delegation transaction needs EIP-1559 fees".into(),
			));
		};

		Ok(Self::Eip7702(TxEip7702 {
			chain_id: common.chain_id,
			nonce: common.nonce,
			gas_limit: common.gas_limit,
			max_fee_per_gas,
			max_priority_fee_per_gas,
			to,
			value: request.value,
			access_list: Default::default(),
			authorization_list,
			input: request.data.clone(),
		}))
	}

	pub fn signature_hash(&self) -> B256 {
		match self {
			Self::Legacy(tx) => tx.signature_hash(),
			Self::Eip1559(tx) => tx.signature_hash(),
			Self::Eip7702(tx) => tx.signature_hash(),
		}
	}

	/// Attaches the signature and returns the EIP-2718 encoded envelope.
	pub fn into_signed_bytes(self, signature: Signature) -> Bytes {
		let envelope = match self {
			Self::Legacy(tx) => TxEnvelope::Legacy(tx.into_signed(signature)),
			Self::Eip1559(tx) => TxEnvelope::Eip1559(tx.into_signed(signature)),
			Self::Eip7702(tx) => TxEnvelope::Eip7702(tx.into_signed(signature)),
		};
		envelope.encoded_2718().into()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use wallet_types::{Address, U256};

	fn populated() -> TransactionRequest {
		TransactionRequest {
			chain_id: Some(1),
			to: Some(Address::repeat_byte(0x11)),
			value: U256::from(1u64),
			nonce: Some(7),
			gas_limit: Some(21_000),
			max_fee_per_gas: Some(30_000_000_000),
			max_priority_fee_per_gas: Some(1_000_000_000),
			..Default::default()
		}
	}

	#[test]
	fn test_envelope_follows_fee_fields() {
		assert!(matches!(
			UnsignedTransaction::from_request(&populated()).unwrap(),
			UnsignedTransaction::Eip1559(_)
		));

		let legacy = TransactionRequest {
			max_fee_per_gas: None,
			max_priority_fee_per_gas: None,
			gas_price: Some(5),
			..populated()
		};
		match UnsignedTransaction::from_request(&legacy).unwrap() {
			UnsignedTransaction::Legacy(tx) => assert_eq!(tx.chain_id, Some(1)),
			other => panic!("expected legacy, got {:?}", other),
		}
	}

	#[test]
	fn test_unpopulated_request_rejected() {
		let request = TransactionRequest {
			nonce: None,
			..populated()
		};
		assert!(matches!(
			UnsignedTransaction::from_request(&request),
			Err(AccountError::InvalidRequest(_))
		));

		let request = TransactionRequest {
			max_fee_per_gas: None,
			..populated()
		};
		assert!(UnsignedTransaction::from_request(&request).is_err());
	}

	#[test]
	fn test_eip7702_requires_target() {
		let request = TransactionRequest {
			to: None,
			..populated()
		};
		assert!(UnsignedTransaction::eip7702(&request, vec![]).is_err());
		assert!(UnsignedTransaction::eip7702(&populated(), vec![]).is_ok());
	}
}
