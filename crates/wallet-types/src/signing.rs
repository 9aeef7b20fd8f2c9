//! Signing artifacts produced and consumed by the transaction signer.

use crate::TransactionRequest;
use alloy::dyn_abi::TypedData;
use alloy::primitives::{keccak256, Bytes, TxHash, B256};
use alloy::sol_types::Eip712Domain;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

/// A populated request together with its signed, broadcastable encoding.
///
/// Produced by the signer and owned by the submission pipeline until the
/// raw bytes are broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedTransactionRequest {
	/// The request exactly as it was signed.
	pub request: TransactionRequest,
	/// EIP-2718 encoded signed transaction.
	pub signed_request: Bytes,
	/// Hash of the signed transaction.
	pub hash: TxHash,
	/// Milliseconds timestamp taken right before signing.
	pub timestamp_before_sign: u64,
}

impl SignedTransactionRequest {
	/// Wraps raw signed bytes, deriving the transaction hash from them.
	pub fn new(request: TransactionRequest, signed_request: Bytes, timestamp_before_sign: u64) -> Self {
		let hash = keccak256(&signed_request);
		Self {
			request,
			signed_request,
			hash,
			timestamp_before_sign,
		}
	}
}

/// Result of a composed prepare, sign and send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSignerOutput {
	pub transaction_hash: TxHash,
	pub populated_request: TransactionRequest,
	pub timestamp_before_sign: u64,
	pub timestamp_before_send: u64,
}

/// Delegation state of an account as reported by the smart wallet subsystem.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegationInfo {
	/// Address of the delegation contract, unvalidated.
	pub contract_address: Option<String>,
	pub is_delegated: bool,
}

/// Errors raised while hashing typed data.
#[derive(Debug, Error)]
pub enum TypedDataError {
	/// The primary type could not be determined from the type set.
	#[error("Cannot determine primary type: {0}")]
	PrimaryType(String),
	/// The typed data could not be encoded.
	#[error("Invalid typed data: {0}")]
	Invalid(String),
}

/// A single member of an EIP-712 struct type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedDataField {
	pub name: String,
	#[serde(rename = "type")]
	pub r#type: String,
}

/// EIP-712 payload to sign: domain, struct types and message value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedDataRequest {
	pub domain: Eip712Domain,
	pub types: BTreeMap<String, Vec<TypedDataField>>,
	pub value: serde_json::Value,
}

impl TypedDataRequest {
	/// Returns the struct type that no other type references.
	pub fn primary_type(&self) -> Result<String, TypedDataError> {
		let referenced: HashSet<&str> = self
			.types
			.values()
			.flatten()
			.map(|field| base_type(&field.r#type))
			.collect();

		let roots: Vec<&String> = self
			.types
			.keys()
			.filter(|name| name.as_str() != "EIP712Domain" && !referenced.contains(name.as_str()))
			.collect();

		match roots.as_slice() {
			[root] => Ok((*root).clone()),
			[] => Err(TypedDataError::PrimaryType("no root type".into())),
			_ => Err(TypedDataError::PrimaryType(format!(
				"ambiguous root types: {:?}",
				roots
			))),
		}
	}

	/// Computes the EIP-712 signing hash.
	pub fn signing_hash(&self) -> Result<B256, TypedDataError> {
		let primary_type = self.primary_type()?;
		let types: BTreeMap<&String, &Vec<TypedDataField>> = self
			.types
			.iter()
			.filter(|(name, _)| name.as_str() != "EIP712Domain")
			.collect();

		let payload = serde_json::json!({
			"domain": self.domain,
			"types": types,
			"primaryType": primary_type,
			"message": self.value,
		});

		let typed: TypedData =
			serde_json::from_value(payload).map_err(|e| TypedDataError::Invalid(e.to_string()))?;
		typed
			.eip712_signing_hash()
			.map_err(|e| TypedDataError::Invalid(e.to_string()))
	}
}

/// Strips array suffixes from a type name.
fn base_type(type_name: &str) -> &str {
	type_name.split('[').next().unwrap_or(type_name)
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy::primitives::address;
	use alloy::sol_types::eip712_domain;

	fn field(name: &str, ty: &str) -> TypedDataField {
		TypedDataField {
			name: name.into(),
			r#type: ty.into(),
		}
	}

	fn permit_request(amount: &str) -> TypedDataRequest {
		let mut types = BTreeMap::new();
		types.insert(
			"PermitDetails".to_string(),
			vec![
				field("token", "address"),
				field("amount", "uint160"),
				field("expiration", "uint48"),
				field("nonce", "uint48"),
			],
		);
		types.insert(
			"PermitSingle".to_string(),
			vec![
				field("details", "PermitDetails"),
				field("spender", "address"),
				field("sigDeadline", "uint256"),
			],
		);

		TypedDataRequest {
			domain: eip712_domain! {
				name: "Permit2",
				chain_id: 1,
				verifying_contract: address!("000000000022D473030F116dDEE9F6B43aC78BA3"),
			},
			types,
			value: serde_json::json!({
				"details": {
					"token": "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48",
					"amount": amount,
					"expiration": "1700000000",
					"nonce": "0",
				},
				"spender": "0x3fc91a3afd70395cd496c647d5a6cc9d4b2b7fad",
				"sigDeadline": "1700000000",
			}),
		}
	}

	#[test]
	fn test_primary_type_inference() {
		let request = permit_request("1000");
		assert_eq!(request.primary_type().unwrap(), "PermitSingle");
	}

	#[test]
	fn test_ambiguous_primary_type_rejected() {
		let mut request = permit_request("1000");
		request
			.types
			.insert("Other".to_string(), vec![field("value", "uint256")]);
		assert!(matches!(
			request.primary_type(),
			Err(TypedDataError::PrimaryType(_))
		));
	}

	#[test]
	fn test_signing_hash_depends_on_message() {
		let first = permit_request("1000").signing_hash().unwrap();
		let again = permit_request("1000").signing_hash().unwrap();
		let other = permit_request("2000").signing_hash().unwrap();

		assert_eq!(first, again);
		assert_ne!(first, other);
	}

	#[test]
	fn test_signed_request_hash_is_keccak_of_bytes() {
		let raw = Bytes::from(vec![0x02, 0xf8, 0x01]);
		let signed = SignedTransactionRequest::new(TransactionRequest::default(), raw.clone(), 5);
		assert_eq!(signed.hash, keccak256(&raw));
		assert_eq!(signed.timestamp_before_sign, 5);
	}
}
