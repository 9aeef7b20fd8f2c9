//! Local private-key account.

use crate::{AccountError, AccountInterface};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;
use async_trait::async_trait;
use wallet_types::{without_0x_prefix, Address, SecretString, Signature, B256};

/// Account backed by an in-memory secp256k1 key.
pub struct LocalAccount {
	signer: PrivateKeySigner,
}

impl LocalAccount {
	/// Creates an account from a hex private key, with or without `0x`.
	pub fn new(private_key: &str) -> Result<Self, AccountError> {
		let signer = without_0x_prefix(private_key)
			.parse::<PrivateKeySigner>()
			.map_err(|e| AccountError::InvalidKey(format!("Invalid private key: {}", e)))?;
		Ok(Self { signer })
	}
}

#[async_trait]
impl AccountInterface for LocalAccount {
	fn address(&self) -> Address {
		self.signer.address()
	}

	async fn sign_hash(&self, hash: &B256) -> Result<Signature, AccountError> {
		self.signer
			.sign_hash(hash)
			.await
			.map_err(|e| AccountError::SigningFailed(e.to_string()))
	}
}

/// Factory function to create a local account from configuration.
///
/// Configuration parameters:
/// - `private_key`: hex-encoded secp256k1 key
pub fn create_account(config: &toml::Value) -> Result<Box<dyn AccountInterface>, AccountError> {
	let private_key = config
		.get("private_key")
		.and_then(|v| v.as_str())
		.map(SecretString::from)
		.ok_or_else(|| AccountError::InvalidKey("private_key is required".into()))?;

	let account = private_key.with_exposed(LocalAccount::new)?;
	tracing::debug!(address = %account.address(), "Loaded local account");
	Ok(Box::new(account))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::UnsignedTransaction;
	use alloy::eips::eip7702::Authorization;
	use alloy::sol_types::eip712_domain;
	use std::collections::BTreeMap;
	use wallet_types::{TransactionRequest, TypedDataField, TypedDataRequest, U256};

	const ANVIL_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
	const ANVIL_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

	fn account() -> LocalAccount {
		LocalAccount::new(ANVIL_KEY).unwrap()
	}

	#[test]
	fn test_address_derivation() {
		let expected: Address = ANVIL_ADDRESS.parse().unwrap();
		assert_eq!(account().address(), expected);
		assert_eq!(
			LocalAccount::new(without_0x_prefix(ANVIL_KEY)).unwrap().address(),
			expected
		);
	}

	#[test]
	fn test_invalid_key_rejected() {
		assert!(matches!(
			LocalAccount::new("0x1234"),
			Err(AccountError::InvalidKey(_))
		));
	}

	#[test]
	fn test_factory_requires_private_key() {
		let config: toml::Value = toml::from_str("other = 1").unwrap();
		assert!(create_account(&config).is_err());

		let config: toml::Value = toml::from_str(&format!("private_key = \"{}\"", ANVIL_KEY)).unwrap();
		let account = create_account(&config).unwrap();
		assert_eq!(account.address(), ANVIL_ADDRESS.parse::<Address>().unwrap());
	}

	#[tokio::test]
	async fn test_signature_recovers_to_account() {
		let hash = B256::repeat_byte(0xab);
		let signature = account().sign_hash(&hash).await.unwrap();
		let recovered = signature.recover_address_from_prehash(&hash).unwrap();
		assert_eq!(recovered, account().address());
	}

	#[tokio::test]
	async fn test_sign_transaction_produces_typed_envelope() {
		let request = TransactionRequest {
			chain_id: Some(1),
			to: Some(Address::repeat_byte(0x22)),
			nonce: Some(0),
			gas_limit: Some(21_000),
			max_fee_per_gas: Some(20_000_000_000),
			max_priority_fee_per_gas: Some(1_000_000_000),
			value: U256::from(10u64),
			..Default::default()
		};

		let raw = account().sign_transaction(&request).await.unwrap();
		assert_eq!(raw[0], 0x02);

		let unsigned = UnsignedTransaction::from_request(&request).unwrap();
		let signature = account().sign_hash(&unsigned.signature_hash()).await.unwrap();
		assert_eq!(unsigned.into_signed_bytes(signature), raw);
	}

	#[tokio::test]
	async fn test_sign_authorization() {
		let authorization = Authorization {
			chain_id: U256::from(1u64),
			address: Address::repeat_byte(0x33),
			nonce: 4,
		};
		let hash = authorization.signature_hash();
		let signed = account().sign_authorization(authorization).await.unwrap();

		assert_eq!(signed.nonce, 4);
		let recovered = signed.signature().unwrap().recover_address_from_prehash(&hash).unwrap();
		assert_eq!(recovered, account().address());
	}

	#[tokio::test]
	async fn test_sign_typed_data() {
		let mut types = BTreeMap::new();
		types.insert(
			"Mail".to_string(),
			vec![
				TypedDataField {
					name: "to".into(),
					r#type: "address".into(),
				},
				TypedDataField {
					name: "contents".into(),
					r#type: "string".into(),
				},
			],
		);
		let request = TypedDataRequest {
			domain: eip712_domain! { name: "Mail", version: "1", chain_id: 1, },
			types,
			value: serde_json::json!({
				"to": "0x2222222222222222222222222222222222222222",
				"contents": "hello",
			}),
		};

		let signature = account().sign_typed_data(&request).await.unwrap();
		assert_eq!(signature.as_bytes().len(), 65);
		let recovered = signature
			.recover_address_from_prehash(&request.signing_hash().unwrap())
			.unwrap();
		assert_eq!(recovered, account().address());
	}
}
