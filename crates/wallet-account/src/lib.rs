//! Account management module for the wallet.
//!
//! This module provides abstractions for key-holding accounts and the
//! resolution of an account address to the signer that controls it. Key
//! custody stays inside the implementations; callers only see addresses,
//! signatures and signed transaction bytes.

use alloy::eips::eip7702::{Authorization, SignedAuthorization};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use wallet_types::{Address, Bytes, Signature, TransactionRequest, TypedDataRequest, B256};

pub mod transaction;

/// Re-export implementations
pub mod implementations {
	pub mod local;
}

pub use transaction::UnsignedTransaction;

/// Errors that can occur during account operations.
#[derive(Debug, Error)]
pub enum AccountError {
	/// Error that occurs when signing operations fail.
	#[error("Signing failed: {0}")]
	SigningFailed(String),
	/// Error that occurs when a cryptographic key is invalid or malformed.
	#[error("Invalid key: {0}")]
	InvalidKey(String),
	/// Error that occurs when a request lacks fields required for signing.
	#[error("Invalid request: {0}")]
	InvalidRequest(String),
	/// Error that occurs when interacting with the account implementation.
	#[error("Implementation error: {0}")]
	Implementation(String),
}

/// Trait defining the interface for account implementations.
///
/// Implementations only need to sign a 32-byte digest; transaction,
/// authorization and typed-data signing are derived from that.
#[async_trait]
pub trait AccountInterface: Send + Sync {
	/// Returns the address controlled by this account.
	fn address(&self) -> Address;

	/// Signs a prehashed digest.
	async fn sign_hash(&self, hash: &B256) -> Result<Signature, AccountError>;

	/// Signs a populated request and returns its EIP-2718 encoding.
	async fn sign_transaction(&self, request: &TransactionRequest) -> Result<Bytes, AccountError> {
		let unsigned = UnsignedTransaction::from_request(request)?;
		let signature = self.sign_hash(&unsigned.signature_hash()).await?;
		Ok(unsigned.into_signed_bytes(signature))
	}

	/// Signs an EIP-7702 delegation authorization.
	async fn sign_authorization(
		&self,
		authorization: Authorization,
	) -> Result<SignedAuthorization, AccountError> {
		let signature = self.sign_hash(&authorization.signature_hash()).await?;
		Ok(authorization.into_signed(signature))
	}

	/// Signs EIP-712 typed data.
	async fn sign_typed_data(&self, request: &TypedDataRequest) -> Result<Signature, AccountError> {
		let hash = request
			.signing_hash()
			.map_err(|e| AccountError::SigningFailed(e.to_string()))?;
		self.sign_hash(&hash).await
	}
}

/// Resolves the signer that controls a given account.
#[async_trait]
pub trait SignerManager: Send + Sync {
	/// Returns the signer for `account`, or `None` if no key is held for it.
	async fn signer_for_account(&self, account: &Address) -> Option<Arc<dyn AccountInterface>>;
}

/// Type alias for account factory functions.
pub type AccountFactory = fn(&toml::Value) -> Result<Box<dyn AccountInterface>, AccountError>;

/// Get all registered account implementations.
///
/// Returns a vector of (name, factory) tuples for all available account implementations.
pub fn get_all_implementations() -> Vec<(&'static str, AccountFactory)> {
	use implementations::local;

	vec![("local", local::create_account)]
}

/// Service that manages the accounts known to this wallet.
///
/// Accounts are indexed by address and handed out to the signer services
/// through [`SignerManager`].
#[derive(Default)]
pub struct AccountService {
	accounts: HashMap<Address, Arc<dyn AccountInterface>>,
}

impl AccountService {
	/// Creates a new AccountService holding the given accounts.
	pub fn new(accounts: Vec<Box<dyn AccountInterface>>) -> Self {
		let accounts = accounts
			.into_iter()
			.map(|account| {
				let account: Arc<dyn AccountInterface> = Arc::from(account);
				(account.address(), account)
			})
			.collect();
		Self { accounts }
	}

	/// Returns the addresses of all managed accounts.
	pub fn addresses(&self) -> Vec<Address> {
		let mut addresses: Vec<Address> = self.accounts.keys().copied().collect();
		addresses.sort();
		addresses
	}
}

#[async_trait]
impl SignerManager for AccountService {
	async fn signer_for_account(&self, account: &Address) -> Option<Arc<dyn AccountInterface>> {
		let signer = self.accounts.get(account).cloned();
		if signer.is_none() {
			tracing::debug!(account = %account, "No signer registered for account");
		}
		signer
	}
}
