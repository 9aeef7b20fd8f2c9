use super::{DelegationInfoProvider, SignerError, TransactionSigner, TransactionSignerService};
use alloy::eips::eip7702::Authorization;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::instrument;
use wallet_account::UnsignedTransaction;
use wallet_types::{
	Address, Bytes, Signature, TransactionReceipt, TransactionRequest, TxHash, TypedDataRequest, U256,
};

/// Signer that bundles an EIP-7702 delegation authorization into every
/// transaction and broadcasts through the chain's direct client.
pub struct BundledDelegationTransactionSignerService {
	base: TransactionSignerService,
	delegation: Arc<dyn DelegationInfoProvider>,
}

impl BundledDelegationTransactionSignerService {
	pub fn new(base: TransactionSignerService, delegation: Arc<dyn DelegationInfoProvider>) -> Self {
		Self { base, delegation }
	}

	/// Resolves and validates the delegation contract for the active account.
	async fn delegation_contract(&self) -> Result<Address, SignerError> {
		let info = self
			.delegation
			.delegation_info(&self.base.account(), self.base.chain_id())
			.await?;

		let contract = info.contract_address.ok_or_else(|| {
			SignerError::DelegationInfoMissing("delegation contract address is required".into())
		})?;
		parse_address(&contract).ok_or_else(|| {
			SignerError::DelegationInfoMissing(format!(
				"delegation contract address is invalid: {}",
				contract
			))
		})
	}

	/// Checks the fields a type-4 transaction cannot be built without.
	fn validate_request(&self, request: &TransactionRequest) -> Result<u64, SignerError> {
		let chain_id = request
			.chain_id
			.ok_or_else(|| SignerError::InvalidRequest("chain id is required".into()))?;
		if chain_id != self.base.chain_id() {
			return Err(SignerError::InvalidRequest(format!(
				"request chain {} does not match signer chain {}",
				chain_id,
				self.base.chain_id()
			)));
		}
		if request.from.is_some_and(|from| from != self.base.account()) {
			return Err(SignerError::InvalidRequest(
				"request sender is not the active account".into(),
			));
		}
		if request.to.is_none() {
			return Err(SignerError::InvalidRequest(
				"delegation transaction needs a target".into(),
			));
		}
		if request.gas_limit.is_none()
			|| request.max_fee_per_gas.is_none()
			|| request.max_priority_fee_per_gas.is_none()
		{
			return Err(SignerError::InvalidRequest(
				"delegation transaction needs gas limit and EIP-1559 fees".into(),
			));
		}
		request
			.nonce
			.ok_or_else(|| SignerError::InvalidRequest("nonce is required".into()))
	}
}

/// Parses a `0x`-prefixed 20-byte hex address.
fn parse_address(value: &str) -> Option<Address> {
	if value.len() != 42 || !value.starts_with("0x") {
		return None;
	}
	value.parse().ok()
}

#[async_trait]
impl TransactionSigner for BundledDelegationTransactionSignerService {
	async fn prepare_transaction(
		&self,
		request: TransactionRequest,
	) -> Result<TransactionRequest, SignerError> {
		self.base.prepare_transaction(request).await
	}

	/// Signs the request as a type-4 transaction carrying a delegation
	/// authorization.
	///
	/// The transaction consumes `nonce` before the authorization list is
	/// processed, so the authorization is signed with `nonce + 1`.
	#[instrument(skip_all, fields(account = %self.base.account(), chain_id = self.base.chain_id()))]
	async fn sign_transaction(&self, request: &TransactionRequest) -> Result<Bytes, SignerError> {
		let contract = self.delegation_contract().await?;
		let nonce = self.validate_request(request)?;
		let authorization_nonce = nonce
			.checked_add(1)
			.ok_or_else(|| SignerError::InvalidRequest("nonce overflow".into()))?;

		let signer = self.base.signer().await?;
		let authorization = Authorization {
			chain_id: U256::from(self.base.chain_id()),
			address: contract,
			nonce: authorization_nonce,
		};
		let signed_authorization = signer.sign_authorization(authorization).await?;

		let unsigned = UnsignedTransaction::eip7702(request, vec![signed_authorization])?;
		let signature = signer.sign_hash(&unsigned.signature_hash()).await?;

		tracing::debug!(delegation = %contract, nonce, "Signed bundled delegation transaction");
		Ok(unsigned.into_signed_bytes(signature))
	}

	async fn sign_typed_data(&self, request: &TypedDataRequest) -> Result<Signature, SignerError> {
		self.base.sign_typed_data(request).await
	}

	async fn send_transaction(&self, signed: &Bytes) -> Result<TxHash, SignerError> {
		Ok(self.base.direct_provider()?.send_raw_transaction(signed).await?)
	}

	async fn send_transaction_sync(&self, signed: &Bytes) -> Result<TransactionReceipt, SignerError> {
		tracing::warn!(
			chain_id = self.base.chain_id(),
			"Direct client has no synchronous send, falling back to the standard provider"
		);
		self.base.send_transaction_sync(signed).await
	}
}
