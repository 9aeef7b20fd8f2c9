use super::{SignerError, TransactionSigner};
use crate::{DeliveryError, DeliveryInterface, DeliveryService};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::instrument;
use wallet_account::{AccountInterface, SignerManager};
use wallet_types::{
	Address, Bytes, Signature, TransactionReceipt, TransactionRequest, TxHash, TypedDataRequest,
};

/// Signs locally and broadcasts through the chain's standard provider.
pub struct TransactionSignerService {
	account: Address,
	chain_id: u64,
	signer_manager: Arc<dyn SignerManager>,
	delivery: Arc<DeliveryService>,
}

impl TransactionSignerService {
	pub fn new(
		account: Address,
		chain_id: u64,
		signer_manager: Arc<dyn SignerManager>,
		delivery: Arc<DeliveryService>,
	) -> Self {
		Self {
			account,
			chain_id,
			signer_manager,
			delivery,
		}
	}

	pub fn account(&self) -> Address {
		self.account
	}

	pub fn chain_id(&self) -> u64 {
		self.chain_id
	}

	/// Resolves the signer holding the active account's key.
	pub(crate) async fn signer(&self) -> Result<Arc<dyn AccountInterface>, SignerError> {
		self.signer_manager
			.signer_for_account(&self.account)
			.await
			.ok_or(SignerError::SignerUnavailable(self.account))
	}

	pub(crate) fn provider(&self) -> Result<Arc<dyn DeliveryInterface>, SignerError> {
		self.delivery
			.provider(self.chain_id)
			.map_err(|_| SignerError::ProviderUnavailable(self.chain_id))
	}

	pub(crate) fn direct_provider(&self) -> Result<Arc<dyn DeliveryInterface>, SignerError> {
		self.delivery
			.direct_provider(self.chain_id)
			.map_err(|_| SignerError::ProviderUnavailable(self.chain_id))
	}
}

fn has_fees(request: &TransactionRequest) -> bool {
	request.gas_price.is_some()
		|| (request.max_fee_per_gas.is_some() && request.max_priority_fee_per_gas.is_some())
}

#[async_trait]
impl TransactionSigner for TransactionSignerService {
	#[instrument(skip_all, fields(account = %self.account, chain_id = self.chain_id))]
	async fn prepare_transaction(
		&self,
		mut request: TransactionRequest,
	) -> Result<TransactionRequest, SignerError> {
		self.signer().await?;
		let provider = self.provider()?;

		match request.from {
			Some(from) if from != self.account => {
				return Err(SignerError::InvalidRequest(format!(
					"request sender {} is not the active account",
					from
				)))
			}
			_ => request.from = Some(self.account),
		}
		match request.chain_id {
			Some(chain_id) if chain_id != self.chain_id => {
				return Err(SignerError::InvalidRequest(format!(
					"request chain {} does not match signer chain {}",
					chain_id, self.chain_id
				)))
			}
			_ => request.chain_id = Some(self.chain_id),
		}

		if request.nonce.is_none() {
			request.nonce = Some(provider.get_transaction_count(&self.account).await?);
		}
		if request.gas_limit.is_none() {
			request.gas_limit = Some(provider.estimate_gas(&request).await?);
		}
		if !has_fees(&request) {
			let fees = provider.get_fee_data().await?;
			match (fees.max_fee_per_gas, fees.max_priority_fee_per_gas, fees.gas_price) {
				(Some(max_fee), Some(priority_fee), _) => {
					request.max_fee_per_gas = Some(max_fee);
					request.max_priority_fee_per_gas = Some(priority_fee);
				}
				(_, _, Some(gas_price)) => request.gas_price = Some(gas_price),
				_ => {
					return Err(DeliveryError::Network("provider returned no fee data".into()).into())
				}
			}
		}

		tracing::debug!(nonce = ?request.nonce, gas_limit = ?request.gas_limit, "Prepared transaction");
		Ok(request)
	}

	async fn sign_transaction(&self, request: &TransactionRequest) -> Result<Bytes, SignerError> {
		if !request.is_populated() {
			return Err(SignerError::InvalidRequest(
				"transaction must be prepared before signing".into(),
			));
		}
		let signer = self.signer().await?;
		Ok(signer.sign_transaction(request).await?)
	}

	async fn sign_typed_data(&self, request: &TypedDataRequest) -> Result<Signature, SignerError> {
		let signer = self.signer().await?;
		Ok(signer.sign_typed_data(request).await?)
	}

	async fn send_transaction(&self, signed: &Bytes) -> Result<TxHash, SignerError> {
		Ok(self.provider()?.send_raw_transaction(signed).await?)
	}

	async fn send_transaction_sync(&self, signed: &Bytes) -> Result<TransactionReceipt, SignerError> {
		Ok(self.provider()?.send_raw_transaction_sync(signed).await?)
	}
}
