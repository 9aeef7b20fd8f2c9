//! Transaction signer services.
//!
//! A signer service is bound to one account on one chain. It populates,
//! signs and broadcasts requests through four primitives; the composed
//! sign-and-send operation is written once, generically over those
//! primitives, so every variant shares it.

use crate::DeliveryError;
use async_trait::async_trait;
use thiserror::Error;
use wallet_account::AccountError;
use wallet_types::{
	current_timestamp_ms, Address, Bytes, DelegationInfo, Signature, SignedTransactionRequest,
	TransactionReceipt, TransactionRequest, TransactionSignerOutput, TxHash, TypedDataRequest,
};

mod bundled;
mod standard;

pub use bundled::BundledDelegationTransactionSignerService;
pub use standard::TransactionSignerService;

/// Errors raised by the signer services.
#[derive(Debug, Error)]
pub enum SignerError {
	/// No signer holds the key of the active account.
	#[error("No signer available for account {0}")]
	SignerUnavailable(Address),
	/// No RPC provider is configured for the chain.
	#[error("No provider available for chain {0}")]
	ProviderUnavailable(u64),
	/// The delegation contract address is absent or malformed.
	#[error("Delegation info missing: {0}")]
	DelegationInfoMissing(String),
	/// The request lacks fields required for signing.
	#[error("Invalid request: {0}")]
	InvalidRequest(String),
	/// Error that occurs in the key-holding signer.
	#[error("Signing error: {0}")]
	Signing(#[from] AccountError),
	/// Error that occurs during network communication.
	#[error("Network error: {0}")]
	Network(#[from] DeliveryError),
}

/// Signs and broadcasts transactions for one account on one chain.
///
/// None of the operations retry; retry policy belongs to the caller.
#[async_trait]
pub trait TransactionSigner: Send + Sync {
	/// Populates nonce, gas limit, chain id and fees on a raw request.
	async fn prepare_transaction(
		&self,
		request: TransactionRequest,
	) -> Result<TransactionRequest, SignerError>;

	/// Signs a populated request and returns the raw encoded transaction.
	async fn sign_transaction(&self, request: &TransactionRequest) -> Result<Bytes, SignerError>;

	/// Signs EIP-712 typed data.
	async fn sign_typed_data(&self, request: &TypedDataRequest) -> Result<Signature, SignerError>;

	/// Broadcasts a signed transaction.
	async fn send_transaction(&self, signed: &Bytes) -> Result<TxHash, SignerError>;

	/// Broadcasts a signed transaction and blocks until it is included.
	async fn send_transaction_sync(&self, signed: &Bytes) -> Result<TransactionReceipt, SignerError>;

	/// Prepares, signs and sends a request.
	async fn sign_and_send_transaction(
		&self,
		request: TransactionRequest,
	) -> Result<TransactionSignerOutput, SignerError> {
		sign_and_send_transaction(self, request).await
	}
}

/// Supplies the delegation state of an account.
#[async_trait]
pub trait DelegationInfoProvider: Send + Sync {
	async fn delegation_info(
		&self,
		account: &Address,
		chain_id: u64,
	) -> Result<DelegationInfo, SignerError>;
}

/// Runs prepare, sign and send in order, timestamping before sign and send.
pub async fn sign_and_send_transaction<S>(
	signer: &S,
	request: TransactionRequest,
) -> Result<TransactionSignerOutput, SignerError>
where
	S: TransactionSigner + ?Sized,
{
	let populated_request = signer.prepare_transaction(request).await?;
	let timestamp_before_sign = current_timestamp_ms();
	let signed = signer.sign_transaction(&populated_request).await?;
	let timestamp_before_send = current_timestamp_ms();
	let transaction_hash = signer.send_transaction(&signed).await?;

	Ok(TransactionSignerOutput {
		transaction_hash,
		populated_request,
		timestamp_before_sign,
		timestamp_before_send,
	})
}

/// Prepares and signs a request without broadcasting it.
pub async fn sign_request<S>(
	signer: &S,
	request: TransactionRequest,
) -> Result<SignedTransactionRequest, SignerError>
where
	S: TransactionSigner + ?Sized,
{
	let populated_request = signer.prepare_transaction(request).await?;
	let timestamp_before_sign = current_timestamp_ms();
	let signed = signer.sign_transaction(&populated_request).await?;
	Ok(SignedTransactionRequest::new(
		populated_request,
		signed,
		timestamp_before_sign,
	))
}


#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::Mutex;

	/// Signer whose primitives record their call order.
	#[derive(Default)]
	struct RecordingSigner {
		calls: Mutex<Vec<&'static str>>,
	}

	impl RecordingSigner {
		fn record(&self, call: &'static str) {
			self.calls.lock().unwrap().push(call);
		}
	}

	#[async_trait]
	impl TransactionSigner for RecordingSigner {
		async fn prepare_transaction(
			&self,
			mut request: TransactionRequest,
		) -> Result<TransactionRequest, SignerError> {
			self.record("prepare");
			request.nonce = Some(3);
			Ok(request)
		}

		async fn sign_transaction(&self, request: &TransactionRequest) -> Result<Bytes, SignerError> {
			self.record("sign");
			assert_eq!(request.nonce, Some(3));
			Ok(Bytes::from_static(&[0x02, 0x01]))
		}

		async fn sign_typed_data(&self, _request: &TypedDataRequest) -> Result<Signature, SignerError> {
			self.record("sign_typed_data");
			Err(SignerError::InvalidRequest("unused".into()))
		}

		async fn send_transaction(&self, signed: &Bytes) -> Result<TxHash, SignerError> {
			self.record("send");
			assert_eq!(signed.as_ref(), &[0x02, 0x01]);
			Ok(TxHash::repeat_byte(0x42))
		}

		async fn send_transaction_sync(
			&self,
			_signed: &Bytes,
		) -> Result<TransactionReceipt, SignerError> {
			self.record("send_sync");
			Err(SignerError::InvalidRequest("unused".into()))
		}
	}

	#[tokio::test]
	async fn test_sign_and_send_composition_order() {
		let signer = RecordingSigner::default();
		let output = signer
			.sign_and_send_transaction(TransactionRequest::default())
			.await
			.unwrap();

		assert_eq!(*signer.calls.lock().unwrap(), vec!["prepare", "sign", "send"]);
		assert_eq!(output.transaction_hash, TxHash::repeat_byte(0x42));
		assert_eq!(output.populated_request.nonce, Some(3));
		assert!(output.timestamp_before_sign <= output.timestamp_before_send);
	}

	#[tokio::test]
	async fn test_composition_through_trait_object() {
		let signer: Box<dyn TransactionSigner> = Box::new(RecordingSigner::default());
		let output = sign_and_send_transaction(signer.as_ref(), TransactionRequest::default())
			.await
			.unwrap();
		assert_eq!(output.transaction_hash, TxHash::repeat_byte(0x42));
	}

	#[tokio::test]
	async fn test_sign_request_does_not_send() {
		let signer = RecordingSigner::default();
		let signed = sign_request(&signer, TransactionRequest::default())
			.await
			.unwrap();

		assert_eq!(*signer.calls.lock().unwrap(), vec!["prepare", "sign"]);
		assert_eq!(signed.signed_request, Bytes::from_static(&[0x02, 0x01]));
		assert_eq!(signed.request.nonce, Some(3));
	}
}
