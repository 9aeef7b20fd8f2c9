//! Stub signer and provider shared by the crate's tests.

use alloy::primitives::keccak256;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use wallet_delivery::signer::{SignerError, TransactionSigner};
use wallet_delivery::{DeliveryError, DeliveryInterface, FeeData};
use wallet_types::{
	Address, Bytes, Signature, TransactionReceipt, TransactionRequest, TxHash, TypedDataRequest,
	B256, U256,
};

pub fn receipt(hash: TxHash, block_number: u64, status: bool) -> TransactionReceipt {
	TransactionReceipt {
		transaction_hash: hash,
		block_hash: B256::repeat_byte(0xbb),
		block_number,
		transaction_index: 0,
		gas_used: 21_000,
		effective_gas_price: 2,
		status,
		confirmed_time: None,
	}
}

/// Signer that fills requests with fixed values and records broadcasts.
#[derive(Default)]
pub struct StubSigner {
	pub fail_send: bool,
	pub revert: bool,
	pub sent: Mutex<Vec<Bytes>>,
}

impl StubSigner {
	pub fn sent(&self) -> Vec<Bytes> {
		self.sent.lock().unwrap().clone()
	}

	fn record(&self, signed: &Bytes) -> Result<TxHash, SignerError> {
		if self.fail_send {
			return Err(DeliveryError::Network("connection refused".into()).into());
		}
		self.sent.lock().unwrap().push(signed.clone());
		Ok(keccak256(signed))
	}
}

#[async_trait]
impl TransactionSigner for StubSigner {
	async fn prepare_transaction(
		&self,
		mut request: TransactionRequest,
	) -> Result<TransactionRequest, SignerError> {
		request.chain_id.get_or_insert(1);
		request.nonce.get_or_insert(7);
		request.gas_limit.get_or_insert(21_000);
		if request.gas_price.is_none() {
			request.max_fee_per_gas.get_or_insert(100);
			request.max_priority_fee_per_gas.get_or_insert(10);
		}
		Ok(request)
	}

	async fn sign_transaction(&self, request: &TransactionRequest) -> Result<Bytes, SignerError> {
		let encoded = serde_json::to_vec(request)
			.map_err(|e| SignerError::InvalidRequest(e.to_string()))?;
		Ok(encoded.into())
	}

	async fn sign_typed_data(&self, _request: &TypedDataRequest) -> Result<Signature, SignerError> {
		Ok(Signature::new(U256::from(1u64), U256::from(2u64), false))
	}

	async fn send_transaction(&self, signed: &Bytes) -> Result<TxHash, SignerError> {
		self.record(signed)
	}

	async fn send_transaction_sync(&self, signed: &Bytes) -> Result<TransactionReceipt, SignerError> {
		let hash = self.record(signed)?;
		Ok(receipt(hash, 10, !self.revert))
	}
}

/// Provider whose receipts, nonce and block number are set by the test.
#[derive(Default)]
pub struct ScriptedDelivery {
	pub receipts: Mutex<HashMap<TxHash, TransactionReceipt>>,
	pub nonce: AtomicU64,
	pub block: AtomicU64,
	/// Number of upcoming receipt lookups that fail with a network error.
	pub failures: AtomicU64,
	/// Receipt that becomes visible once the account nonce has been read.
	pub mined_after_nonce_read: Mutex<Option<TransactionReceipt>>,
}

impl ScriptedDelivery {
	pub fn set_receipt(&self, receipt: TransactionReceipt) {
		self.receipts
			.lock()
			.unwrap()
			.insert(receipt.transaction_hash, receipt);
	}
}

#[async_trait]
impl DeliveryInterface for ScriptedDelivery {
	async fn get_transaction_count(&self, _address: &Address) -> Result<u64, DeliveryError> {
		if let Some(receipt) = self.mined_after_nonce_read.lock().unwrap().take() {
			self.set_receipt(receipt);
		}
		Ok(self.nonce.load(Ordering::SeqCst))
	}

	async fn estimate_gas(&self, _request: &TransactionRequest) -> Result<u64, DeliveryError> {
		Ok(21_000)
	}

	async fn get_fee_data(&self) -> Result<FeeData, DeliveryError> {
		Ok(FeeData {
			gas_price: Some(1),
			..Default::default()
		})
	}

	async fn send_raw_transaction(&self, raw: &Bytes) -> Result<TxHash, DeliveryError> {
		Ok(keccak256(raw))
	}

	async fn send_raw_transaction_sync(
		&self,
		raw: &Bytes,
	) -> Result<TransactionReceipt, DeliveryError> {
		Ok(receipt(keccak256(raw), self.block.load(Ordering::SeqCst), true))
	}

	async fn get_receipt(&self, hash: &TxHash) -> Result<Option<TransactionReceipt>, DeliveryError> {
		let pending_failures = self.failures.load(Ordering::SeqCst);
		if pending_failures > 0 {
			self.failures.store(pending_failures - 1, Ordering::SeqCst);
			return Err(DeliveryError::Network("timeout".into()));
		}
		Ok(self.receipts.lock().unwrap().get(hash).cloned())
	}

	async fn get_block_number(&self) -> Result<u64, DeliveryError> {
		Ok(self.block.load(Ordering::SeqCst))
	}
}
