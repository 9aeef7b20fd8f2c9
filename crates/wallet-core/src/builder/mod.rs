//! Builder for constructing wallet engines.
//!
//! Storage and account backends are pluggable through factory functions
//! keyed by implementation name; providers are built from the network table
//! and the order relayer from its optional section.

use crate::engine::{event_bus::EventBus, WalletEngine};
use crate::orders::relayer::HttpOrderRelayer;
use crate::orders::OrderRelayer;
use crate::state::TransactionStore;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use wallet_account::{AccountError, AccountInterface, AccountService};
use wallet_config::Config;
use wallet_delivery::DeliveryService;
use wallet_storage::{StorageError, StorageInterface, StorageService};

/// Capacity of the store's event channel.
const EVENT_BUS_CAPACITY: usize = 1000;

/// Errors that can occur during wallet engine construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Factory functions for the pluggable backends, keyed by name.
pub struct WalletFactories<SF, AF> {
	pub storage_factories: HashMap<String, SF>,
	pub account_factories: HashMap<String, AF>,
}

/// Builder for constructing a WalletEngine with pluggable implementations.
pub struct WalletBuilder {
	config: Config,
}

impl WalletBuilder {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Builds the engine, restoring the transaction table from storage.
	pub async fn build<SF, AF>(
		self,
		factories: WalletFactories<SF, AF>,
	) -> Result<WalletEngine, BuilderError>
	where
		SF: Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>,
		AF: Fn(&toml::Value) -> Result<Box<dyn AccountInterface>, AccountError>,
	{
		let storage = Arc::new(StorageService::new(self.build_storage(&factories)?));
		let accounts = Arc::new(AccountService::new(self.build_accounts(&factories)?));
		for address in accounts.addresses() {
			tracing::info!(component = "account", address = %address, "Registered");
		}

		let delivery = DeliveryService::from_networks(&self.config.networks).map_err(|e| {
			BuilderError::Config(format!("Failed to create network providers: {}", e))
		})?;
		for chain_id in delivery.chain_ids() {
			tracing::info!(component = "delivery", chain_id = %chain_id, "Loaded");
		}

		let relayer = match &self.config.relayer {
			Some(config) => {
				let relayer = HttpOrderRelayer::new(config).map_err(|e| {
					BuilderError::Config(format!("Failed to create order relayer: {}", e))
				})?;
				tracing::info!(component = "relayer", base_url = %config.base_url, "Loaded");
				Some(Arc::new(relayer) as Arc<dyn OrderRelayer>)
			}
			None => {
				tracing::warn!("No relayer configured - UniswapX orders will not be tracked");
				None
			}
		};

		let store = TransactionStore::load(&storage, EventBus::new(EVENT_BUS_CAPACITY))
			.await
			.map_err(|e| BuilderError::Config(format!("Failed to load transaction state: {}", e)))?;

		Ok(WalletEngine::new(
			self.config,
			storage,
			accounts,
			Arc::new(delivery),
			Arc::new(store),
			relayer,
		))
	}

	fn build_storage<SF, AF>(
		&self,
		factories: &WalletFactories<SF, AF>,
	) -> Result<Box<dyn StorageInterface>, BuilderError>
	where
		SF: Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>,
	{
		let primary = &self.config.storage.primary;
		let config = self.config.storage.implementations.get(primary).ok_or_else(|| {
			BuilderError::MissingComponent(format!("storage implementation '{}'", primary))
		})?;
		let factory = factories.storage_factories.get(primary).ok_or_else(|| {
			BuilderError::Config(format!("Unknown storage implementation '{}'", primary))
		})?;

		match factory(config) {
			Ok(implementation) => {
				tracing::info!(component = "storage", implementation = %primary, enabled = true, "Loaded");
				Ok(implementation)
			}
			Err(e) => {
				tracing::error!(
					component = "storage",
					implementation = %primary,
					error = %e,
					"Failed to create storage implementation"
				);
				Err(BuilderError::Config(format!(
					"Failed to create storage implementation '{}': {}",
					primary, e
				)))
			}
		}
	}

	/// Creates every configured account; the primary one must load.
	fn build_accounts<SF, AF>(
		&self,
		factories: &WalletFactories<SF, AF>,
	) -> Result<Vec<Box<dyn AccountInterface>>, BuilderError>
	where
		AF: Fn(&toml::Value) -> Result<Box<dyn AccountInterface>, AccountError>,
	{
		let mut accounts = Vec::new();
		let mut primary_loaded = false;
		for (name, config) in &self.config.account.implementations {
			let Some(factory) = factories.account_factories.get(name) else {
				tracing::warn!(component = "account", implementation = %name, "No factory registered, skipping");
				continue;
			};
			match factory(config) {
				Ok(implementation) => {
					let is_primary = &self.config.account.primary == name;
					primary_loaded |= is_primary;
					tracing::info!(component = "account", implementation = %name, enabled = %is_primary, "Loaded");
					accounts.push(implementation);
				}
				Err(e) => {
					tracing::error!(
						component = "account",
						implementation = %name,
						error = %e,
						"Failed to create account implementation"
					);
					return Err(BuilderError::Config(format!(
						"Failed to create account implementation '{}': {}",
						name, e
					)));
				}
			}
		}

		if !primary_loaded {
			return Err(BuilderError::MissingComponent(format!(
				"primary account '{}'",
				self.config.account.primary
			)));
		}
		Ok(accounts)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::str::FromStr;

	const CONFIG: &str = r#"
[wallet]
id = "builder-test"

[networks.1]
rpc_url = "http://localhost:8545"

[storage]
primary = "memory"
[storage.implementations.memory]

[account]
primary = "local"
[account.implementations.local]
private_key = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"
"#;

	type StorageFactory = wallet_storage::StorageFactory;
	type AccountFactory = wallet_account::AccountFactory;

	fn factories() -> WalletFactories<StorageFactory, AccountFactory> {
		WalletFactories {
			storage_factories: wallet_storage::get_all_implementations()
				.into_iter()
				.map(|(name, factory)| (name.to_string(), factory))
				.collect(),
			account_factories: wallet_account::get_all_implementations()
				.into_iter()
				.map(|(name, factory)| (name.to_string(), factory))
				.collect(),
		}
	}

	#[tokio::test]
	async fn test_build_engine() {
		let config = Config::from_str(CONFIG).unwrap();
		let engine = WalletBuilder::new(config).build(factories()).await.unwrap();

		assert_eq!(engine.config().wallet.id, "builder-test");
		assert!(engine.store().snapshot().await.is_empty());
		assert!(engine.order_service().is_err());
	}

	#[tokio::test]
	async fn test_unknown_storage_rejected() {
		let config = Config::from_str(CONFIG).unwrap();
		let mut factories = factories();
		factories.storage_factories.clear();

		let err = WalletBuilder::new(config).build(factories).await.err().unwrap();
		assert!(matches!(err, BuilderError::Config(message) if message.contains("memory")));
	}

	#[tokio::test]
	async fn test_missing_primary_account_rejected() {
		let config = Config::from_str(CONFIG).unwrap();
		let mut factories = factories();
		factories.account_factories.clear();

		let err = WalletBuilder::new(config).build(factories).await.err().unwrap();
		assert!(matches!(err, BuilderError::MissingComponent(_)));
	}

	#[tokio::test]
	async fn test_relayer_enables_order_service() {
		let config = Config::from_str(&format!(
			"{}\n[relayer]\nbase_url = \"https://orders.example.org\"\n",
			CONFIG
		))
		.unwrap();
		let engine = WalletBuilder::new(config).build(factories()).await.unwrap();
		assert!(engine.order_service().is_ok());
	}
}
