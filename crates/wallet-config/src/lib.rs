//! Configuration module for the wallet service.
//!
//! Configuration is read from TOML with `${VAR}` / `${VAR:-default}`
//! environment substitution. Files can be split with
//! `include = ["networks.toml", "storage.toml"]`; every top-level section must
//! be defined in exactly one file.

mod loader;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use wallet_types::networks::{deserialize_networks, NetworksConfig};

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure for the wallet service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Wallet instance settings.
	pub wallet: WalletConfig,
	/// Per-chain RPC configuration.
	#[serde(deserialize_with = "deserialize_networks")]
	pub networks: NetworksConfig,
	/// Storage backend used to persist the transaction table.
	pub storage: StorageConfig,
	/// Key-holding accounts.
	pub account: AccountConfig,
	/// UniswapX order relayer; order tracking is disabled without it.
	pub relayer: Option<RelayerConfig>,
}

/// Wallet instance settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WalletConfig {
	/// Identifier used in logs.
	pub id: String,
	/// How long a transaction is watched before giving up.
	#[serde(default = "default_monitoring_timeout_minutes")]
	pub monitoring_timeout_minutes: u64,
	/// Interval between receipt and order status polls.
	#[serde(default = "default_poll_interval_seconds")]
	pub poll_interval_seconds: u64,
	/// Interval between snapshots of the transaction table to storage.
	#[serde(default = "default_persist_interval_seconds")]
	pub persist_interval_seconds: u64,
}

/// Returns the default monitoring timeout in minutes (8 hours).
fn default_monitoring_timeout_minutes() -> u64 {
	480
}

fn default_poll_interval_seconds() -> u64 {
	3
}

fn default_persist_interval_seconds() -> u64 {
	30
}

/// Configuration for the storage backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of storage implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for account management.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccountConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of account implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for the UniswapX order relayer.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RelayerConfig {
	/// Base URL of the order API.
	pub base_url: String,
	/// Request timeout in seconds.
	#[serde(default = "default_relayer_timeout")]
	pub timeout_seconds: u64,
}

fn default_relayer_timeout() -> u64 {
	30
}

/// Resolves environment variables in a string.
///
/// Replaces `${VAR_NAME}` with the value of `VAR_NAME`, falling back to the
/// default in `${VAR_NAME:-default}`. Input is capped at 1MB.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last = 0;

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};

		let value = match std::env::var(var_name.as_str()) {
			Ok(v) => v,
			Err(_) => match cap.get(2) {
				Some(default) => default.as_str().to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name.as_str()
					)))
				}
			},
		};

		result.push_str(&input[last..full_match.start()]);
		result.push_str(&value);
		last = full_match.end();
	}
	result.push_str(&input[last..]);

	Ok(result)
}

impl Config {
	/// Loads configuration from a file, following include directives.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let path_buf = Path::new(path);
		let base_dir = path_buf.parent().unwrap_or_else(|| Path::new("."));

		let mut loader = loader::ConfigLoader::new(base_dir);
		let file_name = path_buf
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid path: {}", path)))?;
		loader.load_config(file_name).await
	}

	/// Validates the configuration.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.wallet.id.is_empty() {
			return Err(ConfigError::Validation("Wallet ID cannot be empty".into()));
		}
		if self.wallet.poll_interval_seconds == 0 {
			return Err(ConfigError::Validation(
				"poll_interval_seconds must be greater than 0".into(),
			));
		}
		if self.wallet.persist_interval_seconds == 0 {
			return Err(ConfigError::Validation(
				"persist_interval_seconds must be greater than 0".into(),
			));
		}
		if self.wallet.monitoring_timeout_minutes == 0 {
			return Err(ConfigError::Validation(
				"monitoring_timeout_minutes must be greater than 0".into(),
			));
		}

		if self.networks.is_empty() {
			return Err(ConfigError::Validation(
				"At least one network must be configured".into(),
			));
		}
		for (chain_id, network) in &self.networks {
			validate_url(&network.rpc_url)
				.map_err(|e| ConfigError::Validation(format!("Network {}: {}", chain_id, e)))?;
			if let Some(direct) = &network.direct_rpc_url {
				validate_url(direct).map_err(|e| {
					ConfigError::Validation(format!("Network {} direct client: {}", chain_id, e))
				})?;
			}
		}

		if !self
			.storage
			.implementations
			.contains_key(&self.storage.primary)
		{
			return Err(ConfigError::Validation(format!(
				"Primary storage '{}' not found in implementations",
				self.storage.primary
			)));
		}

		if !self
			.account
			.implementations
			.contains_key(&self.account.primary)
		{
			return Err(ConfigError::Validation(format!(
				"Primary account '{}' not found in implementations",
				self.account.primary
			)));
		}

		if let Some(relayer) = &self.relayer {
			validate_url(&relayer.base_url)
				.map_err(|e| ConfigError::Validation(format!("Relayer: {}", e)))?;
		}

		Ok(())
	}
}

fn validate_url(url: &str) -> Result<(), String> {
	if url.starts_with("http://") || url.starts_with("https://") {
		Ok(())
	} else {
		Err(format!("URL must use http or https: {}", url))
	}
}

/// Parses a TOML string, resolving environment variables and validating.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}
