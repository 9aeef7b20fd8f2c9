//! Network configuration types.
//!
//! Each configured chain needs an RPC endpoint for the standard provider path,
//! an optional direct endpoint used to broadcast delegation-bundled transactions,
//! and the native currency used to denominate network fees.

use alloy::primitives::Address;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Configuration for a single blockchain network.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
	/// HTTP(S) RPC endpoint for the standard provider path.
	pub rpc_url: String,
	/// Endpoint used by the direct client when broadcasting bundled transactions.
	pub direct_rpc_url: Option<String>,
	/// Symbol of the native currency.
	#[serde(default = "default_native_currency_symbol")]
	pub native_currency_symbol: String,
	/// Address used to represent the native currency in fees.
	#[serde(default)]
	pub native_currency_address: Address,
}

fn default_native_currency_symbol() -> String {
	"ETH".to_string()
}

/// Networks configuration mapping chain IDs to their configurations.
pub type NetworksConfig = HashMap<u64, NetworkConfig>;

/// Deserializes network configurations keyed by chain id strings.
///
/// TOML tables only have string keys, so chain ids are parsed here.
pub fn deserialize_networks<'de, D>(deserializer: D) -> Result<NetworksConfig, D::Error>
where
	D: Deserializer<'de>,
{
	let string_map: HashMap<String, NetworkConfig> = HashMap::deserialize(deserializer)?;
	let mut result = HashMap::new();

	for (key, value) in string_map {
		let chain_id = key
			.parse::<u64>()
			.map_err(|e| serde::de::Error::custom(format!("Invalid chain_id '{}': {}", key, e)))?;
		result.insert(chain_id, value);
	}

	Ok(result)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[derive(Deserialize)]
	struct Wrapper {
		#[serde(deserialize_with = "deserialize_networks")]
		networks: NetworksConfig,
	}

	#[test]
	fn test_networks_keyed_by_chain_id() {
		let parsed: Wrapper = toml::from_str(
			r#"
[networks.1]
rpc_url = "http://localhost:8545"

[networks.10]
rpc_url = "http://localhost:8546"
direct_rpc_url = "http://localhost:9546"
native_currency_symbol = "OETH"
"#,
		)
		.unwrap();

		assert_eq!(parsed.networks.len(), 2);
		assert_eq!(parsed.networks[&1].native_currency_symbol, "ETH");
		assert_eq!(
			parsed.networks[&10].direct_rpc_url.as_deref(),
			Some("http://localhost:9546")
		);
	}

	#[test]
	fn test_invalid_chain_id_rejected() {
		let result: Result<Wrapper, _> = toml::from_str(
			r#"
[networks.mainnet]
rpc_url = "http://localhost:8545"
"#,
		);
		assert!(result.is_err());
	}
}
