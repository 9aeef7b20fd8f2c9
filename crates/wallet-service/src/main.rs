//! Main entry point for the wallet service.
//!
//! Loads configuration, restores the transaction table from storage and
//! watches pending transactions and orders until interrupted.

use clap::Parser;
use std::path::PathBuf;
use wallet_config::Config;
use wallet_core::{WalletBuilder, WalletEngine, WalletFactories};

use wallet_account::implementations::local::create_account;
use wallet_storage::implementations::file::create_storage as create_file_storage;
use wallet_storage::implementations::memory::create_storage as create_memory_storage;

/// Command-line arguments for the wallet service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	tracing::info!("Started wallet");

	let config_path = args
		.config
		.to_str()
		.ok_or("Configuration path is not valid UTF-8")?;
	let config = Config::from_file(config_path).await?;
	tracing::info!("Loaded configuration [{}]", config.wallet.id);

	let engine = build_engine(config).await?;
	engine.run().await?;

	tracing::info!("Stopped wallet");
	Ok(())
}

/// Macro to create a factory HashMap with the appropriate type aliases
macro_rules! create_factory_map {
    ($interface:path, $error:path, $( $name:literal => $factory:expr ),* $(,)?) => {{
        let mut factories = std::collections::HashMap::new();
        $(
            factories.insert(
                $name.to_string(),
                $factory as fn(&toml::Value) -> Result<Box<dyn $interface>, $error>
            );
        )*
        factories
    }};
}

/// Builds the wallet engine with the storage and account backends this
/// binary ships with.
async fn build_engine(config: Config) -> Result<WalletEngine, Box<dyn std::error::Error>> {
	let storage_factories = create_factory_map!(
		wallet_storage::StorageInterface,
		wallet_storage::StorageError,
		"file" => create_file_storage,
		"memory" => create_memory_storage,
	);

	let account_factories = create_factory_map!(
		wallet_account::AccountInterface,
		wallet_account::AccountError,
		"local" => create_account,
	);

	let factories = WalletFactories {
		storage_factories,
		account_factories,
	};

	Ok(WalletBuilder::new(config).build(factories).await?)
}
