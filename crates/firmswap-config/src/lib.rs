//! Typed configuration for the FirmSwap services, loaded from TOML or
//! JSON with environment-variable overrides and a validation pass.

pub mod loader;
pub mod serde_helpers;

pub use loader::ConfigLoader;

use firmswap_types::{Address, ChainId, B256};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
	#[serde(default)]
	pub api: ApiConfig,
	#[serde(default, with = "serde_helpers::chain_id_map")]
	pub chains: HashMap<ChainId, ChainConfig>,
	#[serde(default)]
	pub registry: RegistrySection,
	#[serde(default)]
	pub aggregator: AggregatorSection,
	#[serde(default)]
	pub storage: StorageSection,
	/// Present only when this process also runs the reference solver.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub solver: Option<SolverSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
	pub host: String,
	pub port: u16,
	/// Relaxes the https-only endpoint rule; never enable in production.
	#[serde(default)]
	pub dev_mode: bool,
}

impl Default for ApiConfig {
	fn default() -> Self {
		Self {
			host: "0.0.0.0".to_string(),
			port: 8080,
			dev_mode: false,
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
	pub name: String,
	/// Settlement engine address; doubles as the EIP-712 verifying
	/// contract.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub engine: Option<Address>,
	/// keccak256 of the deposit proxy's creation code with constructor
	/// args, for deposit-address derivation.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub proxy_code_hash: Option<B256>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub rpc_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrySection {
	pub max_solvers_per_chain: usize,
}

impl Default for RegistrySection {
	fn default() -> Self {
		Self {
			max_solvers_per_chain: 100,
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatorSection {
	pub max_fan_out: usize,
	pub quote_timeout_ms: u64,
	pub default_deposit_window_secs: u32,
	pub default_fill_window_secs: u32,
}

impl Default for AggregatorSection {
	fn default() -> Self {
		Self {
			max_fan_out: 20,
			quote_timeout_ms: 3_000,
			default_deposit_window_secs: 300,
			default_fill_window_secs: 120,
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSection {
	/// "file" or "memory".
	pub backend: String,
	pub path: String,
}

impl Default for StorageSection {
	fn default() -> Self {
		Self {
			backend: "file".to_string(),
			path: "./data/firmswap".to_string(),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverSection {
	pub private_key: String,
	pub chain_id: ChainId,
	pub spread_bps: u64,
	pub max_order_usd: f64,
	pub poll_interval_secs: u64,
	/// Bound on the startup nonce scan.
	#[serde(default = "default_nonce_scan_window")]
	pub nonce_scan_window: u64,
	#[serde(default)]
	pub tokens: Vec<TokenConfig>,
}

fn default_nonce_scan_window() -> u64 {
	1_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
	pub address: Address,
	pub symbol: String,
	pub decimals: u8,
	pub usd_price: f64,
}
