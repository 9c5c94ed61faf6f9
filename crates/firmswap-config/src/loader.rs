//! Configuration loading from files and environment.

use crate::Config;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, info};

pub struct ConfigLoader;

impl ConfigLoader {
	pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Config> {
		let path = path.as_ref();
		info!("loading configuration from {:?}", path);

		let contents = std::fs::read_to_string(path)
			.with_context(|| format!("failed to read config file {:?}", path))?;

		let mut config = match path.extension().and_then(|s| s.to_str()) {
			Some("toml") => Self::from_toml(&contents)?,
			Some("json") => Self::from_json(&contents)?,
			_ => anyhow::bail!("unsupported config format: {:?}", path),
		};

		Self::apply_env_overrides(&mut config);
		Self::validate(&config)?;
		Ok(config)
	}

	pub fn from_toml(contents: &str) -> Result<Config> {
		toml::from_str(contents).context("failed to parse TOML config")
	}

	pub fn from_json(contents: &str) -> Result<Config> {
		serde_json::from_str(contents).context("failed to parse JSON config")
	}

	fn apply_env_overrides(config: &mut Config) {
		if let Ok(key) = std::env::var("FIRMSWAP_SOLVER_PRIVATE_KEY") {
			debug!("overriding solver private key from environment");
			if let Some(solver) = config.solver.as_mut() {
				solver.private_key = key;
			}
		}
		if let Ok(port) = std::env::var("FIRMSWAP_PORT") {
			if let Ok(port) = port.parse() {
				debug!("overriding api port from environment");
				config.api.port = port;
			}
		}
	}

	pub fn validate(config: &Config) -> Result<()> {
		if config.chains.is_empty() {
			anyhow::bail!("at least one chain must be configured");
		}
		match config.storage.backend.as_str() {
			"file" | "memory" => {}
			other => anyhow::bail!("unknown storage backend '{}'", other),
		}
		if let Some(solver) = &config.solver {
			let key = solver.private_key.strip_prefix("0x").unwrap_or(&solver.private_key);
			if key.len() != 64 || !key.chars().all(|c| c.is_ascii_hexdigit()) {
				anyhow::bail!("solver private key must be 32 hex bytes");
			}
			if !config.chains.contains_key(&solver.chain_id) {
				anyhow::bail!(
					"solver chain {} is not in the configured chains",
					solver.chain_id
				);
			}
			if solver.tokens.is_empty() {
				anyhow::bail!("solver needs at least one configured token");
			}
		}
		Ok(())
	}
}
