//! Per-chain solver registry.
//!
//! Keyed by (solver address, chain id); registration is an idempotent
//! upsert that preserves insertion order (which also fixes the
//! aggregator's fan-out order), bounded by a per-chain cap. Mutations are
//! authorized by EIP-191 signatures over canonical messages and persisted
//! as per-chain JSON snapshots through the storage trait.

pub mod ssrf;

use firmswap_chains::SettlementChain;
use firmswap_codec as codec;
use firmswap_engine::MIN_BOND;
use firmswap_storage::{Storage, StorageError};
use firmswap_types::api::{RegisterSolverRequest, UnregisterSolverRequest};
use firmswap_types::{Address, ChainId, RegisteredSolver, U256};
use ssrf::SsrfError;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Registration timestamps must be within this window of the server clock.
pub const AUTH_WINDOW_MS: u64 = 5 * 60 * 1_000;

#[derive(Error, Debug)]
pub enum RegistryError {
	#[error("signature does not recover to the claimed address")]
	InvalidSignature,

	#[error("timestamp outside the allowed window")]
	StaleTimestamp,

	#[error("chain {0} is at its solver capacity")]
	CapacityExceeded(ChainId),

	#[error("solver not registered on chain {0}")]
	NotRegistered(ChainId),

	#[error(transparent)]
	Endpoint(#[from] SsrfError),

	#[error("solver bond on chain is missing or below minimum")]
	InsufficientOnChainBond,

	#[error("storage error: {0}")]
	Storage(#[from] StorageError),

	#[error("chain read failed: {0}")]
	Chain(String),
}

#[derive(Debug, Clone)]
pub struct RegistryConfig {
	pub max_solvers_per_chain: usize,
	pub dev_mode: bool,
}

impl Default for RegistryConfig {
	fn default() -> Self {
		Self {
			max_solvers_per_chain: 100,
			dev_mode: false,
		}
	}
}

pub struct SolverRegistry {
	config: RegistryConfig,
	storage: Arc<dyn Storage>,
	/// Insertion-ordered per-chain tables.
	tables: RwLock<HashMap<ChainId, Vec<RegisteredSolver>>>,
	/// Optional on-chain views for bond verification at registration.
	chains: HashMap<ChainId, Arc<dyn SettlementChain>>,
}

impl SolverRegistry {
	pub fn new(config: RegistryConfig, storage: Arc<dyn Storage>) -> Self {
		Self {
			config,
			storage,
			tables: RwLock::new(HashMap::new()),
			chains: HashMap::new(),
		}
	}

	/// Attach an on-chain view; registrations on this chain will verify the
	/// candidate's bond.
	pub fn attach_chain(mut self, chain_id: ChainId, chain: Arc<dyn SettlementChain>) -> Self {
		self.chains.insert(chain_id, chain);
		self
	}

	/// Restore persisted tables for the given chains.
	pub async fn load(&self, chain_ids: &[ChainId]) -> Result<(), RegistryError> {
		let mut tables = self.tables.write().await;
		for chain_id in chain_ids {
			match self.storage.get_bytes(&snapshot_key(*chain_id)).await {
				Ok(bytes) => {
					let solvers: Vec<RegisteredSolver> = serde_json::from_slice(&bytes)
						.map_err(|e| StorageError::Backend(e.to_string()))?;
					info!(chain = %chain_id, count = solvers.len(), "restored solver registry");
					tables.insert(*chain_id, solvers);
				}
				Err(StorageError::NotFound) => {}
				Err(e) => return Err(e.into()),
			}
		}
		Ok(())
	}

	/// Active solvers for a chain, in insertion order.
	pub async fn solvers(&self, chain_id: ChainId) -> Vec<RegisteredSolver> {
		self.tables
			.read()
			.await
			.get(&chain_id)
			.map(|table| table.iter().filter(|s| s.active).cloned().collect())
			.unwrap_or_default()
	}

	pub async fn get(&self, chain_id: ChainId, address: Address) -> Option<RegisteredSolver> {
		self.tables
			.read()
			.await
			.get(&chain_id)
			.and_then(|table| table.iter().find(|s| s.address == address).cloned())
	}

	/// Verify auth + endpoint + bond, then upsert. `now_ms` is the server
	/// clock in Unix milliseconds.
	pub async fn register(
		&self,
		chain_id: ChainId,
		request: &RegisterSolverRequest,
		now_ms: u64,
	) -> Result<RegisteredSolver, RegistryError> {
		check_timestamp(request.timestamp, now_ms)?;

		let message =
			codec::registration_message(request.address, &request.endpoint, request.timestamp);
		let signature = codec::decode_signature_hex(&request.signature)
			.map_err(|_| RegistryError::InvalidSignature)?;
		let recovered = codec::recover_personal_signer(&message, &signature)
			.map_err(|_| RegistryError::InvalidSignature)?;
		if recovered != request.address {
			return Err(RegistryError::InvalidSignature);
		}

		ssrf::validate_endpoint(&request.endpoint, self.config.dev_mode).await?;

		if let Some(chain) = self.chains.get(&chain_id) {
			let record = chain
				.solver_record(request.address)
				.await
				.map_err(|e| RegistryError::Chain(e.to_string()))?;
			if !record.registered || record.total_bond < U256::from(MIN_BOND) {
				return Err(RegistryError::InsufficientOnChainBond);
			}
		}

		let mut tables = self.tables.write().await;
		let table = tables.entry(chain_id).or_default();

		let entry = if let Some(existing) =
			table.iter_mut().find(|s| s.address == request.address)
		{
			// Idempotent upsert: endpoint and name update in place
			existing.endpoint = request.endpoint.clone();
			existing.name = request.name.clone();
			existing.registered_at = request.timestamp;
			existing.active = true;
			existing.clone()
		} else {
			if table.len() >= self.config.max_solvers_per_chain {
				return Err(RegistryError::CapacityExceeded(chain_id));
			}
			let solver = RegisteredSolver {
				address: request.address,
				chain_id,
				endpoint: request.endpoint.clone(),
				name: request.name.clone(),
				registered_at: request.timestamp,
				active: true,
			};
			table.push(solver.clone());
			solver
		};

		let snapshot = serde_json::to_vec(&*table)
			.map_err(|e| StorageError::Backend(e.to_string()))?;
		drop(tables);
		self.storage
			.set_bytes(&snapshot_key(chain_id), snapshot)
			.await?;

		info!(chain = %chain_id, solver = %entry.address, endpoint = %entry.endpoint, "solver registered");
		Ok(entry)
	}

	pub async fn unregister(
		&self,
		chain_id: ChainId,
		address: Address,
		request: &UnregisterSolverRequest,
		now_ms: u64,
	) -> Result<(), RegistryError> {
		check_timestamp(request.timestamp, now_ms)?;

		let message = codec::unregistration_message(address, request.timestamp);
		let signature = codec::decode_signature_hex(&request.signature)
			.map_err(|_| RegistryError::InvalidSignature)?;
		let recovered = codec::recover_personal_signer(&message, &signature)
			.map_err(|_| RegistryError::InvalidSignature)?;
		if recovered != address {
			return Err(RegistryError::InvalidSignature);
		}

		let mut tables = self.tables.write().await;
		let table = tables
			.get_mut(&chain_id)
			.ok_or(RegistryError::NotRegistered(chain_id))?;
		let before = table.len();
		table.retain(|s| s.address != address);
		if table.len() == before {
			return Err(RegistryError::NotRegistered(chain_id));
		}

		let snapshot = serde_json::to_vec(&*table)
			.map_err(|e| StorageError::Backend(e.to_string()))?;
		drop(tables);
		self.storage
			.set_bytes(&snapshot_key(chain_id), snapshot)
			.await?;

		info!(chain = %chain_id, solver = %address, "solver unregistered");
		Ok(())
	}

	/// Re-run endpoint validation for a solver just before dialing it.
	pub async fn revalidate_endpoint(&self, solver: &RegisteredSolver) -> bool {
		match ssrf::validate_endpoint(&solver.endpoint, self.config.dev_mode).await {
			Ok(()) => true,
			Err(e) => {
				warn!(solver = %solver.address, error = %e, "endpoint failed revalidation");
				false
			}
		}
	}
}

fn snapshot_key(chain_id: ChainId) -> String {
	// Address keys inside the snapshot serialize as lowercase hex
	format!("registry/{}", chain_id)
}

fn check_timestamp(timestamp_ms: u64, now_ms: u64) -> Result<(), RegistryError> {
	if now_ms.abs_diff(timestamp_ms) > AUTH_WINDOW_MS {
		return Err(RegistryError::StaleTimestamp);
	}
	Ok(())
}
