//! Solver bond records (on-chain) and registry entries (off-chain).

use crate::common::*;
use serde::{Deserialize, Serialize};

/// Per-solver bond accounting held by the settlement engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolverRecord {
	pub total_bond: U256,
	pub reserved_bond: U256,
	pub unstake_amount: U256,
	pub unstake_unlock_time: Timestamp,
	pub registered: bool,
}

impl SolverRecord {
	pub fn available_bond(&self) -> U256 {
		self.total_bond.saturating_sub(self.reserved_bond)
	}

	pub fn has_pending_unstake(&self) -> bool {
		!self.unstake_amount.is_zero()
	}
}

/// Off-chain registry entry for a solver endpoint, scoped to one chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredSolver {
	pub address: Address,
	pub chain_id: ChainId,
	pub endpoint: String,
	pub name: String,
	/// Registration time in Unix milliseconds.
	pub registered_at: u64,
	pub active: bool,
}
