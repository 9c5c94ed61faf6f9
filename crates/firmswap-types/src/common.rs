//! Common primitive types used throughout the workspace.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// Re-export the ethereum primitives everything is built on
pub use alloy_primitives::{keccak256, Address, B256, U256};

/// Block number
pub type BlockNumber = u64;

/// Timestamp (Unix seconds)
pub type Timestamp = u64;

/// 32-byte order identifier, derived from (quote hash, solver signature)
pub type OrderId = B256;

/// Chain identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(pub u64);

impl ChainId {
	pub const ETHEREUM: Self = Self(1);
	pub const ARBITRUM: Self = Self(42161);
	pub const BASE: Self = Self(8453);
}

impl fmt::Display for ChainId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl FromStr for ChainId {
	type Err = std::num::ParseIntError;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		Ok(ChainId(s.parse()?))
	}
}

/// Transaction context for a settlement engine entry point. Mirrors the
/// `msg.sender` / `block.timestamp` pair of transaction scope.
#[derive(Debug, Clone, Copy)]
pub struct CallEnv {
	pub caller: Address,
	pub timestamp: Timestamp,
}

impl CallEnv {
	pub fn new(caller: Address, timestamp: Timestamp) -> Self {
		Self { caller, timestamp }
	}
}
