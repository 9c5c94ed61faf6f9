//! Events emitted by the settlement engine.
//!
//! The `Open` variant carries the resolved cross-chain-intent view of a new
//! order (maxSpent / minReceived / fill instructions), emitted alongside the
//! protocol's own event whenever an order opens.

use crate::common::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineEvent {
	Deposited {
		order_id: OrderId,
		user: Address,
		solver: Address,
		input_token: Address,
		input_amount: U256,
		output_token: Address,
		output_amount: U256,
		fill_deadline: u32,
	},
	Settled {
		order_id: OrderId,
		user: Address,
		solver: Address,
	},
	Refunded {
		order_id: OrderId,
		user: Address,
		input_amount: U256,
		bond_slashed: U256,
	},
	TokensRecovered {
		order_id: OrderId,
		token: Address,
		to: Address,
		amount: U256,
	},
	ExcessDeposit {
		user: Address,
		token: Address,
		amount: U256,
	},
	ExcessWithdrawn {
		user: Address,
		token: Address,
		amount: U256,
	},
	SolverRegistered {
		solver: Address,
		bond: U256,
	},
	BondAdded {
		solver: Address,
		amount: U256,
	},
	UnstakeRequested {
		solver: Address,
		amount: U256,
		unlock_time: Timestamp,
	},
	UnstakeCancelled {
		solver: Address,
	},
	UnstakeExecuted {
		solver: Address,
		amount: U256,
	},
	NonceCancelled {
		solver: Address,
		word_index: U256,
		mask: U256,
	},
	Open(ResolvedSwapOrder),
}

/// One leg of a resolved order (token, amount, recipient, chain).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedOutput {
	pub token: Address,
	pub amount: U256,
	pub recipient: Address,
	pub chain_id: ChainId,
}

/// Instruction telling a filler where and how to deliver the output leg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapFillInstruction {
	pub destination_chain_id: ChainId,
	pub destination_settler: Address,
	pub order_id: OrderId,
}

/// Resolved view of a FirmSwap order in the cross-chain intent shape:
/// `max_spent` points at (inputToken, solver, chainId), `min_received` at
/// (outputToken, user, outputChainId). Observational only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedSwapOrder {
	pub order_id: OrderId,
	pub user: Address,
	pub origin_chain_id: ChainId,
	pub open_deadline: u32,
	pub fill_deadline: u32,
	pub max_spent: Vec<ResolvedOutput>,
	pub min_received: Vec<ResolvedOutput>,
	pub fill_instructions: Vec<SwapFillInstruction>,
}

/// An engine event stamped with the block that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineLog {
	pub block_number: BlockNumber,
	pub event: EngineEvent,
}
