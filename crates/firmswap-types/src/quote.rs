//! The firm quote: a solver's signed, fully-priced commitment.

use crate::common::*;
use crate::errors::EngineError;
use serde::{Deserialize, Serialize};

/// Smallest acceptable output amount, in the output token's smallest unit.
pub const MIN_ORDER: u64 = 1_000_000;

/// Which side of the trade the quoted amount fixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderType {
	#[serde(rename = "EXACT_INPUT")]
	ExactInput,
	#[serde(rename = "EXACT_OUTPUT")]
	ExactOutput,
}

impl OrderType {
	/// Wire encoding used inside the EIP-712 struct (`uint8 orderType`).
	pub fn as_u8(self) -> u8 {
		match self {
			OrderType::ExactInput => 0,
			OrderType::ExactOutput => 1,
		}
	}
}

/// A signed price commitment. Immutable once signed; identified off-chain
/// by its EIP-712 struct hash and instantiated on-chain as an [`crate::order::OrderRecord`]
/// only through a settlement action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
	pub solver: Address,
	pub user: Address,
	pub input_token: Address,
	pub input_amount: U256,
	pub output_token: Address,
	pub output_amount: U256,
	pub order_type: OrderType,
	pub output_chain_id: ChainId,
	pub deposit_deadline: u32,
	pub fill_deadline: u32,
	pub nonce: U256,
}

impl Quote {
	/// Field-level invariants that hold for every valid quote, independent
	/// of clock and chain: positive amounts, minimum order size, and a fill
	/// window that opens after the deposit window closes.
	pub fn check_fields(&self) -> Result<(), EngineError> {
		if self.input_amount.is_zero() || self.output_amount.is_zero() {
			return Err(EngineError::InvalidQuote);
		}
		if self.output_amount < U256::from(MIN_ORDER) {
			return Err(EngineError::BelowMinimumOrder);
		}
		if self.fill_deadline <= self.deposit_deadline {
			return Err(EngineError::FillDeadlineBeforeDeposit);
		}
		Ok(())
	}

	/// Full validation against a chain and clock: field invariants, the
	/// output-chain binding, and (unless `skip_deposit_deadline`, used by
	/// the refund paths) the deposit deadline.
	pub fn check(
		&self,
		chain_id: ChainId,
		now: Timestamp,
		skip_deposit_deadline: bool,
	) -> Result<(), EngineError> {
		self.check_fields()?;
		if self.output_chain_id != chain_id {
			return Err(EngineError::WrongChain);
		}
		if !skip_deposit_deadline && now > self.deposit_deadline as Timestamp {
			return Err(EngineError::QuoteExpired);
		}
		Ok(())
	}
}
