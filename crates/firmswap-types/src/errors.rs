//! Error taxonomy for the settlement engine.
//!
//! Every engine entry point either completes or fails with one of these
//! kinds and no partial state change.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
	// Validation
	#[error("invalid quote")]
	InvalidQuote,

	#[error("invalid signature")]
	InvalidSignature,

	#[error("quote expired")]
	QuoteExpired,

	#[error("fill deadline not after deposit deadline")]
	FillDeadlineBeforeDeposit,

	#[error("quote targets a different chain")]
	WrongChain,

	#[error("output amount below protocol minimum")]
	BelowMinimumOrder,

	// Replay / state
	#[error("nonce already used")]
	NonceAlreadyUsed,

	#[error("order already exists")]
	OrderAlreadyExists,

	#[error("order not found")]
	OrderNotFound,

	#[error("order not in deposited state")]
	OrderNotDeposited,

	#[error("order fill deadline has not passed")]
	OrderNotExpired,

	// Authorization
	#[error("caller is not the order's solver")]
	NotSolver,

	#[error("solver not registered")]
	SolverNotRegistered,

	#[error("solver already registered")]
	SolverAlreadyRegistered,

	// Economic
	#[error("insufficient unreserved bond")]
	InsufficientBond,

	#[error("bond below protocol minimum")]
	BelowMinimumBond,

	#[error("deposit address balance below required input")]
	InsufficientDeposit,

	#[error("no excess balance for token")]
	NoExcessBalance,

	// Unstake lifecycle
	#[error("unstake timelock has not elapsed")]
	UnstakeNotReady,

	#[error("no pending unstake")]
	NoPendingUnstake,

	#[error("an unstake is already pending")]
	PendingUnstakeExists,

	// Token movement (insufficient balance or allowance on a pull)
	#[error("token transfer failed: {0}")]
	TokenTransfer(String),
}
