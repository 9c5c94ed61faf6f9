//! In-process settlement chain for tests and local development.
//!
//! Wraps an engine behind a mutex with a block counter and a log of
//! emitted events. Every successful transaction mines one block and stamps
//! the events it produced; failed transactions mine nothing, like a
//! reverted call.

use crate::{ChainError, ChainResult, SettlementChain};
use async_trait::async_trait;
use firmswap_engine::{InMemoryBank, SettlementEngine, TokenBank};
use firmswap_types::{
	Address, BlockNumber, CallEnv, ChainId, EngineError, EngineLog, OrderId, OrderRecord,
	SolverRecord, Timestamp, B256, U256,
};
use std::sync::{Arc, Mutex};
use tracing::debug;

struct DevChainState {
	engine: SettlementEngine<InMemoryBank>,
	block_number: BlockNumber,
	timestamp: Timestamp,
	logs: Vec<EngineLog>,
}

/// Shared in-process chain; clones share state but may bind different
/// sender accounts.
#[derive(Clone)]
pub struct DevChain {
	state: Arc<Mutex<DevChainState>>,
	account: Address,
}

impl DevChain {
	pub fn new(engine: SettlementEngine<InMemoryBank>, genesis_timestamp: Timestamp) -> Self {
		Self {
			state: Arc::new(Mutex::new(DevChainState {
				engine,
				block_number: 1,
				timestamp: genesis_timestamp,
				logs: Vec::new(),
			})),
			account: Address::ZERO,
		}
	}

	/// A handle over the same chain submitting as `account`.
	pub fn with_account(&self, account: Address) -> Self {
		Self {
			state: self.state.clone(),
			account,
		}
	}

	/// Run one transaction against the engine as `caller`. Success mines a
	/// block and records the emitted events.
	pub fn execute_as<T>(
		&self,
		caller: Address,
		f: impl FnOnce(&mut SettlementEngine<InMemoryBank>, CallEnv) -> Result<T, EngineError>,
	) -> Result<T, EngineError> {
		let mut state = self.lock();
		let env = CallEnv::new(caller, state.timestamp);
		let result = f(&mut state.engine, env)?;

		state.block_number += 1;
		let block_number = state.block_number;
		let events = state.engine.drain_events();
		debug!(block_number, count = events.len(), "mined dev-chain block");
		state
			.logs
			.extend(events.into_iter().map(|event| EngineLog {
				block_number,
				event,
			}));
		Ok(result)
	}

	/// Inspect or seed chain state (token balances, approvals) directly.
	pub fn with_engine<T>(&self, f: impl FnOnce(&mut SettlementEngine<InMemoryBank>) -> T) -> T {
		f(&mut self.lock().engine)
	}

	pub fn advance_time(&self, seconds: u64) {
		self.lock().timestamp += seconds;
	}

	pub fn set_timestamp(&self, timestamp: Timestamp) {
		self.lock().timestamp = timestamp;
	}

	fn lock(&self) -> std::sync::MutexGuard<'_, DevChainState> {
		self.state.lock().unwrap_or_else(|e| e.into_inner())
	}
}

#[async_trait]
impl SettlementChain for DevChain {
	fn chain_id(&self) -> ChainId {
		self.lock().engine.chain_id()
	}

	fn engine_address(&self) -> Address {
		self.lock().engine.address()
	}

	fn proxy_code_hash(&self) -> B256 {
		self.lock().engine.proxy_code_hash()
	}

	fn account(&self) -> Address {
		self.account
	}

	async fn block_number(&self) -> ChainResult<BlockNumber> {
		Ok(self.lock().block_number)
	}

	async fn timestamp(&self) -> ChainResult<Timestamp> {
		Ok(self.lock().timestamp)
	}

	async fn logs(&self, from: BlockNumber, to: BlockNumber) -> ChainResult<Vec<EngineLog>> {
		Ok(self
			.lock()
			.logs
			.iter()
			.filter(|log| log.block_number >= from && log.block_number <= to)
			.cloned()
			.collect())
	}

	async fn order(&self, order_id: OrderId) -> ChainResult<Option<OrderRecord>> {
		Ok(self.lock().engine.order(order_id).cloned())
	}

	async fn solver_record(&self, solver: Address) -> ChainResult<SolverRecord> {
		Ok(self.lock().engine.solver(solver))
	}

	async fn is_nonce_used(&self, solver: Address, nonce: U256) -> ChainResult<bool> {
		Ok(self.lock().engine.is_nonce_used(solver, nonce))
	}

	async fn balance_of(&self, token: Address, holder: Address) -> ChainResult<U256> {
		Ok(self.lock().engine.bank().balance_of(token, holder))
	}

	async fn allowance(
		&self,
		token: Address,
		owner: Address,
		spender: Address,
	) -> ChainResult<U256> {
		Ok(self.lock().engine.bank().allowance(token, owner, spender))
	}

	async fn approve(&self, token: Address, spender: Address, amount: U256) -> ChainResult<()> {
		let account = self.account;
		let mut state = self.lock();
		state.engine.bank_mut().approve(token, account, spender, amount);
		state.block_number += 1;
		Ok(())
	}

	async fn submit_fill(&self, order_id: OrderId) -> ChainResult<()> {
		self.execute_as(self.account, |engine, env| engine.fill(order_id, env))
			.map_err(ChainError::Engine)
	}
}
