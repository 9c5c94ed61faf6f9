//! Chain access for the off-chain components.
//!
//! [`SettlementChain`] is the narrow read/submit surface the registry,
//! aggregator, solver and service need. [`DevChain`] implements it over an
//! in-process [`firmswap_engine::SettlementEngine`] with a block clock —
//! the test and local-development backend. Production deployments
//! implement the same trait over RPC.

pub mod dev;

pub use dev::DevChain;

use async_trait::async_trait;
use firmswap_types::{
	Address, BlockNumber, ChainId, EngineError, EngineLog, OrderId, OrderRecord, SolverRecord,
	Timestamp, B256, U256,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChainError {
	#[error("rpc error: {0}")]
	Rpc(String),

	#[error(transparent)]
	Engine(#[from] EngineError),
}

pub type ChainResult<T> = Result<T, ChainError>;

#[async_trait]
pub trait SettlementChain: Send + Sync {
	fn chain_id(&self) -> ChainId;

	/// The settlement engine contract on this chain.
	fn engine_address(&self) -> Address;

	/// Hash of the deposit proxy's creation code, for independent
	/// deposit-address derivation.
	fn proxy_code_hash(&self) -> B256;

	/// The account this handle submits transactions as.
	fn account(&self) -> Address;

	async fn block_number(&self) -> ChainResult<BlockNumber>;

	async fn timestamp(&self) -> ChainResult<Timestamp>;

	/// Engine logs in the inclusive block range.
	async fn logs(&self, from: BlockNumber, to: BlockNumber) -> ChainResult<Vec<EngineLog>>;

	async fn order(&self, order_id: OrderId) -> ChainResult<Option<OrderRecord>>;

	async fn solver_record(&self, solver: Address) -> ChainResult<SolverRecord>;

	async fn is_nonce_used(&self, solver: Address, nonce: U256) -> ChainResult<bool>;

	async fn balance_of(&self, token: Address, holder: Address) -> ChainResult<U256>;

	async fn allowance(
		&self,
		token: Address,
		owner: Address,
		spender: Address,
	) -> ChainResult<U256>;

	/// Approve `spender` for `amount` of `token`, as the bound account.
	async fn approve(&self, token: Address, spender: Address, amount: U256) -> ChainResult<()>;

	/// Submit a fill transaction for `order_id` as the bound account and
	/// wait for inclusion.
	async fn submit_fill(&self, order_id: OrderId) -> ChainResult<()>;
}
