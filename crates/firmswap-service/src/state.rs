//! Shared application state for the HTTP surface.

use crate::rate_limit::RateLimiter;
use firmswap_aggregator::Aggregator;
use firmswap_chains::SettlementChain;
use firmswap_registry::SolverRegistry;
use firmswap_solver::SolverCore;
use firmswap_types::api::WsEvent;
use firmswap_types::ChainId;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::broadcast;

#[derive(Clone)]
pub struct AppState {
	pub aggregator: Arc<Aggregator>,
	pub registry: Arc<SolverRegistry>,
	pub chains: Arc<HashMap<ChainId, Arc<dyn SettlementChain>>>,
	pub limiter: Arc<RateLimiter>,
	pub events: broadcast::Sender<WsEvent>,
	/// Present when this process also serves quotes as the reference
	/// solver.
	pub solver: Option<Arc<SolverCore>>,
}

impl AppState {
	pub fn chain(&self, chain_id: ChainId) -> Option<&Arc<dyn SettlementChain>> {
		self.chains.get(&chain_id)
	}
}

/// Server clock in Unix seconds.
pub fn now_secs() -> u64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.unwrap_or_default()
		.as_secs()
}

/// Server clock in Unix milliseconds.
pub fn now_ms() -> u64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.unwrap_or_default()
		.as_millis() as u64
}
