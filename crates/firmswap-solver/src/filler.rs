//! Strictly serial fill execution.
//!
//! One in-flight fill per solver address at any time: concurrent
//! transactions from the same sender contend for the same account nonce.
//! The queue head runs to confirmation before the next job starts.

use crate::SolverError;
use firmswap_chains::SettlementChain;
use firmswap_types::{Address, OrderId, OrderState, U256};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct FillJob {
	pub order_id: OrderId,
	pub output_token: Address,
	pub output_amount: U256,
	pub fill_deadline: u32,
}

pub struct Filler {
	chain: Arc<dyn SettlementChain>,
	jobs: mpsc::Receiver<FillJob>,
}

impl Filler {
	pub fn new(chain: Arc<dyn SettlementChain>, jobs: mpsc::Receiver<FillJob>) -> Self {
		Self { chain, jobs }
	}

	/// Drain the queue until every sender is dropped. Job failures are
	/// logged and do not stop the queue.
	pub async fn run(mut self) {
		info!(account = %self.chain.account(), "filler started");
		while let Some(job) = self.jobs.recv().await {
			if let Err(e) = self.process(&job).await {
				warn!(order_id = %job.order_id, error = %e, "fill failed");
			}
		}
		info!("fill queue drained, filler stopping");
	}

	/// Execute one job to confirmation.
	pub async fn process(&self, job: &FillJob) -> Result<(), SolverError> {
		// The order may have settled, refunded or expired since enqueue
		let now = self.chain.timestamp().await?;
		if now > job.fill_deadline as u64 {
			debug!(order_id = %job.order_id, "fill deadline passed, skipping");
			return Ok(());
		}
		match self.chain.order(job.order_id).await? {
			Some(order) if order.state == OrderState::Deposited => {}
			_ => {
				debug!(order_id = %job.order_id, "order no longer fillable, skipping");
				return Ok(());
			}
		}

		let account = self.chain.account();
		let engine = self.chain.engine_address();

		let balance = self.chain.balance_of(job.output_token, account).await?;
		if balance < job.output_amount {
			return Err(SolverError::Fill(format!(
				"output balance {} below required {}",
				balance, job.output_amount
			)));
		}

		let allowance = self
			.chain
			.allowance(job.output_token, account, engine)
			.await?;
		if allowance < job.output_amount {
			debug!(token = %job.output_token, "setting engine allowance");
			self.chain
				.approve(job.output_token, engine, U256::MAX)
				.await?;
		}

		self.chain.submit_fill(job.order_id).await?;
		info!(order_id = %job.order_id, "order filled");
		Ok(())
	}
}
