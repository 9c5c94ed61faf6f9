//! Deposit monitoring: poll engine logs between the last-seen block and
//! the head, enqueue fill jobs for this solver's live orders.

use crate::filler::FillJob;
use firmswap_chains::SettlementChain;
use firmswap_types::{Address, BlockNumber, EngineEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::{debug, error, info};

#[derive(Debug, Clone)]
pub struct WatcherConfig {
	pub poll_interval: Duration,
	/// First block to scan; defaults to the head at startup.
	pub start_block: Option<BlockNumber>,
}

impl Default for WatcherConfig {
	fn default() -> Self {
		Self {
			poll_interval: Duration::from_secs(2),
			start_block: None,
		}
	}
}

pub struct DepositWatcher {
	chain: Arc<dyn SettlementChain>,
	solver: Address,
	config: WatcherConfig,
	jobs: mpsc::Sender<FillJob>,
	last_block: Option<BlockNumber>,
}

impl DepositWatcher {
	pub fn new(
		chain: Arc<dyn SettlementChain>,
		solver: Address,
		config: WatcherConfig,
		jobs: mpsc::Sender<FillJob>,
	) -> Self {
		let last_block = config.start_block.map(|b| b.saturating_sub(1));
		Self {
			chain,
			solver,
			config,
			jobs,
			last_block,
		}
	}

	/// Poll until the job channel closes.
	pub async fn run(mut self) {
		info!(solver = %self.solver, "deposit watcher started");
		let mut ticker = interval(self.config.poll_interval);
		loop {
			ticker.tick().await;
			if self.jobs.is_closed() {
				info!("fill queue closed, stopping watcher");
				return;
			}
			if let Err(e) = self.poll_once().await {
				error!(error = %e, "deposit poll failed");
			}
		}
	}

	/// One scan from the block after the last seen one up to the head.
	pub async fn poll_once(&mut self) -> Result<(), firmswap_chains::ChainError> {
		let head = self.chain.block_number().await?;
		let from = match self.last_block {
			Some(last) => last + 1,
			None => head,
		};
		if from > head {
			return Ok(());
		}

		let now = self.chain.timestamp().await?;
		let logs = self.chain.logs(from, head).await?;
		for log in logs {
			let EngineEvent::Deposited {
				order_id,
				solver,
				output_token,
				output_amount,
				fill_deadline,
				..
			} = log.event
			else {
				continue;
			};
			if solver != self.solver {
				continue;
			}
			if fill_deadline as u64 <= now {
				debug!(%order_id, "skipping deposit past its fill deadline");
				continue;
			}
			let job = FillJob {
				order_id,
				output_token,
				output_amount,
				fill_deadline,
			};
			if self.jobs.send(job).await.is_err() {
				return Ok(());
			}
			debug!(%order_id, "enqueued fill job");
		}

		self.last_block = Some(head);
		Ok(())
	}
}
