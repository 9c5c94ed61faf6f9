//! Relays engine logs into the WebSocket broadcast channel.
//!
//! One task per chain tails Deposited/Settled/Refunded events between the
//! last-seen block and the head and fans them out to `/v1/ws` subscribers.

use firmswap_chains::SettlementChain;
use firmswap_types::api::WsEvent;
use firmswap_types::{BlockNumber, ChainId, EngineEvent};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{error, info};

pub struct EventRelay {
	chain_id: ChainId,
	chain: Arc<dyn SettlementChain>,
	events: broadcast::Sender<WsEvent>,
	poll_interval: Duration,
	last_block: Option<BlockNumber>,
}

impl EventRelay {
	pub fn new(
		chain_id: ChainId,
		chain: Arc<dyn SettlementChain>,
		events: broadcast::Sender<WsEvent>,
		poll_interval: Duration,
	) -> Self {
		Self {
			chain_id,
			chain,
			events,
			poll_interval,
			last_block: None,
		}
	}

	pub async fn run(mut self) {
		info!(chain = %self.chain_id, "event relay started");
		let mut ticker = interval(self.poll_interval);
		loop {
			ticker.tick().await;
			if let Err(e) = self.poll_once().await {
				error!(chain = %self.chain_id, error = %e, "event relay poll failed");
			}
		}
	}

	pub async fn poll_once(&mut self) -> Result<(), firmswap_chains::ChainError> {
		let head = self.chain.block_number().await?;
		let from = match self.last_block {
			Some(last) => last + 1,
			None => head,
		};
		if from > head {
			return Ok(());
		}

		for log in self.chain.logs(from, head).await? {
			let event = match log.event {
				EngineEvent::Deposited {
					order_id,
					user,
					solver,
					..
				} => WsEvent::Deposited {
					chain_id: self.chain_id,
					order_id,
					user,
					solver,
				},
				EngineEvent::Settled {
					order_id,
					user,
					solver,
				} => WsEvent::Settled {
					chain_id: self.chain_id,
					order_id,
					user,
					solver,
				},
				EngineEvent::Refunded {
					order_id,
					user,
					bond_slashed,
					..
				} => WsEvent::Refunded {
					chain_id: self.chain_id,
					order_id,
					user,
					bond_slashed,
				},
				_ => continue,
			};
			// Send fails only when nobody is subscribed; that is fine
			let _ = self.events.send(event);
		}

		self.last_block = Some(head);
		Ok(())
	}
}

/// Spawn one relay task per chain.
pub fn spawn_relays(
	chains: &HashMap<ChainId, Arc<dyn SettlementChain>>,
	events: broadcast::Sender<WsEvent>,
	poll_interval: Duration,
) -> Vec<JoinHandle<()>> {
	chains
		.iter()
		.map(|(chain_id, chain)| {
			let relay = EventRelay::new(*chain_id, chain.clone(), events.clone(), poll_interval);
			tokio::spawn(relay.run())
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_signer::SignerSync;
	use alloy_signer_local::PrivateKeySigner;
	use firmswap_chains::DevChain;
	use firmswap_codec as codec;
	use firmswap_engine::{InMemoryBank, SettlementEngine, TokenBank};
	use firmswap_types::{Address, OrderType, Quote, U256};

	const ENGINE_ADDR: Address = Address::new([0xee; 20]);
	const BOND_TOKEN: Address = Address::new([0xb0; 20]);
	const PERMIT2: Address = Address::new([0x22; 20]);
	const WETH: Address = Address::new([0x11; 20]);
	const USDX: Address = Address::new([0x12; 20]);
	const USER: Address = Address::new([0xaa; 20]);
	const NOW: u64 = 1_700_000_000;

	fn usd(n: u64) -> U256 {
		U256::from(n) * U256::from(1_000_000u64)
	}

	#[tokio::test]
	async fn relays_lifecycle_events_once_each() {
		let key = PrivateKeySigner::random();
		let solver = key.address();

		let mut bank = InMemoryBank::new();
		bank.mint(WETH, USER, U256::from(10u64).pow(U256::from(24)));
		bank.mint(USDX, solver, usd(1_000));
		bank.mint(BOND_TOKEN, solver, usd(10_000));
		bank.approve(WETH, USER, ENGINE_ADDR, U256::MAX);
		bank.approve(USDX, solver, ENGINE_ADDR, U256::MAX);
		bank.approve(BOND_TOKEN, solver, ENGINE_ADDR, U256::MAX);

		let engine = SettlementEngine::new(ChainId(1), ENGINE_ADDR, BOND_TOKEN, PERMIT2, bank);
		let chain = DevChain::new(engine, NOW);
		chain
			.execute_as(solver, |engine, env| engine.register_solver(usd(2_000), env))
			.unwrap();

		let (tx, mut rx) = broadcast::channel(64);
		let mut relay = EventRelay::new(
			ChainId(1),
			Arc::new(chain.clone()),
			tx,
			Duration::from_millis(10),
		);
		// Prime the cursor at the current head
		relay.poll_once().await.unwrap();

		let quote = Quote {
			solver,
			user: USER,
			input_token: WETH,
			input_amount: U256::from(10u64).pow(U256::from(18)),
			output_token: USDX,
			output_amount: usd(200),
			order_type: OrderType::ExactOutput,
			output_chain_id: ChainId(1),
			deposit_deadline: (NOW + 300) as u32,
			fill_deadline: (NOW + 420) as u32,
			nonce: U256::ZERO,
		};
		let domain = codec::quote_domain(ChainId(1), ENGINE_ADDR);
		let sig = key
			.sign_hash_sync(&codec::quote_digest(&quote, &domain))
			.unwrap()
			.as_bytes()
			.to_vec();
		let order_id = chain
			.execute_as(USER, |engine, env| engine.deposit(&quote, &sig, env))
			.unwrap();
		chain
			.execute_as(solver, |engine, env| engine.fill(order_id, env))
			.unwrap();

		relay.poll_once().await.unwrap();

		let first = rx.try_recv().unwrap();
		assert!(matches!(first, WsEvent::Deposited { .. }));
		let second = rx.try_recv().unwrap();
		assert!(matches!(second, WsEvent::Settled { .. }));
		assert!(rx.try_recv().is_err());

		// A re-poll with no new blocks emits nothing
		relay.poll_once().await.unwrap();
		assert!(rx.try_recv().is_err());
	}
}
