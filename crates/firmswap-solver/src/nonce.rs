//! Monotonic nonce allocation, single writer per solver instance.
//!
//! Startup scans the chain for the first unused nonce, bounded by a
//! window; heavy-volume operators should persist the last-used nonce and
//! pass a zero window instead of rescanning.

use crate::SolverError;
use firmswap_chains::SettlementChain;
use firmswap_types::{Address, U256};
use tokio::sync::Mutex;
use tracing::info;

/// Default bound on the startup scan.
pub const DEFAULT_SCAN_WINDOW: u64 = 1_000;

pub struct NonceAllocator {
	next: Mutex<U256>,
}

impl NonceAllocator {
	/// Start allocating from a known nonce (e.g. restored from storage).
	pub fn starting_at(next: U256) -> Self {
		Self {
			next: Mutex::new(next),
		}
	}

	/// Scan `[0, scan_window)` on chain for the first unused nonce; if the
	/// whole window is consumed, continue after it.
	pub async fn initialize(
		chain: &dyn SettlementChain,
		solver: Address,
		scan_window: u64,
	) -> Result<Self, SolverError> {
		let mut next = U256::from(scan_window);
		for candidate in 0..scan_window {
			if !chain.is_nonce_used(solver, U256::from(candidate)).await? {
				next = U256::from(candidate);
				break;
			}
		}
		info!(%solver, next = %next, "nonce allocator initialized");
		Ok(Self::starting_at(next))
	}

	/// Allocate the next nonce. The mutex makes allocation single-writer;
	/// two concurrent quotes can never share a nonce.
	pub async fn next(&self) -> U256 {
		let mut guard = self.next.lock().await;
		let nonce = *guard;
		*guard += U256::from(1u8);
		nonce
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn allocation_is_monotonic() {
		let allocator = NonceAllocator::starting_at(U256::from(7u64));
		assert_eq!(allocator.next().await, U256::from(7u64));
		assert_eq!(allocator.next().await, U256::from(8u64));
		assert_eq!(allocator.next().await, U256::from(9u64));
	}

	#[tokio::test]
	async fn concurrent_allocations_never_collide() {
		let allocator = std::sync::Arc::new(NonceAllocator::starting_at(U256::ZERO));
		let mut handles = Vec::new();
		for _ in 0..8 {
			let allocator = allocator.clone();
			handles.push(tokio::spawn(async move {
				let mut got = Vec::new();
				for _ in 0..25 {
					got.push(allocator.next().await);
				}
				got
			}));
		}

		let mut all = Vec::new();
		for handle in handles {
			all.extend(handle.await.unwrap());
		}
		all.sort();
		all.dedup();
		assert_eq!(all.len(), 200);
	}
}
