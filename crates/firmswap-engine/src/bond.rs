//! Bond accounting: per-solver (total, reserved) with a 5% per-order
//! reservation and a timelocked unstake.
//!
//! Pure bookkeeping; the engine performs the matching token transfers.

use firmswap_types::{Address, EngineError, Result, SolverRecord, Timestamp, U256};
use std::collections::HashMap;

/// Portion of an order's output amount reserved against the solver's bond.
pub const RESERVATION_BPS: u64 = 500;
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Minimum bond, in the bond token's smallest unit (1000 USDC at 6 decimals).
pub const MIN_BOND: u64 = 1_000_000_000;

/// Unstake timelock in seconds.
pub const UNSTAKE_DELAY: u64 = 7 * 24 * 60 * 60;

/// Bond held against a single order.
pub fn reserve_for(output_amount: U256) -> U256 {
	output_amount * U256::from(RESERVATION_BPS) / U256::from(BPS_DENOMINATOR)
}

#[derive(Debug, Default, Clone)]
pub struct BondLedger {
	records: HashMap<Address, SolverRecord>,
}

impl BondLedger {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn get(&self, solver: Address) -> SolverRecord {
		self.records.get(&solver).cloned().unwrap_or_default()
	}

	pub fn is_registered(&self, solver: Address) -> bool {
		self.records.get(&solver).is_some_and(|r| r.registered)
	}

	pub fn available(&self, solver: Address) -> U256 {
		self.get(solver).available_bond()
	}

	pub fn register(&mut self, solver: Address, amount: U256) -> Result<()> {
		if self.is_registered(solver) {
			return Err(EngineError::SolverAlreadyRegistered);
		}
		if amount < U256::from(MIN_BOND) {
			return Err(EngineError::BelowMinimumBond);
		}
		let record = self.records.entry(solver).or_default();
		record.registered = true;
		record.total_bond += amount;
		Ok(())
	}

	pub fn add(&mut self, solver: Address, amount: U256) -> Result<()> {
		let record = self
			.records
			.get_mut(&solver)
			.filter(|r| r.registered)
			.ok_or(EngineError::SolverNotRegistered)?;
		record.total_bond += amount;
		Ok(())
	}

	/// Read-side check used by the atomic settle path.
	pub fn check_reserve(&self, solver: Address, output_amount: U256) -> Result<()> {
		let record = self.get(solver);
		if record.available_bond() < reserve_for(output_amount) {
			return Err(EngineError::InsufficientBond);
		}
		Ok(())
	}

	/// Write-side reservation used by the deposit path, held until fill or
	/// refund.
	pub fn reserve(&mut self, solver: Address, output_amount: U256) -> Result<()> {
		self.check_reserve(solver, output_amount)?;
		let record = self.records.entry(solver).or_default();
		record.reserved_bond += reserve_for(output_amount);
		Ok(())
	}

	pub fn release(&mut self, solver: Address, output_amount: U256) {
		if let Some(record) = self.records.get_mut(&solver) {
			record.reserved_bond = record
				.reserved_bond
				.saturating_sub(reserve_for(output_amount));
		}
	}

	/// Slash up to the reservation, clamped at the solver's total bond.
	/// Returns the slashed amount.
	pub fn slash(&mut self, solver: Address, output_amount: U256) -> U256 {
		let record = self.records.entry(solver).or_default();
		let target = reserve_for(output_amount);
		let slashed = target.min(record.total_bond);
		record.total_bond -= slashed;
		record.reserved_bond = record.reserved_bond.saturating_sub(target);
		slashed
	}

	pub fn request_unstake(&mut self, solver: Address, amount: U256, now: Timestamp) -> Result<Timestamp> {
		let record = self
			.records
			.get_mut(&solver)
			.filter(|r| r.registered)
			.ok_or(EngineError::SolverNotRegistered)?;
		if record.has_pending_unstake() {
			return Err(EngineError::PendingUnstakeExists);
		}
		if record.total_bond.saturating_sub(record.reserved_bond) < amount {
			return Err(EngineError::InsufficientBond);
		}
		if record.total_bond.saturating_sub(amount) < U256::from(MIN_BOND) {
			return Err(EngineError::BelowMinimumBond);
		}
		record.unstake_amount = amount;
		record.unstake_unlock_time = now + UNSTAKE_DELAY;
		Ok(record.unstake_unlock_time)
	}

	pub fn cancel_unstake(&mut self, solver: Address) -> Result<()> {
		let record = self
			.records
			.get_mut(&solver)
			.ok_or(EngineError::SolverNotRegistered)?;
		if !record.has_pending_unstake() {
			return Err(EngineError::NoPendingUnstake);
		}
		record.unstake_amount = U256::ZERO;
		record.unstake_unlock_time = 0;
		Ok(())
	}

	/// Returns the amount to pay out; the engine transfers it.
	pub fn execute_unstake(&mut self, solver: Address, now: Timestamp) -> Result<U256> {
		let record = self
			.records
			.get_mut(&solver)
			.ok_or(EngineError::SolverNotRegistered)?;
		if !record.has_pending_unstake() {
			return Err(EngineError::NoPendingUnstake);
		}
		if now < record.unstake_unlock_time {
			return Err(EngineError::UnstakeNotReady);
		}
		let amount = record.unstake_amount;
		record.total_bond = record.total_bond.saturating_sub(amount);
		record.unstake_amount = U256::ZERO;
		record.unstake_unlock_time = 0;
		Ok(amount)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const SOLVER: Address = Address::new([1u8; 20]);

	fn min_bond() -> U256 {
		U256::from(MIN_BOND)
	}

	#[test]
	fn reservation_is_five_percent() {
		assert_eq!(
			reserve_for(U256::from(200_000_000u64)),
			U256::from(10_000_000u64)
		);
	}

	#[test]
	fn register_enforces_minimum_and_uniqueness() {
		let mut ledger = BondLedger::new();
		assert!(matches!(
			ledger.register(SOLVER, min_bond() - U256::from(1u8)),
			Err(EngineError::BelowMinimumBond)
		));

		ledger.register(SOLVER, min_bond()).unwrap();
		assert!(ledger.is_registered(SOLVER));
		assert!(matches!(
			ledger.register(SOLVER, min_bond()),
			Err(EngineError::SolverAlreadyRegistered)
		));
	}

	#[test]
	fn reserve_release_cycle() {
		let mut ledger = BondLedger::new();
		ledger.register(SOLVER, min_bond()).unwrap();

		let output = U256::from(200_000_000u64);
		ledger.reserve(SOLVER, output).unwrap();
		let record = ledger.get(SOLVER);
		assert_eq!(record.reserved_bond, U256::from(10_000_000u64));
		assert!(record.reserved_bond <= record.total_bond);

		ledger.release(SOLVER, output);
		assert_eq!(ledger.get(SOLVER).reserved_bond, U256::ZERO);
	}

	#[test]
	fn reserve_fails_when_bond_exhausted() {
		let mut ledger = BondLedger::new();
		ledger.register(SOLVER, min_bond()).unwrap();

		// 5% of this output exceeds the whole bond
		let output = U256::from(MIN_BOND) * U256::from(21u64);
		assert!(matches!(
			ledger.reserve(SOLVER, output),
			Err(EngineError::InsufficientBond)
		));
	}

	#[test]
	fn slash_decrements_total_and_reserved() {
		let mut ledger = BondLedger::new();
		ledger.register(SOLVER, min_bond()).unwrap();

		let output = U256::from(200_000_000u64);
		ledger.reserve(SOLVER, output).unwrap();

		let slashed = ledger.slash(SOLVER, output);
		assert_eq!(slashed, U256::from(10_000_000u64));
		let record = ledger.get(SOLVER);
		assert_eq!(record.total_bond, min_bond() - slashed);
		assert_eq!(record.reserved_bond, U256::ZERO);
		assert!(record.reserved_bond <= record.total_bond);
	}

	#[test]
	fn slash_is_clamped_at_total_bond() {
		let mut ledger = BondLedger::new();
		ledger.register(SOLVER, min_bond()).unwrap();

		let output = U256::from(MIN_BOND) * U256::from(100u64);
		let slashed = ledger.slash(SOLVER, output);
		assert_eq!(slashed, min_bond());
		assert_eq!(ledger.get(SOLVER).total_bond, U256::ZERO);
	}

	#[test]
	fn unstake_lifecycle() {
		let mut ledger = BondLedger::new();
		ledger.register(SOLVER, min_bond() * U256::from(2u8)).unwrap();

		assert!(matches!(
			ledger.cancel_unstake(SOLVER),
			Err(EngineError::NoPendingUnstake)
		));

		let unlock = ledger.request_unstake(SOLVER, min_bond(), 100).unwrap();
		assert_eq!(unlock, 100 + UNSTAKE_DELAY);

		assert!(matches!(
			ledger.request_unstake(SOLVER, U256::from(1u8), 100),
			Err(EngineError::PendingUnstakeExists)
		));
		assert!(matches!(
			ledger.execute_unstake(SOLVER, unlock - 1),
			Err(EngineError::UnstakeNotReady)
		));

		let amount = ledger.execute_unstake(SOLVER, unlock).unwrap();
		assert_eq!(amount, min_bond());
		assert_eq!(ledger.get(SOLVER).total_bond, min_bond());
		assert!(!ledger.get(SOLVER).has_pending_unstake());
	}

	#[test]
	fn unstake_cannot_break_minimum_bond() {
		let mut ledger = BondLedger::new();
		ledger.register(SOLVER, min_bond()).unwrap();
		assert!(matches!(
			ledger.request_unstake(SOLVER, U256::from(1u8), 0),
			Err(EngineError::BelowMinimumBond)
		));
	}

	#[test]
	fn unstake_cannot_exceed_unreserved() {
		let mut ledger = BondLedger::new();
		ledger.register(SOLVER, min_bond() * U256::from(2u8)).unwrap();
		// Reserve most of the bond
		ledger
			.reserve(SOLVER, U256::from(MIN_BOND) * U256::from(30u64))
			.unwrap();
		assert!(matches!(
			ledger.request_unstake(SOLVER, min_bond(), 0),
			Err(EngineError::InsufficientBond)
		));
	}
}
