//! ERC-20 token movement behind a trait.
//!
//! The engine never assumes a transfer delivers the full amount; every pull
//! is accounted by balance difference so fee-on-transfer tokens stay
//! correct. [`InMemoryBank`] is the test and dev-chain backend and can
//! simulate such tokens.

use firmswap_types::{Address, EngineError, Result, U256};
use std::collections::HashMap;

pub trait TokenBank {
	fn balance_of(&self, token: Address, holder: Address) -> U256;

	fn allowance(&self, token: Address, owner: Address, spender: Address) -> U256;

	fn approve(&mut self, token: Address, owner: Address, spender: Address, amount: U256);

	/// Direct transfer, `from` acting for itself (or a proxy the engine
	/// controls).
	fn transfer(&mut self, token: Address, from: Address, to: Address, amount: U256)
		-> Result<()>;

	/// Allowance-gated pull, ERC-20 `transferFrom` semantics.
	fn transfer_from(
		&mut self,
		token: Address,
		spender: Address,
		owner: Address,
		to: Address,
		amount: U256,
	) -> Result<()>;

	/// Whether a direct transfer of `amount` would succeed.
	fn can_transfer(&self, token: Address, from: Address, amount: U256) -> bool {
		self.balance_of(token, from) >= amount
	}

	/// Whether an allowance-gated pull of `amount` would succeed.
	fn can_pull(&self, token: Address, spender: Address, owner: Address, amount: U256) -> bool {
		self.balance_of(token, owner) >= amount
			&& self.allowance(token, owner, spender) >= amount
	}
}

/// In-memory ERC-20 set with balances, allowances, and optional
/// per-token transfer fees (in basis points) for fee-on-transfer tests.
#[derive(Debug, Default, Clone)]
pub struct InMemoryBank {
	balances: HashMap<(Address, Address), U256>,
	allowances: HashMap<(Address, Address, Address), U256>,
	transfer_fee_bps: HashMap<Address, u64>,
}

impl InMemoryBank {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn mint(&mut self, token: Address, to: Address, amount: U256) {
		let entry = self.balances.entry((token, to)).or_insert(U256::ZERO);
		*entry += amount;
	}

	/// Make `token` take a fee of `bps` basis points on every transfer.
	pub fn set_transfer_fee(&mut self, token: Address, bps: u64) {
		self.transfer_fee_bps.insert(token, bps);
	}

	fn move_tokens(
		&mut self,
		token: Address,
		from: Address,
		to: Address,
		amount: U256,
	) -> Result<()> {
		let from_balance = self.balance_of(token, from);
		if from_balance < amount {
			return Err(EngineError::TokenTransfer(format!(
				"balance {} below transfer amount {}",
				from_balance, amount
			)));
		}

		let fee = match self.transfer_fee_bps.get(&token) {
			Some(bps) => amount * U256::from(*bps) / U256::from(10_000u64),
			None => U256::ZERO,
		};

		self.balances.insert((token, from), from_balance - amount);
		let to_balance = self.balance_of(token, to);
		self.balances.insert((token, to), to_balance + amount - fee);
		Ok(())
	}
}

impl TokenBank for InMemoryBank {
	fn balance_of(&self, token: Address, holder: Address) -> U256 {
		self.balances
			.get(&(token, holder))
			.copied()
			.unwrap_or(U256::ZERO)
	}

	fn allowance(&self, token: Address, owner: Address, spender: Address) -> U256 {
		self.allowances
			.get(&(token, owner, spender))
			.copied()
			.unwrap_or(U256::ZERO)
	}

	fn approve(&mut self, token: Address, owner: Address, spender: Address, amount: U256) {
		self.allowances.insert((token, owner, spender), amount);
	}

	fn transfer(
		&mut self,
		token: Address,
		from: Address,
		to: Address,
		amount: U256,
	) -> Result<()> {
		self.move_tokens(token, from, to, amount)
	}

	fn transfer_from(
		&mut self,
		token: Address,
		spender: Address,
		owner: Address,
		to: Address,
		amount: U256,
	) -> Result<()> {
		let allowed = self.allowance(token, owner, spender);
		if allowed < amount {
			return Err(EngineError::TokenTransfer(format!(
				"allowance {} below transfer amount {}",
				allowed, amount
			)));
		}
		self.move_tokens(token, owner, to, amount)?;
		// Unlimited approvals are not drawn down, matching common ERC-20s
		if allowed != U256::MAX {
			self.allowances
				.insert((token, owner, spender), allowed - amount);
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const TOKEN: Address = Address::new([0x10; 20]);
	const ALICE: Address = Address::new([0xa1; 20]);
	const BOB: Address = Address::new([0xb0; 20]);
	const SPENDER: Address = Address::new([0x55; 20]);

	#[test]
	fn transfer_moves_balance() {
		let mut bank = InMemoryBank::new();
		bank.mint(TOKEN, ALICE, U256::from(100u64));

		bank.transfer(TOKEN, ALICE, BOB, U256::from(40u64)).unwrap();
		assert_eq!(bank.balance_of(TOKEN, ALICE), U256::from(60u64));
		assert_eq!(bank.balance_of(TOKEN, BOB), U256::from(40u64));
	}

	#[test]
	fn transfer_fails_on_insufficient_balance() {
		let mut bank = InMemoryBank::new();
		bank.mint(TOKEN, ALICE, U256::from(10u64));

		let err = bank.transfer(TOKEN, ALICE, BOB, U256::from(11u64));
		assert!(matches!(err, Err(EngineError::TokenTransfer(_))));
		assert_eq!(bank.balance_of(TOKEN, ALICE), U256::from(10u64));
	}

	#[test]
	fn transfer_from_respects_and_draws_allowance() {
		let mut bank = InMemoryBank::new();
		bank.mint(TOKEN, ALICE, U256::from(100u64));
		bank.approve(TOKEN, ALICE, SPENDER, U256::from(50u64));

		bank.transfer_from(TOKEN, SPENDER, ALICE, BOB, U256::from(30u64))
			.unwrap();
		assert_eq!(bank.allowance(TOKEN, ALICE, SPENDER), U256::from(20u64));

		let err = bank.transfer_from(TOKEN, SPENDER, ALICE, BOB, U256::from(30u64));
		assert!(matches!(err, Err(EngineError::TokenTransfer(_))));
	}

	#[test]
	fn unlimited_allowance_is_not_drawn() {
		let mut bank = InMemoryBank::new();
		bank.mint(TOKEN, ALICE, U256::from(100u64));
		bank.approve(TOKEN, ALICE, SPENDER, U256::MAX);

		bank.transfer_from(TOKEN, SPENDER, ALICE, BOB, U256::from(30u64))
			.unwrap();
		assert_eq!(bank.allowance(TOKEN, ALICE, SPENDER), U256::MAX);
	}

	#[test]
	fn fee_on_transfer_shorts_the_recipient() {
		let mut bank = InMemoryBank::new();
		bank.mint(TOKEN, ALICE, U256::from(10_000u64));
		bank.set_transfer_fee(TOKEN, 100); // 1%

		bank.transfer(TOKEN, ALICE, BOB, U256::from(10_000u64))
			.unwrap();
		assert_eq!(bank.balance_of(TOKEN, BOB), U256::from(9_900u64));
		assert_eq!(bank.balance_of(TOKEN, ALICE), U256::ZERO);
	}
}
