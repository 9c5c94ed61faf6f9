//! Per-solver nonce bitmap: one bit per nonce, 256 nonces per word.
//!
//! Used nonces never return to unused. Writes are serialized per solver by
//! the engine's `&mut` receiver.

use firmswap_types::{Address, EngineError, Result, U256};
use std::collections::HashMap;

#[derive(Debug, Default, Clone)]
pub struct NonceBitmap {
	words: HashMap<(Address, U256), U256>,
}

impl NonceBitmap {
	pub fn new() -> Self {
		Self::default()
	}

	fn locate(nonce: U256) -> (U256, U256) {
		let word_index = nonce >> 8usize;
		let bit_index = (nonce & U256::from(0xffu8)).to::<usize>();
		(word_index, U256::from(1u8) << bit_index)
	}

	pub fn is_used(&self, solver: Address, nonce: U256) -> bool {
		let (word_index, bit) = Self::locate(nonce);
		let word = self
			.words
			.get(&(solver, word_index))
			.copied()
			.unwrap_or(U256::ZERO);
		word & bit != U256::ZERO
	}

	pub fn mark_used(&mut self, solver: Address, nonce: U256) -> Result<()> {
		let (word_index, bit) = Self::locate(nonce);
		let word = self.words.entry((solver, word_index)).or_insert(U256::ZERO);
		if *word & bit != U256::ZERO {
			return Err(EngineError::NonceAlreadyUsed);
		}
		*word |= bit;
		Ok(())
	}

	/// OR a full mask into one word; batch cancellation.
	pub fn mark_many(&mut self, solver: Address, word_index: U256, mask: U256) {
		let word = self.words.entry((solver, word_index)).or_insert(U256::ZERO);
		*word |= mask;
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const SOLVER: Address = Address::new([1u8; 20]);
	const OTHER: Address = Address::new([2u8; 20]);

	#[test]
	fn fresh_nonce_is_unused() {
		let bitmap = NonceBitmap::new();
		assert!(!bitmap.is_used(SOLVER, U256::ZERO));
		assert!(!bitmap.is_used(SOLVER, U256::from(123_456u64)));
	}

	#[test]
	fn mark_used_is_single_shot() {
		let mut bitmap = NonceBitmap::new();
		bitmap.mark_used(SOLVER, U256::from(7u64)).unwrap();
		assert!(bitmap.is_used(SOLVER, U256::from(7u64)));
		assert!(matches!(
			bitmap.mark_used(SOLVER, U256::from(7u64)),
			Err(EngineError::NonceAlreadyUsed)
		));
	}

	#[test]
	fn nonces_are_scoped_per_solver() {
		let mut bitmap = NonceBitmap::new();
		bitmap.mark_used(SOLVER, U256::ZERO).unwrap();
		assert!(!bitmap.is_used(OTHER, U256::ZERO));
	}

	#[test]
	fn word_boundaries() {
		let mut bitmap = NonceBitmap::new();
		// Nonces 255 and 256 sit in adjacent words
		bitmap.mark_used(SOLVER, U256::from(255u64)).unwrap();
		assert!(!bitmap.is_used(SOLVER, U256::from(256u64)));
		bitmap.mark_used(SOLVER, U256::from(256u64)).unwrap();
		assert!(bitmap.is_used(SOLVER, U256::from(255u64)));
		assert!(bitmap.is_used(SOLVER, U256::from(256u64)));
	}

	#[test]
	fn mark_many_sets_the_masked_bits() {
		let mut bitmap = NonceBitmap::new();
		// Cancel nonces 0, 1 and 255 of word 2
		let mask = U256::from(3u8) | (U256::from(1u8) << 255usize);
		bitmap.mark_many(SOLVER, U256::from(2u64), mask);

		assert!(bitmap.is_used(SOLVER, U256::from(512u64)));
		assert!(bitmap.is_used(SOLVER, U256::from(513u64)));
		assert!(bitmap.is_used(SOLVER, U256::from(767u64)));
		assert!(!bitmap.is_used(SOLVER, U256::from(514u64)));

		// Idempotent on already-set bits, and a used bit stays used
		bitmap.mark_many(SOLVER, U256::from(2u64), mask);
		assert!(bitmap.is_used(SOLVER, U256::from(512u64)));
	}
}
