//! Order records keyed by order id, with single-writer state transitions.

use firmswap_types::{EngineError, OrderId, OrderRecord, OrderState, Result};
use std::collections::HashMap;

#[derive(Debug, Default, Clone)]
pub struct OrderStore {
	orders: HashMap<OrderId, OrderRecord>,
}

impl OrderStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn get(&self, order_id: OrderId) -> Option<&OrderRecord> {
		self.orders.get(&order_id)
	}

	pub fn get_mut(&mut self, order_id: OrderId) -> Option<&mut OrderRecord> {
		self.orders.get_mut(&order_id)
	}

	pub fn exists(&self, order_id: OrderId) -> bool {
		self.orders.contains_key(&order_id)
	}

	/// Insert a new record. Any existing record, in any state, blocks the
	/// insert: order ids are single-use.
	pub fn create(&mut self, order_id: OrderId, order: OrderRecord) -> Result<()> {
		if self.orders.contains_key(&order_id) {
			return Err(EngineError::OrderAlreadyExists);
		}
		debug_assert!(order.state != OrderState::None);
		self.orders.insert(order_id, order);
		Ok(())
	}

	/// Move an order from `expected_from` to `to`. Terminal states are
	/// never exited; a mismatched current state fails the transition.
	pub fn transition(
		&mut self,
		order_id: OrderId,
		expected_from: OrderState,
		to: OrderState,
	) -> Result<()> {
		let order = self
			.orders
			.get_mut(&order_id)
			.ok_or(EngineError::OrderNotFound)?;
		if order.state != expected_from {
			return Err(EngineError::OrderNotDeposited);
		}
		debug_assert!(!expected_from.is_terminal());
		order.state = to;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use firmswap_types::{Address, OrderType, Quote, B256, U256};

	fn record(state: OrderState) -> OrderRecord {
		let quote = Quote {
			solver: Address::from([1u8; 20]),
			user: Address::from([2u8; 20]),
			input_token: Address::from([3u8; 20]),
			input_amount: U256::from(100u64),
			output_token: Address::from([4u8; 20]),
			output_amount: U256::from(2_000_000u64),
			order_type: OrderType::ExactInput,
			output_chain_id: firmswap_types::ChainId(1),
			deposit_deadline: 10,
			fill_deadline: 20,
			nonce: U256::ZERO,
		};
		OrderRecord::from_quote(&quote, state)
	}

	#[test]
	fn create_rejects_duplicates() {
		let mut store = OrderStore::new();
		let id = B256::from([1u8; 32]);

		store.create(id, record(OrderState::Deposited)).unwrap();
		assert!(matches!(
			store.create(id, record(OrderState::Deposited)),
			Err(EngineError::OrderAlreadyExists)
		));
	}

	#[test]
	fn transition_enforces_expected_state() {
		let mut store = OrderStore::new();
		let id = B256::from([1u8; 32]);
		store.create(id, record(OrderState::Deposited)).unwrap();

		store
			.transition(id, OrderState::Deposited, OrderState::Settled)
			.unwrap();
		assert_eq!(store.get(id).unwrap().state, OrderState::Settled);

		// Terminal state is never exited
		assert!(matches!(
			store.transition(id, OrderState::Deposited, OrderState::Refunded),
			Err(EngineError::OrderNotDeposited)
		));
	}

	#[test]
	fn transition_on_unknown_order_fails() {
		let mut store = OrderStore::new();
		assert!(matches!(
			store.transition(
				B256::from([9u8; 32]),
				OrderState::Deposited,
				OrderState::Settled
			),
			Err(EngineError::OrderNotFound)
		));
	}
}
