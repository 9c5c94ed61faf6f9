//! On-chain order records and their state machine.

use crate::common::*;
use crate::quote::{OrderType, Quote};
use serde::{Deserialize, Serialize};

/// Order lifecycle state. `Settled` and `Refunded` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderState {
	#[serde(rename = "NONE")]
	None,
	#[serde(rename = "DEPOSITED")]
	Deposited,
	#[serde(rename = "SETTLED")]
	Settled,
	#[serde(rename = "REFUNDED")]
	Refunded,
}

impl OrderState {
	pub fn is_terminal(self) -> bool {
		matches!(self, OrderState::Settled | OrderState::Refunded)
	}
}

/// The on-chain record instantiated from a (quote, solver signature) pair.
///
/// `input_amount` holds the amount the engine actually received, which may
/// be below the quoted amount for fee-on-transfer tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
	pub user: Address,
	pub solver: Address,
	pub input_token: Address,
	pub input_amount: U256,
	pub output_token: Address,
	pub output_amount: U256,
	pub order_type: OrderType,
	pub fill_deadline: u32,
	pub state: OrderState,
}

impl OrderRecord {
	/// Snapshot a quote into a record in the given state.
	pub fn from_quote(quote: &Quote, state: OrderState) -> Self {
		Self {
			user: quote.user,
			solver: quote.solver,
			input_token: quote.input_token,
			input_amount: quote.input_amount,
			output_token: quote.output_token,
			output_amount: quote.output_amount,
			order_type: quote.order_type,
			fill_deadline: quote.fill_deadline,
			state,
		}
	}
}
