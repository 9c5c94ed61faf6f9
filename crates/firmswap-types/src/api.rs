//! JSON wire shapes for the FirmSwap HTTP API.
//!
//! All 256-bit amounts cross the wire as decimal strings to preserve
//! precision in JavaScript clients.

use crate::common::*;
use crate::order::OrderState;
use crate::quote::{OrderType, Quote};
use serde::{Deserialize, Serialize};

/// How the user intends to deliver input tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DepositMode {
	#[serde(rename = "CONTRACT")]
	Contract,
	#[serde(rename = "ADDRESS")]
	Address,
}

/// A quote request as submitted by a user to the aggregator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
	pub input_token: Address,
	pub output_token: Address,
	pub order_type: OrderType,
	#[serde(with = "u256_string")]
	pub amount: U256,
	pub user_address: Address,
	pub origin_chain_id: ChainId,
	pub destination_chain_id: ChainId,
	/// Seconds the user wants the deposit window held open.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub deposit_window: Option<u32>,
	pub deposit_mode: DepositMode,
}

/// The serialized quote, field for field the EIP-712 struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireQuote {
	pub solver: Address,
	pub user: Address,
	pub input_token: Address,
	#[serde(with = "u256_string")]
	pub input_amount: U256,
	pub output_token: Address,
	#[serde(with = "u256_string")]
	pub output_amount: U256,
	pub order_type: OrderType,
	pub output_chain_id: ChainId,
	pub deposit_deadline: u32,
	pub fill_deadline: u32,
	#[serde(with = "u256_string")]
	pub nonce: U256,
}

impl From<&Quote> for WireQuote {
	fn from(q: &Quote) -> Self {
		Self {
			solver: q.solver,
			user: q.user,
			input_token: q.input_token,
			input_amount: q.input_amount,
			output_token: q.output_token,
			output_amount: q.output_amount,
			order_type: q.order_type,
			output_chain_id: q.output_chain_id,
			deposit_deadline: q.deposit_deadline,
			fill_deadline: q.fill_deadline,
			nonce: q.nonce,
		}
	}
}

impl From<&WireQuote> for Quote {
	fn from(w: &WireQuote) -> Self {
		Self {
			solver: w.solver,
			user: w.user,
			input_token: w.input_token,
			input_amount: w.input_amount,
			output_token: w.output_token,
			output_amount: w.output_amount,
			order_type: w.order_type,
			output_chain_id: w.output_chain_id,
			deposit_deadline: w.deposit_deadline,
			fill_deadline: w.fill_deadline,
			nonce: w.nonce,
		}
	}
}

/// A quote with its solver signature. Alternatives are returned with an
/// empty signature so they cannot be executed without a fresh request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedQuote {
	pub quote: WireQuote,
	pub solver_signature: String,
}

/// Aggregator response for a quote request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
	pub quote: WireQuote,
	pub solver_signature: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub deposit_address: Option<Address>,
	pub alternative_quotes: Vec<WireQuote>,
}

/// Order status view.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusResponse {
	pub order_id: OrderId,
	pub state: OrderState,
	pub user: Address,
	pub solver: Address,
	pub input_token: Address,
	#[serde(with = "u256_string")]
	pub input_amount: U256,
	pub output_token: Address,
	#[serde(with = "u256_string")]
	pub output_amount: U256,
	pub fill_deadline: u32,
}

/// Request shape the aggregator sends to a solver's `/quote` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolverQuoteRequest {
	pub input_token: Address,
	pub output_token: Address,
	pub order_type: OrderType,
	#[serde(with = "u256_string")]
	pub amount: U256,
	pub user_address: Address,
	pub chain_id: ChainId,
	pub deposit_deadline: u32,
	pub fill_deadline: u32,
}

/// A solver's reply: the priced quote and its EIP-712 signature.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolverQuoteResponse {
	pub quote: WireQuote,
	pub signature: String,
}

/// Signed solver registration request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterSolverRequest {
	pub address: Address,
	pub endpoint: String,
	pub name: String,
	/// Unix milliseconds; must be within the server's auth window.
	pub timestamp: u64,
	pub signature: String,
}

/// Signed solver unregistration request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnregisterSolverRequest {
	pub timestamp: u64,
	pub signature: String,
}

/// Push-stream event for `/v1/ws` subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum WsEvent {
	Deposited {
		chain_id: ChainId,
		order_id: OrderId,
		user: Address,
		solver: Address,
	},
	Settled {
		chain_id: ChainId,
		order_id: OrderId,
		user: Address,
		solver: Address,
	},
	Refunded {
		chain_id: ChainId,
		order_id: OrderId,
		user: Address,
		#[serde(with = "u256_string")]
		bond_slashed: U256,
	},
}

/// API error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	pub error: String,
	pub message: String,
}

/// Serde module for U256 as a decimal string.
pub mod u256_string {
	use alloy_primitives::U256;
	use serde::{de::Error, Deserialize, Deserializer, Serialize, Serializer};

	pub fn serialize<S>(value: &U256, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		value.to_string().serialize(serializer)
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<U256, D::Error>
	where
		D: Deserializer<'de>,
	{
		let s = String::deserialize(deserializer)?;
		U256::from_str_radix(&s, 10).map_err(D::Error::custom)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn wire_quote_round_trip() {
		let quote = Quote {
			solver: Address::from([0xaa; 20]),
			user: Address::from([0xbb; 20]),
			input_token: Address::from([0x11; 20]),
			input_amount: U256::from(1148u64) * U256::from(10u64).pow(U256::from(18)),
			output_token: Address::from([0x22; 20]),
			output_amount: U256::from(200_000_000u64),
			order_type: OrderType::ExactOutput,
			output_chain_id: ChainId(8453),
			deposit_deadline: 1_700_000_300,
			fill_deadline: 1_700_000_420,
			nonce: U256::from(7u64),
		};

		let wire = WireQuote::from(&quote);
		let json = serde_json::to_string(&wire).unwrap();
		let back: WireQuote = serde_json::from_str(&json).unwrap();
		assert_eq!(Quote::from(&back), quote);

		// Amounts travel as decimal strings
		assert!(json.contains("\"outputAmount\":\"200000000\""));
		assert!(json.contains("\"orderType\":\"EXACT_OUTPUT\""));
	}

	#[test]
	fn quote_request_parses_wire_shape() {
		let json = r#"{
			"inputToken": "0x1111111111111111111111111111111111111111",
			"outputToken": "0x2222222222222222222222222222222222222222",
			"orderType": "EXACT_INPUT",
			"amount": "5000000000000000000",
			"userAddress": "0x3333333333333333333333333333333333333333",
			"originChainId": 1,
			"destinationChainId": 1,
			"depositMode": "CONTRACT"
		}"#;
		let req: QuoteRequest = serde_json::from_str(json).unwrap();
		assert_eq!(req.order_type, OrderType::ExactInput);
		assert_eq!(req.amount, U256::from(5_000_000_000_000_000_000u64));
		assert_eq!(req.deposit_window, None);
		assert_eq!(req.deposit_mode, DepositMode::Contract);
	}
}
