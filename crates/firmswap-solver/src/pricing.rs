//! Pricing: turn a quote request into firm input/output amounts.
//!
//! Floating point is used only to interpret the price feed; amounts are
//! converted back to integer token units with ceiling on the input side
//! (favors the solver) and floor on the output side. Fixed-side amounts
//! above 2^128 are rejected before any conversion.

use async_trait::async_trait;
use firmswap_types::api::SolverQuoteRequest;
use firmswap_types::{quote::MIN_ORDER, Address, OrderType, U256};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PricingError {
	#[error("token {0} is not configured")]
	UnknownToken(Address),

	#[error("no market for pair {0}/{1}")]
	PairUnsupported(String, String),

	#[error("fixed-side amount exceeds 2^128")]
	AmountTooLarge,

	#[error("order exceeds the configured usd ceiling")]
	OrderTooLarge,

	#[error("derived output is below the protocol minimum")]
	BelowMinimumOrder,

	#[error("price feed error: {0}")]
	Feed(String),
}

/// Best bid/ask for a market, base priced in quote units.
#[derive(Debug, Clone, Copy)]
pub struct Ticker {
	pub bid: f64,
	pub ask: f64,
}

#[async_trait]
pub trait ExchangeAdapter: Send + Sync {
	/// Ticker for the `base/quote` market, or `None` when unlisted.
	async fn ticker(&self, base: &str, quote: &str) -> Result<Option<Ticker>, PricingError>;
}

/// Static rate table; the dev and test adapter.
#[derive(Debug, Default)]
pub struct FixedRateAdapter {
	markets: HashMap<(String, String), Ticker>,
}

impl FixedRateAdapter {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_market(mut self, base: &str, quote: &str, bid: f64, ask: f64) -> Self {
		self.markets
			.insert((base.to_string(), quote.to_string()), Ticker { bid, ask });
		self
	}
}

#[async_trait]
impl ExchangeAdapter for FixedRateAdapter {
	async fn ticker(&self, base: &str, quote: &str) -> Result<Option<Ticker>, PricingError> {
		Ok(self
			.markets
			.get(&(base.to_string(), quote.to_string()))
			.copied())
	}
}

#[derive(Debug, Clone)]
pub struct TokenInfo {
	pub address: Address,
	pub symbol: String,
	pub decimals: u8,
	/// Feed-interpreted USD price of one whole token.
	pub usd_price: f64,
}

#[derive(Debug, Clone)]
pub struct PricingConfig {
	pub spread_bps: u64,
	pub max_order_usd: f64,
}

impl Default for PricingConfig {
	fn default() -> Self {
		Self {
			spread_bps: 50,
			max_order_usd: 250_000.0,
		}
	}
}

/// The amounts a priced request resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricedAmounts {
	pub input_amount: U256,
	pub output_amount: U256,
}

pub struct Pricer {
	config: PricingConfig,
	tokens: HashMap<Address, TokenInfo>,
	adapter: Box<dyn ExchangeAdapter>,
}

impl Pricer {
	pub fn new(
		config: PricingConfig,
		tokens: Vec<TokenInfo>,
		adapter: Box<dyn ExchangeAdapter>,
	) -> Self {
		Self {
			config,
			tokens: tokens.into_iter().map(|t| (t.address, t)).collect(),
			adapter,
		}
	}

	pub async fn price(&self, request: &SolverQuoteRequest) -> Result<PricedAmounts, PricingError> {
		let input = self
			.tokens
			.get(&request.input_token)
			.ok_or(PricingError::UnknownToken(request.input_token))?;
		let output = self
			.tokens
			.get(&request.output_token)
			.ok_or(PricingError::UnknownToken(request.output_token))?;

		let fixed = match request.order_type {
			OrderType::ExactInput => input,
			OrderType::ExactOutput => output,
		};
		if request.amount > U256::from(u128::MAX) {
			return Err(PricingError::AmountTooLarge);
		}
		let fixed_units: u128 = request.amount.to::<u128>();
		let fixed_tokens = fixed_units as f64 / 10f64.powi(fixed.decimals as i32);

		if fixed_tokens * fixed.usd_price > self.config.max_order_usd {
			return Err(PricingError::OrderTooLarge);
		}

		let spread = self.config.spread_bps as f64 / 10_000.0;
		match request.order_type {
			OrderType::ExactOutput => {
				// Required input, rounded up.
				let input_tokens = if let Some(ticker) =
					self.adapter.ticker(&output.symbol, &input.symbol).await?
				{
					fixed_tokens * ticker.ask * (1.0 + spread)
				} else if let Some(ticker) =
					self.adapter.ticker(&input.symbol, &output.symbol).await?
				{
					fixed_tokens / ticker.bid * (1.0 + spread)
				} else {
					return Err(PricingError::PairUnsupported(
						input.symbol.clone(),
						output.symbol.clone(),
					));
				};
				let input_amount = to_units_ceil(input_tokens, input.decimals)?;
				if request.amount < U256::from(MIN_ORDER) {
					return Err(PricingError::BelowMinimumOrder);
				}
				Ok(PricedAmounts {
					input_amount,
					output_amount: request.amount,
				})
			}
			OrderType::ExactInput => {
				// Delivered output, rounded down.
				let output_tokens = if let Some(ticker) =
					self.adapter.ticker(&input.symbol, &output.symbol).await?
				{
					fixed_tokens * ticker.bid * (1.0 - spread)
				} else if let Some(ticker) =
					self.adapter.ticker(&output.symbol, &input.symbol).await?
				{
					fixed_tokens / ticker.bid * (1.0 - spread)
				} else {
					return Err(PricingError::PairUnsupported(
						input.symbol.clone(),
						output.symbol.clone(),
					));
				};
				let output_amount = to_units_floor(output_tokens, output.decimals)?;
				if output_amount < U256::from(MIN_ORDER) {
					return Err(PricingError::BelowMinimumOrder);
				}
				Ok(PricedAmounts {
					input_amount: request.amount,
					output_amount,
				})
			}
		}
	}
}

fn to_units_ceil(tokens: f64, decimals: u8) -> Result<U256, PricingError> {
	let units = (tokens * 10f64.powi(decimals as i32)).ceil();
	units_to_u256(units)
}

fn to_units_floor(tokens: f64, decimals: u8) -> Result<U256, PricingError> {
	let units = (tokens * 10f64.powi(decimals as i32)).floor();
	units_to_u256(units)
}

fn units_to_u256(units: f64) -> Result<U256, PricingError> {
	if !units.is_finite() || units < 0.0 || units >= 2f64.powi(128) {
		return Err(PricingError::AmountTooLarge);
	}
	Ok(U256::from(units as u128))
}
