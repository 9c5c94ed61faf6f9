//! Quote aggregation: fan-out to registered solvers, validation, signature
//! verification, and best-price ranking.
//!
//! Solver calls are dispatched in parallel, each bounded by its own
//! timeout; individual failures are warnings, never errors. A result is
//! returned as long as one quote survives signature verification.

pub mod transport;

pub use transport::{HttpQuoteTransport, QuoteTransport, TransportError};

use firmswap_codec as codec;
use firmswap_registry::SolverRegistry;
use firmswap_types::api::{
	DepositMode, QuoteRequest, QuoteResponse, SolverQuoteRequest, SolverQuoteResponse, WireQuote,
};
use firmswap_types::{Address, ChainId, OrderType, Quote, Timestamp, B256, U256};
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Fan-out is capped to the first this-many solvers by insertion order.
pub const MAX_FAN_OUT: usize = 20;

/// Default deposit window in seconds when the request does not name one.
pub const DEFAULT_DEPOSIT_WINDOW: u32 = 300;

/// Fill window granted beyond the deposit deadline, in seconds.
pub const DEFAULT_FILL_WINDOW: u32 = 120;

/// Deadline for each outbound solver call, in milliseconds.
pub const QUOTE_TIMEOUT_MS: u64 = 3_000;

#[derive(Error, Debug)]
pub enum AggregatorError {
	#[error("unknown chain {0}")]
	UnknownChain(ChainId),

	#[error("no active solvers for chain {0}")]
	NoSolvers(ChainId),

	#[error("no quote survived validation")]
	NoQuotes,

	#[error("verifying contract is not configured for chain {0}")]
	VerifierUnconfigured(ChainId),
}

/// Per-chain routing: where quotes settle and how deposit addresses are
/// derived.
#[derive(Debug, Clone)]
pub struct RouteConfig {
	pub chain_id: ChainId,
	/// The settlement engine; also the EIP-712 verifying contract.
	pub verifying_contract: Option<Address>,
	pub proxy_code_hash: Option<B256>,
}

#[derive(Debug, Clone)]
pub struct AggregatorConfig {
	pub max_fan_out: usize,
	pub quote_timeout: Duration,
	pub default_deposit_window: u32,
	pub default_fill_window: u32,
}

impl Default for AggregatorConfig {
	fn default() -> Self {
		Self {
			max_fan_out: MAX_FAN_OUT,
			quote_timeout: Duration::from_millis(QUOTE_TIMEOUT_MS),
			default_deposit_window: DEFAULT_DEPOSIT_WINDOW,
			default_fill_window: DEFAULT_FILL_WINDOW,
		}
	}
}

pub struct Aggregator {
	config: AggregatorConfig,
	registry: Arc<SolverRegistry>,
	transport: Arc<dyn QuoteTransport>,
	routes: HashMap<ChainId, RouteConfig>,
}

/// A quote that survived validation and signature verification.
struct VerifiedQuote {
	quote: Quote,
	signature: String,
	signature_bytes: Vec<u8>,
}

impl Aggregator {
	pub fn new(
		config: AggregatorConfig,
		registry: Arc<SolverRegistry>,
		transport: Arc<dyn QuoteTransport>,
		routes: HashMap<ChainId, RouteConfig>,
	) -> Self {
		Self {
			config,
			registry,
			transport,
			routes,
		}
	}

	/// Fan a request out to the chain's solvers and return the best
	/// surviving quote. `now` is the server clock in Unix seconds.
	pub async fn best_quote(
		&self,
		request: &QuoteRequest,
		now: Timestamp,
	) -> Result<QuoteResponse, AggregatorError> {
		let route = self
			.routes
			.get(&request.origin_chain_id)
			.filter(|route| route.chain_id == request.origin_chain_id)
			.ok_or(AggregatorError::UnknownChain(request.origin_chain_id))?;

		let solvers = self.registry.solvers(route.chain_id).await;
		if solvers.is_empty() {
			return Err(AggregatorError::NoSolvers(route.chain_id));
		}
		let verifying_contract = route
			.verifying_contract
			.ok_or(AggregatorError::VerifierUnconfigured(route.chain_id))?;

		let deposit_window = request
			.deposit_window
			.unwrap_or(self.config.default_deposit_window);
		let deposit_deadline = now as u32 + deposit_window;
		let fill_deadline = deposit_deadline + self.config.default_fill_window;

		let solver_request = SolverQuoteRequest {
			input_token: request.input_token,
			output_token: request.output_token,
			order_type: request.order_type,
			amount: request.amount,
			user_address: request.user_address,
			chain_id: route.chain_id,
			deposit_deadline,
			fill_deadline,
		};

		let fan_out = solvers.len().min(self.config.max_fan_out);
		let calls = solvers[..fan_out].iter().map(|solver| {
			let solver = solver.clone();
			let request = solver_request.clone();
			async move {
				// Fresh DNS check right before dialing (rebinding defense)
				if !self.registry.revalidate_endpoint(&solver).await {
					return None;
				}
				match tokio::time::timeout(
					self.config.quote_timeout,
					self.transport.fetch_quote(&solver.endpoint, &request),
				)
				.await
				{
					Ok(Ok(response)) => Some((solver, response)),
					Ok(Err(e)) => {
						warn!(solver = %solver.address, error = %e, "solver call failed");
						None
					}
					Err(_) => {
						warn!(solver = %solver.address, "solver call timed out");
						None
					}
				}
			}
		});
		let responses: Vec<_> = join_all(calls).await.into_iter().flatten().collect();
		debug!(
			dispatched = fan_out,
			answered = responses.len(),
			"solver fan-out complete"
		);

		let domain = codec::quote_domain(route.chain_id, verifying_contract);
		let mut verified: Vec<VerifiedQuote> = Vec::new();
		for (solver, response) in responses {
			match self.verify_response(request, &response, &domain, now) {
				Ok(v) => verified.push(v),
				Err(reason) => {
					warn!(solver = %solver.address, reason, "discarding solver response");
				}
			}
		}
		if verified.is_empty() {
			return Err(AggregatorError::NoQuotes);
		}

		// EXACT_INPUT: more output is better. EXACT_OUTPUT: less input is
		// better. The sort is stable, so earlier arrivals win ties.
		verified.sort_by(|a, b| match request.order_type {
			OrderType::ExactInput => b.quote.output_amount.cmp(&a.quote.output_amount),
			OrderType::ExactOutput => a.quote.input_amount.cmp(&b.quote.input_amount),
		});

		let best = &verified[0];
		let deposit_address = match (request.deposit_mode, route.proxy_code_hash) {
			(DepositMode::Address, Some(code_hash)) => {
				let order_id = codec::order_id(
					codec::quote_struct_hash(&best.quote),
					&best.signature_bytes,
				);
				Some(firmswap_engine::deposit_address(
					verifying_contract,
					order_id,
					code_hash,
				))
			}
			_ => None,
		};

		Ok(QuoteResponse {
			quote: WireQuote::from(&best.quote),
			solver_signature: best.signature.clone(),
			deposit_address,
			// Signatures are stripped from alternatives so they cannot be
			// executed without a fresh request.
			alternative_quotes: verified[1..]
				.iter()
				.map(|v| WireQuote::from(&v.quote))
				.collect(),
		})
	}

	fn verify_response(
		&self,
		request: &QuoteRequest,
		response: &SolverQuoteResponse,
		domain: &codec::Eip712Domain,
		now: Timestamp,
	) -> Result<VerifiedQuote, &'static str> {
		let quote = Quote::from(&response.quote);

		if quote.user != request.user_address {
			return Err("quote user does not match requester");
		}
		if quote.input_token != request.input_token || quote.output_token != request.output_token {
			return Err("quote tokens do not match request");
		}
		if quote.deposit_deadline as u64 <= now {
			return Err("quote already expired");
		}
		if quote.input_amount == U256::ZERO || quote.output_amount == U256::ZERO {
			return Err("quote has a zero amount");
		}

		let signature_bytes = codec::decode_signature_hex(&response.signature)
			.map_err(|_| "malformed signature")?;
		let recovered = codec::recover_quote_signer(&quote, domain, &signature_bytes)
			.map_err(|_| "unrecoverable signature")?;
		if recovered != quote.solver {
			return Err("signature does not recover to the quoted solver");
		}

		Ok(VerifiedQuote {
			quote,
			signature: response.signature.clone(),
			signature_bytes,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_signer::SignerSync;
	use alloy_signer_local::PrivateKeySigner;
	use async_trait::async_trait;
	use firmswap_registry::RegistryConfig;
	use firmswap_storage::MemoryStorage;
	use firmswap_types::api::SolverQuoteResponse;
	use std::sync::Mutex;

	const CHAIN: ChainId = ChainId(1);
	const VERIFIER: Address = Address::new([0xee; 20]);
	const USER: Address = Address::new([0xaa; 20]);
	const WETH: Address = Address::new([0x11; 20]);
	const USDX: Address = Address::new([0x12; 20]);

	const NOW: u64 = 1_700_000_000;
	const NOW_MS: u64 = NOW * 1_000;

	fn eth(n: u64) -> U256 {
		U256::from(n) * U256::from(10u64).pow(U256::from(18))
	}

	fn usd(n: u64) -> U256 {
		U256::from(n) * U256::from(1_000_000u64)
	}

	enum Behavior {
		Respond(SolverQuoteResponse),
		Delay(Duration),
		Fail,
	}

	struct MockTransport {
		behaviors: Mutex<HashMap<String, Behavior>>,
	}

	impl MockTransport {
		fn new() -> Self {
			Self {
				behaviors: Mutex::new(HashMap::new()),
			}
		}

		fn set(&self, endpoint: &str, behavior: Behavior) {
			self.behaviors
				.lock()
				.unwrap()
				.insert(endpoint.to_string(), behavior);
		}
	}

	#[async_trait]
	impl QuoteTransport for MockTransport {
		async fn fetch_quote(
			&self,
			endpoint: &str,
			_request: &SolverQuoteRequest,
		) -> Result<SolverQuoteResponse, TransportError> {
			let behavior = self.behaviors.lock().unwrap().remove(endpoint);
			match behavior {
				Some(Behavior::Respond(response)) => Ok(response),
				Some(Behavior::Delay(duration)) => {
					tokio::time::sleep(duration).await;
					Err(TransportError::Request("too slow".into()))
				}
				Some(Behavior::Fail) | None => {
					Err(TransportError::Request("connection refused".into()))
				}
			}
		}
	}

	async fn register_solver(
		registry: &SolverRegistry,
		key: &PrivateKeySigner,
		endpoint: &str,
	) {
		let message = codec::registration_message(key.address(), endpoint, NOW_MS);
		let sig = key.sign_message_sync(message.as_bytes()).unwrap();
		let request = firmswap_types::api::RegisterSolverRequest {
			address: key.address(),
			endpoint: endpoint.to_string(),
			name: "mock".to_string(),
			timestamp: NOW_MS,
			signature: format!("0x{}", hex::encode(sig.as_bytes())),
		};
		registry.register(CHAIN, &request, NOW_MS).await.unwrap();
	}

	fn signed_response(
		key: &PrivateKeySigner,
		order_type: OrderType,
		input_amount: U256,
		output_amount: U256,
		user: Address,
	) -> SolverQuoteResponse {
		let quote = Quote {
			solver: key.address(),
			user,
			input_token: WETH,
			input_amount,
			output_token: USDX,
			output_amount,
			order_type,
			output_chain_id: CHAIN,
			deposit_deadline: (NOW + 300) as u32,
			fill_deadline: (NOW + 420) as u32,
			nonce: U256::ZERO,
		};
		let domain = codec::quote_domain(CHAIN, VERIFIER);
		let sig = key
			.sign_hash_sync(&codec::quote_digest(&quote, &domain))
			.unwrap();
		SolverQuoteResponse {
			quote: WireQuote::from(&quote),
			signature: format!("0x{}", hex::encode(sig.as_bytes())),
		}
	}

	fn request(order_type: OrderType, mode: DepositMode) -> QuoteRequest {
		QuoteRequest {
			input_token: WETH,
			output_token: USDX,
			order_type,
			amount: usd(200),
			user_address: USER,
			origin_chain_id: CHAIN,
			destination_chain_id: CHAIN,
			deposit_window: None,
			deposit_mode: mode,
		}
	}

	struct Fixture {
		aggregator: Aggregator,
		transport: Arc<MockTransport>,
		registry: Arc<SolverRegistry>,
	}

	async fn fixture(verifier: Option<Address>, proxy_code_hash: Option<B256>) -> Fixture {
		let registry = Arc::new(SolverRegistry::new(
			RegistryConfig::default(),
			Arc::new(MemoryStorage::new()),
		));
		let transport = Arc::new(MockTransport::new());
		let mut routes = HashMap::new();
		routes.insert(
			CHAIN,
			RouteConfig {
				chain_id: CHAIN,
				verifying_contract: verifier,
				proxy_code_hash,
			},
		);
		let aggregator = Aggregator::new(
			AggregatorConfig {
				quote_timeout: Duration::from_millis(200),
				..AggregatorConfig::default()
			},
			registry.clone(),
			transport.clone(),
			routes,
		);
		Fixture {
			aggregator,
			transport,
			registry,
		}
	}

	#[tokio::test]
	async fn s2_exact_output_picks_cheapest_input() {
		let f = fixture(Some(VERIFIER), None).await;
		let solver_a = PrivateKeySigner::random();
		let solver_b = PrivateKeySigner::random();
		register_solver(&f.registry, &solver_a, "https://93.184.216.34:8001").await;
		register_solver(&f.registry, &solver_b, "https://93.184.216.34:8002").await;

		f.transport.set(
			"https://93.184.216.34:8001",
			Behavior::Respond(signed_response(
				&solver_a,
				OrderType::ExactOutput,
				eth(1_200),
				usd(200),
				USER,
			)),
		);
		f.transport.set(
			"https://93.184.216.34:8002",
			Behavior::Respond(signed_response(
				&solver_b,
				OrderType::ExactOutput,
				eth(1_100),
				usd(200),
				USER,
			)),
		);

		let response = f
			.aggregator
			.best_quote(&request(OrderType::ExactOutput, DepositMode::Contract), NOW)
			.await
			.unwrap();

		assert_eq!(response.quote.solver, solver_b.address());
		assert_eq!(response.quote.input_amount, eth(1_100));
		assert!(!response.solver_signature.is_empty());

		// The losing quote comes back signature-less
		assert_eq!(response.alternative_quotes.len(), 1);
		assert_eq!(response.alternative_quotes[0].input_amount, eth(1_200));
		assert!(response.deposit_address.is_none());
	}

	#[tokio::test]
	async fn exact_input_picks_largest_output() {
		let f = fixture(Some(VERIFIER), None).await;
		let solver_a = PrivateKeySigner::random();
		let solver_b = PrivateKeySigner::random();
		register_solver(&f.registry, &solver_a, "https://93.184.216.34:8001").await;
		register_solver(&f.registry, &solver_b, "https://93.184.216.34:8002").await;

		f.transport.set(
			"https://93.184.216.34:8001",
			Behavior::Respond(signed_response(
				&solver_a,
				OrderType::ExactInput,
				eth(1),
				usd(210),
				USER,
			)),
		);
		f.transport.set(
			"https://93.184.216.34:8002",
			Behavior::Respond(signed_response(
				&solver_b,
				OrderType::ExactInput,
				eth(1),
				usd(190),
				USER,
			)),
		);

		let response = f
			.aggregator
			.best_quote(&request(OrderType::ExactInput, DepositMode::Contract), NOW)
			.await
			.unwrap();
		assert_eq!(response.quote.solver, solver_a.address());
		assert_eq!(response.quote.output_amount, usd(210));
	}

	#[tokio::test]
	async fn slow_solvers_are_cancelled_not_awaited() {
		let f = fixture(Some(VERIFIER), None).await;
		let slow = PrivateKeySigner::random();
		let fast = PrivateKeySigner::random();
		register_solver(&f.registry, &slow, "https://93.184.216.34:8001").await;
		register_solver(&f.registry, &fast, "https://93.184.216.34:8002").await;

		f.transport
			.set("https://93.184.216.34:8001", Behavior::Delay(Duration::from_secs(5)));
		f.transport.set(
			"https://93.184.216.34:8002",
			Behavior::Respond(signed_response(
				&fast,
				OrderType::ExactOutput,
				eth(1_300),
				usd(200),
				USER,
			)),
		);

		let started = std::time::Instant::now();
		let response = f
			.aggregator
			.best_quote(&request(OrderType::ExactOutput, DepositMode::Contract), NOW)
			.await
			.unwrap();
		assert!(started.elapsed() < Duration::from_secs(2));
		assert_eq!(response.quote.solver, fast.address());
		assert!(response.alternative_quotes.is_empty());
	}

	#[tokio::test]
	async fn unverifiable_and_mismatched_quotes_are_discarded() {
		let f = fixture(Some(VERIFIER), None).await;
		let honest = PrivateKeySigner::random();
		let forger = PrivateKeySigner::random();
		let confused = PrivateKeySigner::random();
		register_solver(&f.registry, &honest, "https://93.184.216.34:8001").await;
		register_solver(&f.registry, &forger, "https://93.184.216.34:8002").await;
		register_solver(&f.registry, &confused, "https://93.184.216.34:8003").await;

		f.transport.set(
			"https://93.184.216.34:8001",
			Behavior::Respond(signed_response(
				&honest,
				OrderType::ExactOutput,
				eth(1_500),
				usd(200),
				USER,
			)),
		);
		// Signature by a key other than the quoted solver
		let mut forged = signed_response(
			&forger,
			OrderType::ExactOutput,
			eth(1_000),
			usd(200),
			USER,
		);
		forged.quote.solver = honest.address();
		f.transport
			.set("https://93.184.216.34:8002", Behavior::Respond(forged));
		// Quote priced for somebody else entirely
		f.transport.set(
			"https://93.184.216.34:8003",
			Behavior::Respond(signed_response(
				&confused,
				OrderType::ExactOutput,
				eth(900),
				usd(200),
				Address::new([0xcc; 20]),
			)),
		);

		let response = f
			.aggregator
			.best_quote(&request(OrderType::ExactOutput, DepositMode::Contract), NOW)
			.await
			.unwrap();

		// Only the honest quote survived, despite being the worst price
		assert_eq!(response.quote.solver, honest.address());
		assert!(response.alternative_quotes.is_empty());
	}

	#[tokio::test]
	async fn all_failures_is_no_quotes() {
		let f = fixture(Some(VERIFIER), None).await;
		let solver = PrivateKeySigner::random();
		register_solver(&f.registry, &solver, "https://93.184.216.34:8001").await;
		f.transport.set("https://93.184.216.34:8001", Behavior::Fail);

		assert!(matches!(
			f.aggregator
				.best_quote(&request(OrderType::ExactOutput, DepositMode::Contract), NOW)
				.await,
			Err(AggregatorError::NoQuotes)
		));
	}

	#[tokio::test]
	async fn empty_registry_is_no_solvers() {
		let f = fixture(Some(VERIFIER), None).await;
		assert!(matches!(
			f.aggregator
				.best_quote(&request(OrderType::ExactOutput, DepositMode::Contract), NOW)
				.await,
			Err(AggregatorError::NoSolvers(_))
		));
	}

	#[tokio::test]
	async fn missing_verifier_rejects_everything() {
		let f = fixture(None, None).await;
		let solver = PrivateKeySigner::random();
		register_solver(&f.registry, &solver, "https://93.184.216.34:8001").await;

		assert!(matches!(
			f.aggregator
				.best_quote(&request(OrderType::ExactOutput, DepositMode::Contract), NOW)
				.await,
			Err(AggregatorError::VerifierUnconfigured(_))
		));
	}

	#[tokio::test]
	async fn unknown_chain_is_rejected() {
		let f = fixture(Some(VERIFIER), None).await;
		let mut req = request(OrderType::ExactOutput, DepositMode::Contract);
		req.origin_chain_id = ChainId(999);
		assert!(matches!(
			f.aggregator.best_quote(&req, NOW).await,
			Err(AggregatorError::UnknownChain(_))
		));
	}

	#[tokio::test]
	async fn address_mode_attaches_an_independently_derivable_address() {
		let code_hash = firmswap_engine::proxy_init_code_hash(VERIFIER);
		let f = fixture(Some(VERIFIER), Some(code_hash)).await;
		let solver = PrivateKeySigner::random();
		register_solver(&f.registry, &solver, "https://93.184.216.34:8001").await;

		let response_body = signed_response(
			&solver,
			OrderType::ExactOutput,
			eth(1_100),
			usd(200),
			USER,
		);
		f.transport.set(
			"https://93.184.216.34:8001",
			Behavior::Respond(response_body.clone()),
		);

		let response = f
			.aggregator
			.best_quote(&request(OrderType::ExactOutput, DepositMode::Address), NOW)
			.await
			.unwrap();

		let sig_bytes = codec::decode_signature_hex(&response_body.signature).unwrap();
		let expected = firmswap_engine::deposit_address(
			VERIFIER,
			codec::order_id(
				codec::quote_struct_hash(&Quote::from(&response_body.quote)),
				&sig_bytes,
			),
			code_hash,
		);
		assert_eq!(response.deposit_address, Some(expected));
	}
}
