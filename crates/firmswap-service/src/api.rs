//! Route table, handlers, and error mapping for the public API.

use crate::state::{now_ms, now_secs, AppState};
use axum::extract::ws::WebSocket;
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use firmswap_aggregator::AggregatorError;
use firmswap_registry::RegistryError;
use firmswap_types::api::{
	ErrorResponse, OrderStatusResponse, QuoteRequest, QuoteResponse, RegisterSolverRequest,
	SolverQuoteRequest, UnregisterSolverRequest,
};
use firmswap_types::{Address, ChainId, OrderId, OrderState, U256};
use std::str::FromStr;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/:chain_id/quote", post(quote))
		.route("/v1/:chain_id/order/:order_id", get(order_status))
		.route("/v1/:chain_id/solvers/register", post(register_solver))
		.route("/v1/:chain_id/solvers/:address", delete(unregister_solver))
		.route("/v1/:chain_id/solvers", get(list_solvers))
		.route("/v1/ws", get(ws_stream))
		// Served when this process doubles as the reference solver
		.route("/solver/quote", post(solver_quote))
		.layer(TraceLayer::new_for_http())
		.layer(CorsLayer::permissive())
		.with_state(state)
}

pub struct ApiError {
	status: StatusCode,
	code: &'static str,
	message: String,
}

impl ApiError {
	fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
		Self {
			status,
			code,
			message: message.into(),
		}
	}

	fn bad_request(message: impl Into<String>) -> Self {
		Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
	}

	fn not_found(message: impl Into<String>) -> Self {
		Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
	}

	fn rate_limited() -> Self {
		Self::new(
			StatusCode::TOO_MANY_REQUESTS,
			"RATE_LIMITED",
			"rate limit exceeded",
		)
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		(
			self.status,
			Json(ErrorResponse {
				error: self.code.to_string(),
				message: self.message,
			}),
		)
			.into_response()
	}
}

impl From<AggregatorError> for ApiError {
	fn from(e: AggregatorError) -> Self {
		match e {
			AggregatorError::UnknownChain(_) => {
				Self::new(StatusCode::NOT_FOUND, "UNKNOWN_CHAIN", e.to_string())
			}
			AggregatorError::NoSolvers(_) => {
				Self::new(StatusCode::SERVICE_UNAVAILABLE, "NO_SOLVERS", e.to_string())
			}
			AggregatorError::NoQuotes => {
				Self::new(StatusCode::SERVICE_UNAVAILABLE, "NO_QUOTES", e.to_string())
			}
			AggregatorError::VerifierUnconfigured(_) => Self::new(
				StatusCode::SERVICE_UNAVAILABLE,
				"VERIFIER_UNCONFIGURED",
				e.to_string(),
			),
		}
	}
}

impl From<RegistryError> for ApiError {
	fn from(e: RegistryError) -> Self {
		match e {
			RegistryError::InvalidSignature | RegistryError::StaleTimestamp => {
				Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", e.to_string())
			}
			RegistryError::Endpoint(_) | RegistryError::InsufficientOnChainBond => {
				Self::new(StatusCode::BAD_REQUEST, "INVALID_REGISTRATION", e.to_string())
			}
			RegistryError::CapacityExceeded(_) => Self::new(
				StatusCode::SERVICE_UNAVAILABLE,
				"CAPACITY_EXCEEDED",
				e.to_string(),
			),
			RegistryError::NotRegistered(_) => {
				Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", e.to_string())
			}
			RegistryError::Storage(_) | RegistryError::Chain(_) => {
				warn!(error = %e, "registry backend failure");
				Self::new(
					StatusCode::INTERNAL_SERVER_ERROR,
					"INTERNAL",
					"internal error",
				)
			}
		}
	}
}

/// Client key for rate limiting: the first forwarded address, or a local
/// bucket when none is present.
fn client_key(headers: &HeaderMap) -> String {
	headers
		.get("x-forwarded-for")
		.and_then(|v| v.to_str().ok())
		.and_then(|v| v.split(',').next())
		.map(|v| v.trim().to_string())
		.unwrap_or_else(|| "local".to_string())
}

fn check_rate(
	state: &AppState,
	route: &str,
	headers: &HeaderMap,
	limit: usize,
) -> Result<(), ApiError> {
	if !state.limiter.check(route, &client_key(headers), limit) {
		return Err(ApiError::rate_limited());
	}
	Ok(())
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
	let mut chains = serde_json::Map::new();
	for (chain_id, chain) in state.chains.iter() {
		let healthy = chain.block_number().await.is_ok();
		chains.insert(chain_id.to_string(), serde_json::json!(healthy));
	}
	Json(serde_json::json!({
		"status": "ok",
		"chains": chains,
	}))
}

async fn quote(
	State(state): State<AppState>,
	Path(chain_id): Path<u64>,
	headers: HeaderMap,
	Json(request): Json<QuoteRequest>,
) -> Result<Json<QuoteResponse>, ApiError> {
	check_rate(&state, "quote", &headers, 30)?;
	if request.origin_chain_id != ChainId(chain_id) {
		return Err(ApiError::bad_request(
			"originChainId does not match the route",
		));
	}
	let response = state.aggregator.best_quote(&request, now_secs()).await?;
	Ok(Json(response))
}

async fn order_status(
	State(state): State<AppState>,
	Path((chain_id, order_id)): Path<(u64, String)>,
	headers: HeaderMap,
) -> Result<Json<OrderStatusResponse>, ApiError> {
	check_rate(&state, "order", &headers, 60)?;
	let chain = state
		.chain(ChainId(chain_id))
		.ok_or_else(|| ApiError::not_found("unknown chain"))?;
	let order_id =
		OrderId::from_str(&order_id).map_err(|_| ApiError::bad_request("malformed order id"))?;

	let order = chain
		.order(order_id)
		.await
		.map_err(|e| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL", e.to_string()))?;

	let response = match order {
		Some(record) => OrderStatusResponse {
			order_id,
			state: record.state,
			user: record.user,
			solver: record.solver,
			input_token: record.input_token,
			input_amount: record.input_amount,
			output_token: record.output_token,
			output_amount: record.output_amount,
			fill_deadline: record.fill_deadline,
		},
		// Mirrors the on-chain view: unknown ids read as zeroed records
		None => OrderStatusResponse {
			order_id,
			state: OrderState::None,
			user: Address::ZERO,
			solver: Address::ZERO,
			input_token: Address::ZERO,
			input_amount: U256::ZERO,
			output_token: Address::ZERO,
			output_amount: U256::ZERO,
			fill_deadline: 0,
		},
	};
	Ok(Json(response))
}

async fn register_solver(
	State(state): State<AppState>,
	Path(chain_id): Path<u64>,
	headers: HeaderMap,
	Json(request): Json<RegisterSolverRequest>,
) -> Result<Json<firmswap_types::RegisteredSolver>, ApiError> {
	check_rate(&state, "register", &headers, 5)?;
	let chain_id = ChainId(chain_id);
	if state.chain(chain_id).is_none() {
		return Err(ApiError::not_found("unknown chain"));
	}
	let solver = state.registry.register(chain_id, &request, now_ms()).await?;
	Ok(Json(solver))
}

async fn unregister_solver(
	State(state): State<AppState>,
	Path((chain_id, address)): Path<(u64, String)>,
	headers: HeaderMap,
	Json(request): Json<UnregisterSolverRequest>,
) -> Result<StatusCode, ApiError> {
	check_rate(&state, "unregister", &headers, 10)?;
	let chain_id = ChainId(chain_id);
	if state.chain(chain_id).is_none() {
		return Err(ApiError::not_found("unknown chain"));
	}
	let address =
		Address::from_str(&address).map_err(|_| ApiError::bad_request("malformed address"))?;
	state
		.registry
		.unregister(chain_id, address, &request, now_ms())
		.await?;
	Ok(StatusCode::NO_CONTENT)
}

async fn list_solvers(
	State(state): State<AppState>,
	Path(chain_id): Path<u64>,
	headers: HeaderMap,
) -> Result<Json<Vec<firmswap_types::RegisteredSolver>>, ApiError> {
	check_rate(&state, "solvers", &headers, 60)?;
	let chain_id = ChainId(chain_id);
	if state.chain(chain_id).is_none() {
		return Err(ApiError::not_found("unknown chain"));
	}
	Ok(Json(state.registry.solvers(chain_id).await))
}

async fn ws_stream(State(state): State<AppState>, upgrade: WebSocketUpgrade) -> Response {
	let receiver = state.events.subscribe();
	upgrade.on_upgrade(move |socket| stream_events(socket, receiver))
}

async fn stream_events(
	mut socket: WebSocket,
	mut receiver: tokio::sync::broadcast::Receiver<firmswap_types::api::WsEvent>,
) {
	use axum::extract::ws::Message;

	loop {
		tokio::select! {
			event = receiver.recv() => {
				let Ok(event) = event else { break };
				let Ok(body) = serde_json::to_string(&event) else { continue };
				if socket.send(Message::Text(body)).await.is_err() {
					break;
				}
			}
			inbound = socket.recv() => {
				match inbound {
					Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
					_ => {}
				}
			}
		}
	}
}

async fn solver_quote(
	State(state): State<AppState>,
	headers: HeaderMap,
	Json(request): Json<SolverQuoteRequest>,
) -> Result<Json<firmswap_types::api::SolverQuoteResponse>, ApiError> {
	check_rate(&state, "solver_quote", &headers, 60)?;
	let solver = state
		.solver
		.as_ref()
		.ok_or_else(|| ApiError::not_found("this deployment does not serve quotes"))?;
	let response = solver
		.quote(&request)
		.await
		.map_err(|e| ApiError::bad_request(e.to_string()))?;
	Ok(Json(response))
}
