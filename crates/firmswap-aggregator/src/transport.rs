//! Outbound transport to solver `/quote` endpoints.

use async_trait::async_trait;
use firmswap_types::api::{SolverQuoteRequest, SolverQuoteResponse};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
	#[error("request failed: {0}")]
	Request(String),

	#[error("solver returned status {0}")]
	Status(u16),

	#[error("malformed response: {0}")]
	Malformed(String),
}

#[async_trait]
pub trait QuoteTransport: Send + Sync {
	async fn fetch_quote(
		&self,
		endpoint: &str,
		request: &SolverQuoteRequest,
	) -> Result<SolverQuoteResponse, TransportError>;
}

/// reqwest-backed transport. The per-call deadline lives in the
/// aggregator, which wraps every dispatch in its own timeout.
pub struct HttpQuoteTransport {
	client: reqwest::Client,
}

impl HttpQuoteTransport {
	pub fn new() -> Self {
		Self {
			client: reqwest::Client::new(),
		}
	}
}

impl Default for HttpQuoteTransport {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl QuoteTransport for HttpQuoteTransport {
	async fn fetch_quote(
		&self,
		endpoint: &str,
		request: &SolverQuoteRequest,
	) -> Result<SolverQuoteResponse, TransportError> {
		let url = format!("{}/quote", endpoint.trim_end_matches('/'));
		let response = self
			.client
			.post(&url)
			.json(request)
			.send()
			.await
			.map_err(|e| TransportError::Request(e.to_string()))?;

		if !response.status().is_success() {
			return Err(TransportError::Status(response.status().as_u16()));
		}

		response
			.json::<SolverQuoteResponse>()
			.await
			.map_err(|e| TransportError::Malformed(e.to_string()))
	}
}
