//! Reference solver: pricing against an exchange feed, EIP-712 quote
//! signing with monotonic nonces, on-chain deposit monitoring, and a
//! strictly serial fill queue.

pub mod filler;
pub mod nonce;
pub mod pricing;
pub mod quoting;
pub mod signer;
pub mod watcher;

pub use quoting::SolverCore;
pub use filler::{FillJob, Filler};
pub use nonce::NonceAllocator;
pub use pricing::{ExchangeAdapter, FixedRateAdapter, Pricer, PricingConfig, PricingError, Ticker, TokenInfo};
pub use signer::QuoteSigner;
pub use watcher::{DepositWatcher, WatcherConfig};

use firmswap_chains::ChainError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SolverError {
	#[error(transparent)]
	Pricing(#[from] PricingError),

	#[error(transparent)]
	Chain(#[from] ChainError),

	#[error("signing failed: {0}")]
	Signing(String),

	#[error("fill aborted: {0}")]
	Fill(String),

	#[error("request targets chain {0}, this solver serves {1}")]
	WrongChain(firmswap_types::ChainId, firmswap_types::ChainId),
}
