//! HTTP and WebSocket surface for the FirmSwap aggregator, registry and
//! order views.

pub mod api;
pub mod rate_limit;
pub mod relay;
pub mod state;

pub use api::router;
pub use rate_limit::RateLimiter;
pub use relay::EventRelay;
pub use state::AppState;
