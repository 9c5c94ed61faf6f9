//! Shared types for the FirmSwap protocol: quotes, orders, solver records,
//! engine events, the error taxonomy, and the JSON wire shapes.

pub mod api;
pub mod common;
pub mod errors;
pub mod events;
pub mod order;
pub mod quote;
pub mod solver;

pub use common::*;
pub use errors::{EngineError, Result};
pub use events::*;
pub use order::*;
pub use quote::*;
pub use solver::*;
