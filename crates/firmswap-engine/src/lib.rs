//! The FirmSwap settlement engine: the on-chain protocol rendered as a
//! deterministic state machine.
//!
//! [`SettlementEngine`] owns the nonce bitmap, bond ledger, order store and
//! excess-balance accumulator, and moves ERC-20 balances through a
//! [`bank::TokenBank`]. Each entry point runs in a [`firmswap_types::CallEnv`]
//! (caller + timestamp) and either completes or fails with a single
//! [`firmswap_types::EngineError`] and no partial state change.

pub mod bank;
pub mod bond;
pub mod engine;
pub mod nonce;
pub mod permit2;
pub mod proxy;
pub mod store;

pub use bank::{InMemoryBank, TokenBank};
pub use bond::{BondLedger, BPS_DENOMINATOR, MIN_BOND, RESERVATION_BPS, UNSTAKE_DELAY};
pub use engine::SettlementEngine;
pub use nonce::NonceBitmap;
pub use permit2::PermitTransferFrom;
pub use proxy::{deposit_address, proxy_init_code_hash};
pub use store::OrderStore;
