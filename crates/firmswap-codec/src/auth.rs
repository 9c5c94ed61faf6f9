//! EIP-191 personal-sign messages authorizing registry mutations.

use crate::CodecError;
use alloy_primitives::{eip191_hash_message, Address};

/// Canonical message a solver signs to register an endpoint.
/// Timestamp is Unix milliseconds.
pub fn registration_message(address: Address, endpoint: &str, timestamp_ms: u64) -> String {
	format!(
		"FirmSwap Solver Registration\nAddress: {:#x}\nEndpoint: {}\nTimestamp: {}",
		address, endpoint, timestamp_ms
	)
}

/// Canonical message a solver signs to unregister.
pub fn unregistration_message(address: Address, timestamp_ms: u64) -> String {
	format!(
		"FirmSwap Solver Unregistration\nAddress: {:#x}\nTimestamp: {}",
		address, timestamp_ms
	)
}

/// Recover the EIP-191 signer of a personal-sign message.
pub fn recover_personal_signer(message: &str, signature: &[u8]) -> Result<Address, CodecError> {
	let digest = eip191_hash_message(message.as_bytes());
	crate::eip712::recover_prehash(digest, signature)
}
