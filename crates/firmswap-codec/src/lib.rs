//! Canonical hashing and signature handling for FirmSwap quotes.
//!
//! The EIP-712 struct here MUST stay byte-identical to the on-chain
//! definition; the digest it produces is both the thing solvers sign and
//! half of the order-id derivation.

pub mod auth;
pub mod eip712;

pub use alloy_sol_types::Eip712Domain;
pub use auth::{recover_personal_signer, registration_message, unregistration_message};
pub use eip712::{
	order_id, quote_digest, quote_domain, quote_struct_hash, recover_quote_signer, FirmSwapQuote,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
	#[error("malformed signature: {0}")]
	MalformedSignature(String),

	#[error("signature recovery failed: {0}")]
	Recovery(String),
}

/// Decode a 65-byte signature from its 0x-prefixed hex wire form.
pub fn decode_signature_hex(s: &str) -> Result<Vec<u8>, CodecError> {
	let stripped = s.strip_prefix("0x").unwrap_or(s);
	let bytes =
		hex::decode(stripped).map_err(|e| CodecError::MalformedSignature(e.to_string()))?;
	if bytes.len() != 65 {
		return Err(CodecError::MalformedSignature(format!(
			"expected 65 bytes, got {}",
			bytes.len()
		)));
	}
	Ok(bytes)
}
