//! EIP-712 typed-data hashing for quotes and order-id derivation.

use crate::CodecError;
use alloy_primitives::{keccak256, Address, Signature, B256};
use alloy_sol_types::{eip712_domain, sol, Eip712Domain, SolStruct, SolValue};
use firmswap_types::{ChainId, Quote};

sol! {
	/// On-chain struct the solver signs. Field order and names define the
	/// type string, so they are frozen.
	struct FirmSwapQuote {
		address solver;
		address user;
		address inputToken;
		uint256 inputAmount;
		address outputToken;
		uint256 outputAmount;
		uint8 orderType;
		uint256 outputChainId;
		uint32 depositDeadline;
		uint32 fillDeadline;
		uint256 nonce;
	}
}

impl From<&Quote> for FirmSwapQuote {
	fn from(q: &Quote) -> Self {
		Self {
			solver: q.solver,
			user: q.user,
			inputToken: q.input_token,
			inputAmount: q.input_amount,
			outputToken: q.output_token,
			outputAmount: q.output_amount,
			orderType: q.order_type.as_u8(),
			outputChainId: alloy_primitives::U256::from(q.output_chain_id.0),
			depositDeadline: q.deposit_deadline,
			fillDeadline: q.fill_deadline,
			nonce: q.nonce,
		}
	}
}

/// The signing domain: `{name: "FirmSwap", version: "1", chainId, verifyingContract}`.
pub fn quote_domain(chain_id: ChainId, verifying_contract: Address) -> Eip712Domain {
	eip712_domain! {
		name: "FirmSwap",
		version: "1",
		chain_id: chain_id.0,
		verifying_contract: verifying_contract,
	}
}

/// EIP-712 struct hash of a quote (its off-chain identity).
pub fn quote_struct_hash(quote: &Quote) -> B256 {
	FirmSwapQuote::from(quote).eip712_hash_struct()
}

/// Full typed-data digest: `keccak256(0x1901 ‖ domainSeparator ‖ structHash)`.
pub fn quote_digest(quote: &Quote, domain: &Eip712Domain) -> B256 {
	FirmSwapQuote::from(quote).eip712_signing_hash(domain)
}

/// `orderId = keccak256(abi.encode(quoteHash, keccak256(solverSignature)))`.
pub fn order_id(quote_hash: B256, solver_signature: &[u8]) -> B256 {
	let sig_hash = keccak256(solver_signature);
	keccak256((quote_hash, sig_hash).abi_encode())
}

/// Recover the signer of a quote digest from a 65-byte signature.
pub fn recover_quote_signer(
	quote: &Quote,
	domain: &Eip712Domain,
	signature: &[u8],
) -> Result<Address, CodecError> {
	let digest = quote_digest(quote, domain);
	recover_prehash(digest, signature)
}

/// Recover the signer of an arbitrary 32-byte digest.
pub fn recover_prehash(digest: B256, signature: &[u8]) -> Result<Address, CodecError> {
	let sig = Signature::try_from(signature)
		.map_err(|e| CodecError::MalformedSignature(e.to_string()))?;
	sig.recover_address_from_prehash(&digest)
		.map_err(|e| CodecError::Recovery(e.to_string()))
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::U256;
	use alloy_signer::SignerSync;
	use alloy_signer_local::PrivateKeySigner;
	use firmswap_types::OrderType;

	fn quote(solver: Address) -> Quote {
		Quote {
			solver,
			user: Address::from([2u8; 20]),
			input_token: Address::from([3u8; 20]),
			input_amount: U256::from(1148u64) * U256::from(10u64).pow(U256::from(18)),
			output_token: Address::from([4u8; 20]),
			output_amount: U256::from(200_000_000u64),
			order_type: OrderType::ExactOutput,
			output_chain_id: ChainId(1),
			deposit_deadline: 1_700_000_300,
			fill_deadline: 1_700_000_420,
			nonce: U256::ZERO,
		}
	}

	#[test]
	fn type_string_is_frozen() {
		assert_eq!(
			FirmSwapQuote::eip712_encode_type(),
			"FirmSwapQuote(address solver,address user,address inputToken,uint256 inputAmount,address outputToken,uint256 outputAmount,uint8 orderType,uint256 outputChainId,uint32 depositDeadline,uint32 fillDeadline,uint256 nonce)"
		);
	}

	#[test]
	fn digest_is_deterministic_and_field_sensitive() {
		let q = quote(Address::from([1u8; 20]));
		let domain = quote_domain(ChainId(1), Address::from([0xee; 20]));

		assert_eq!(quote_digest(&q, &domain), quote_digest(&q, &domain));

		let mut other = q.clone();
		other.nonce = U256::from(1u64);
		assert_ne!(quote_digest(&q, &domain), quote_digest(&other, &domain));

		// Domain binds chain id and verifying contract
		let other_domain = quote_domain(ChainId(137), Address::from([0xee; 20]));
		assert_ne!(quote_digest(&q, &domain), quote_digest(&q, &other_domain));
	}

	#[test]
	fn order_id_matches_manual_derivation() {
		let quote_hash = B256::from([7u8; 32]);
		let sig = [9u8; 65];

		let mut encoded = Vec::with_capacity(64);
		encoded.extend_from_slice(quote_hash.as_slice());
		encoded.extend_from_slice(keccak256(sig).as_slice());

		assert_eq!(order_id(quote_hash, &sig), keccak256(&encoded));
	}

	#[test]
	fn signing_round_trip_recovers_solver() {
		let signer = PrivateKeySigner::random();
		let q = quote(signer.address());
		let domain = quote_domain(ChainId(1), Address::from([0xee; 20]));

		let digest = quote_digest(&q, &domain);
		let sig = signer.sign_hash_sync(&digest).unwrap();

		let recovered = recover_quote_signer(&q, &domain, &sig.as_bytes()).unwrap();
		assert_eq!(recovered, signer.address());
	}

	#[test]
	fn tampered_signature_does_not_recover_solver() {
		let signer = PrivateKeySigner::random();
		let q = quote(signer.address());
		let domain = quote_domain(ChainId(1), Address::from([0xee; 20]));

		let mut sig = signer
			.sign_hash_sync(&quote_digest(&q, &domain))
			.unwrap()
			.as_bytes();
		sig[5] ^= 0xff;

		match recover_quote_signer(&q, &domain, &sig) {
			Ok(addr) => assert_ne!(addr, signer.address()),
			Err(_) => {}
		}
	}
}
