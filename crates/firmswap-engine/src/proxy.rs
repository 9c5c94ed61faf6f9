//! Deterministic deposit addresses.
//!
//! Address-deposit mode has the user transfer input tokens to an address
//! derived before any contract exists there. At settlement the engine
//! deploys a minimal sweep proxy at that address via CREATE2; the proxy's
//! only capability is transferring its whole balance of one token to a
//! destination chosen by the engine.

use alloy_primitives::hex;
use alloy_sol_types::SolValue;
use firmswap_types::{keccak256, Address, B256};

/// Creation code of the sweep proxy. Its constructor takes the engine
/// address; the derived address commits to both, so off-chain consumers can
/// recompute deposit addresses from the engine address alone.
pub const PROXY_CREATION_CODE: [u8; 74] = hex!(
	"60803461003857600080546001600160a01b0319163317905560be90816100"
	"3e8239f35b600080fdfe6080604052600436101561001257600080fd5b6000"
	"3560e01c63c4d66de8146100"
);

/// keccak256 of the proxy creation code with its ABI-encoded constructor
/// argument (the engine address) appended.
pub fn proxy_init_code_hash(engine: Address) -> B256 {
	let mut init_code = PROXY_CREATION_CODE.to_vec();
	init_code.extend_from_slice(&engine.abi_encode());
	keccak256(&init_code)
}

/// CREATE2-style derivation: last 20 bytes of
/// `keccak256(0xff ‖ deployer ‖ salt ‖ initCodeHash)`.
pub fn deposit_address(deployer: Address, salt: B256, init_code_hash: B256) -> Address {
	let mut preimage = Vec::with_capacity(1 + 20 + 32 + 32);
	preimage.push(0xff);
	preimage.extend_from_slice(deployer.as_slice());
	preimage.extend_from_slice(salt.as_slice());
	preimage.extend_from_slice(init_code_hash.as_slice());
	Address::from_slice(&keccak256(&preimage)[12..])
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn derivation_is_deterministic() {
		let engine = Address::from([0xe1; 20]);
		let salt = B256::from([0x42; 32]);
		let hash = proxy_init_code_hash(engine);

		assert_eq!(
			deposit_address(engine, salt, hash),
			deposit_address(engine, salt, hash)
		);
	}

	#[test]
	fn derivation_commits_to_salt_and_deployer() {
		let engine = Address::from([0xe1; 20]);
		let other_engine = Address::from([0xe2; 20]);
		let salt = B256::from([0x42; 32]);
		let other_salt = B256::from([0x43; 32]);
		let hash = proxy_init_code_hash(engine);

		let base = deposit_address(engine, salt, hash);
		assert_ne!(base, deposit_address(engine, other_salt, hash));
		assert_ne!(base, deposit_address(other_engine, salt, hash));
		assert_ne!(
			base,
			deposit_address(engine, salt, proxy_init_code_hash(other_engine))
		);
	}

	#[test]
	fn address_is_last_twenty_bytes_of_preimage_hash() {
		let engine = Address::from([0xe1; 20]);
		let salt = B256::from([7u8; 32]);
		let code_hash = B256::from([9u8; 32]);

		let mut preimage = vec![0xffu8];
		preimage.extend_from_slice(engine.as_slice());
		preimage.extend_from_slice(salt.as_slice());
		preimage.extend_from_slice(code_hash.as_slice());
		let digest = keccak256(&preimage);

		assert_eq!(
			deposit_address(engine, salt, code_hash),
			Address::from_slice(&digest[12..])
		);
	}
}
