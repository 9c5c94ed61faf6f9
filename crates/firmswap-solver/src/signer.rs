//! EIP-712 quote signing with the solver's local key.

use crate::SolverError;
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use firmswap_codec as codec;
use firmswap_types::{Address, ChainId, Quote};

pub struct QuoteSigner {
	signer: PrivateKeySigner,
	domain: codec::Eip712Domain,
}

impl QuoteSigner {
	/// `verifying_contract` is the settlement engine the quotes bind to.
	pub fn new(
		private_key_hex: &str,
		chain_id: ChainId,
		verifying_contract: Address,
	) -> Result<Self, SolverError> {
		let signer = private_key_hex
			.parse::<PrivateKeySigner>()
			.map_err(|e| SolverError::Signing(format!("invalid private key: {}", e)))?;
		Ok(Self {
			signer,
			domain: codec::quote_domain(chain_id, verifying_contract),
		})
	}

	pub fn from_signer(
		signer: PrivateKeySigner,
		chain_id: ChainId,
		verifying_contract: Address,
	) -> Self {
		Self {
			signer,
			domain: codec::quote_domain(chain_id, verifying_contract),
		}
	}

	pub fn address(&self) -> Address {
		self.signer.address()
	}

	/// 65-byte signature over the quote's typed-data digest.
	pub async fn sign(&self, quote: &Quote) -> Result<Vec<u8>, SolverError> {
		let digest = codec::quote_digest(quote, &self.domain);
		let signature = self
			.signer
			.sign_hash(&digest)
			.await
			.map_err(|e| SolverError::Signing(e.to_string()))?;
		Ok(signature.as_bytes().to_vec())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use firmswap_types::{OrderType, U256};

	#[tokio::test]
	async fn signatures_verify_against_the_same_domain() {
		let key = PrivateKeySigner::random();
		let engine = Address::new([0xee; 20]);
		let signer = QuoteSigner::from_signer(key, ChainId(1), engine);

		let quote = Quote {
			solver: signer.address(),
			user: Address::new([0xaa; 20]),
			input_token: Address::new([0x11; 20]),
			input_amount: U256::from(10u64).pow(U256::from(18)),
			output_token: Address::new([0x12; 20]),
			output_amount: U256::from(2_000_000u64),
			order_type: OrderType::ExactInput,
			output_chain_id: ChainId(1),
			deposit_deadline: 300,
			fill_deadline: 420,
			nonce: U256::ZERO,
		};

		let sig = signer.sign(&quote).await.unwrap();
		let domain = codec::quote_domain(ChainId(1), engine);
		assert_eq!(
			codec::recover_quote_signer(&quote, &domain, &sig).unwrap(),
			signer.address()
		);
	}
}
