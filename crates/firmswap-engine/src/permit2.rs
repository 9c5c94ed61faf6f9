//! Permit2-style signature transfers for gasless deposits.
//!
//! The user signs a one-time transfer authorization instead of holding an
//! allowance toward the engine; the deposit pull draws from the signer.
//! Permit nonces are unordered and tracked in their own bitmap, scoped to
//! the token owner.

use alloy_sol_types::{eip712_domain, sol, Eip712Domain, SolStruct};
use firmswap_types::{Address, ChainId, EngineError, Result, Timestamp, B256, U256};

sol! {
	struct TokenPermissions {
		address token;
		uint256 amount;
	}

	struct PermitTransferFrom {
		TokenPermissions permitted;
		address spender;
		uint256 nonce;
		uint256 deadline;
	}
}

/// Signing domain of the assumed Permit2 deployment.
pub fn permit2_domain(chain_id: ChainId, permit2: Address) -> Eip712Domain {
	eip712_domain! {
		name: "Permit2",
		chain_id: chain_id.0,
		verifying_contract: permit2,
	}
}

impl PermitTransferFrom {
	pub fn new(token: Address, amount: U256, spender: Address, nonce: U256, deadline: U256) -> Self {
		Self {
			permitted: TokenPermissions { token, amount },
			spender,
			nonce,
			deadline,
		}
	}

	pub fn signing_hash(&self, domain: &Eip712Domain) -> B256 {
		self.eip712_signing_hash(domain)
	}

	/// Recover the token owner who signed this permit.
	pub fn recover_owner(&self, domain: &Eip712Domain, signature: &[u8]) -> Result<Address> {
		firmswap_codec::eip712::recover_prehash(self.signing_hash(domain), signature)
			.map_err(|_| EngineError::InvalidSignature)
	}

	/// Structural checks against the deposit being authorized.
	pub fn check(
		&self,
		input_token: Address,
		input_amount: U256,
		engine: Address,
		now: Timestamp,
	) -> Result<()> {
		if self.permitted.token != input_token || self.permitted.amount < input_amount {
			return Err(EngineError::InvalidQuote);
		}
		if self.spender != engine {
			return Err(EngineError::InvalidQuote);
		}
		if self.deadline < U256::from(now) {
			return Err(EngineError::QuoteExpired);
		}
		Ok(())
	}
}
