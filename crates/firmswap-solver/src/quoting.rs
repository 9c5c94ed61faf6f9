//! The quote-serving core: price a request, assign a nonce, sign.

use crate::nonce::NonceAllocator;
use crate::pricing::Pricer;
use crate::signer::QuoteSigner;
use crate::SolverError;
use firmswap_types::api::{SolverQuoteRequest, SolverQuoteResponse, WireQuote};
use firmswap_types::{ChainId, Quote};
use tracing::info;

pub struct SolverCore {
	chain_id: ChainId,
	pricer: Pricer,
	signer: QuoteSigner,
	nonces: NonceAllocator,
}

impl SolverCore {
	pub fn new(
		chain_id: ChainId,
		pricer: Pricer,
		signer: QuoteSigner,
		nonces: NonceAllocator,
	) -> Self {
		Self {
			chain_id,
			pricer,
			signer,
			nonces,
		}
	}

	pub fn address(&self) -> firmswap_types::Address {
		self.signer.address()
	}

	/// Price and sign one request. The returned quote is a firm
	/// commitment: once it leaves this function the nonce is spent for
	/// this instance.
	pub async fn quote(
		&self,
		request: &SolverQuoteRequest,
	) -> Result<SolverQuoteResponse, SolverError> {
		if request.chain_id != self.chain_id {
			return Err(SolverError::WrongChain(request.chain_id, self.chain_id));
		}

		let priced = self.pricer.price(request).await?;
		let nonce = self.nonces.next().await;

		let quote = Quote {
			solver: self.signer.address(),
			user: request.user_address,
			input_token: request.input_token,
			input_amount: priced.input_amount,
			output_token: request.output_token,
			output_amount: priced.output_amount,
			order_type: request.order_type,
			output_chain_id: request.chain_id,
			deposit_deadline: request.deposit_deadline,
			fill_deadline: request.fill_deadline,
			nonce,
		};
		let signature = self.signer.sign(&quote).await?;

		info!(
			nonce = %nonce,
			input = %quote.input_amount,
			output = %quote.output_amount,
			"issued firm quote"
		);
		Ok(SolverQuoteResponse {
			quote: WireQuote::from(&quote),
			signature: format!("0x{}", hex::encode(signature)),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::pricing::{FixedRateAdapter, PricingConfig, TokenInfo};
	use alloy_signer_local::PrivateKeySigner;
	use firmswap_codec as codec;
	use firmswap_types::{Address, OrderType, U256};

	const WETH: Address = Address::new([0x11; 20]);
	const USDX: Address = Address::new([0x12; 20]);
	const ENGINE: Address = Address::new([0xee; 20]);

	fn core() -> SolverCore {
		let adapter = FixedRateAdapter::new().with_market("WETH", "USDX", 2_048.0, 2_052.0);
		let pricer = Pricer::new(
			PricingConfig {
				spread_bps: 0,
				max_order_usd: 1_000_000.0,
			},
			vec![
				TokenInfo {
					address: WETH,
					symbol: "WETH".to_string(),
					decimals: 18,
					usd_price: 2_048.0,
				},
				TokenInfo {
					address: USDX,
					symbol: "USDX".to_string(),
					decimals: 6,
					usd_price: 1.0,
				},
			],
			Box::new(adapter),
		);
		let signer = QuoteSigner::from_signer(PrivateKeySigner::random(), ChainId(1), ENGINE);
		SolverCore::new(ChainId(1), pricer, signer, NonceAllocator::starting_at(U256::ZERO))
	}

	fn request() -> SolverQuoteRequest {
		SolverQuoteRequest {
			input_token: WETH,
			output_token: USDX,
			order_type: OrderType::ExactInput,
			amount: U256::from(10u64).pow(U256::from(18)),
			user_address: Address::new([0xaa; 20]),
			chain_id: ChainId(1),
			deposit_deadline: 1_700_000_300,
			fill_deadline: 1_700_000_420,
		}
	}

	#[tokio::test]
	async fn quotes_are_signed_and_nonces_advance() {
		let core = core();

		let first = core.quote(&request()).await.unwrap();
		let second = core.quote(&request()).await.unwrap();
		assert_eq!(first.quote.nonce, U256::ZERO);
		assert_eq!(second.quote.nonce, U256::from(1u8));

		// The signature verifies against the engine's domain
		let quote = Quote::from(&first.quote);
		let sig = codec::decode_signature_hex(&first.signature).unwrap();
		let domain = codec::quote_domain(ChainId(1), ENGINE);
		assert_eq!(
			codec::recover_quote_signer(&quote, &domain, &sig).unwrap(),
			core.address()
		);

		// 1 WETH at 2048 bid, zero spread
		assert_eq!(first.quote.output_amount, U256::from(2_048_000_000u64));
	}

	#[tokio::test]
	async fn wrong_chain_requests_are_refused() {
		let core = core();
		let mut req = request();
		req.chain_id = ChainId(137);
		assert!(matches!(
			core.quote(&req).await,
			Err(SolverError::WrongChain(_, _))
		));
	}
}
