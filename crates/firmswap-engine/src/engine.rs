//! Settlement engine entry points: deposit, fill, settle, refund, recover,
//! and solver bond management.
//!
//! State writes precede token movement, and every failure path returns
//! before the first write: checks (including transfer funding) run first,
//! so an error never leaves partial state. The `&mut self` receiver is the
//! transaction scope; there is no reentrant path back into the engine.

use crate::bank::TokenBank;
use crate::bond::{self, BondLedger};
use crate::nonce::NonceBitmap;
use crate::permit2::{permit2_domain, PermitTransferFrom};
use crate::proxy;
use crate::store::OrderStore;
use alloy_sol_types::Eip712Domain;
use firmswap_codec as codec;
use firmswap_types::{
	Address, CallEnv, ChainId, EngineError, EngineEvent, OrderId, OrderRecord, OrderState, Quote,
	ResolvedOutput, ResolvedSwapOrder, Result, SolverRecord, SwapFillInstruction, B256, U256,
};
use std::collections::HashMap;

pub struct SettlementEngine<B: TokenBank> {
	chain_id: ChainId,
	address: Address,
	bond_token: Address,
	proxy_code_hash: B256,
	domain: Eip712Domain,
	permit_domain: Eip712Domain,
	bank: B,
	bonds: BondLedger,
	nonces: NonceBitmap,
	permit_nonces: NonceBitmap,
	orders: OrderStore,
	excess: HashMap<(Address, Address), U256>,
	proxies: HashMap<OrderId, Address>,
	events: Vec<EngineEvent>,
}

impl<B: TokenBank> SettlementEngine<B> {
	pub fn new(
		chain_id: ChainId,
		address: Address,
		bond_token: Address,
		permit2: Address,
		bank: B,
	) -> Self {
		Self {
			chain_id,
			address,
			bond_token,
			proxy_code_hash: proxy::proxy_init_code_hash(address),
			domain: codec::quote_domain(chain_id, address),
			permit_domain: permit2_domain(chain_id, permit2),
			bank,
			bonds: BondLedger::new(),
			nonces: NonceBitmap::new(),
			permit_nonces: NonceBitmap::new(),
			orders: OrderStore::new(),
			excess: HashMap::new(),
			proxies: HashMap::new(),
			events: Vec::new(),
		}
	}

	// ---- views ----

	pub fn chain_id(&self) -> ChainId {
		self.chain_id
	}

	pub fn address(&self) -> Address {
		self.address
	}

	pub fn bond_token(&self) -> Address {
		self.bond_token
	}

	pub fn domain(&self) -> &Eip712Domain {
		&self.domain
	}

	pub fn permit_domain(&self) -> &Eip712Domain {
		&self.permit_domain
	}

	/// Exposed so off-chain consumers can derive deposit addresses
	/// independently and compare.
	pub fn proxy_code_hash(&self) -> B256 {
		self.proxy_code_hash
	}

	pub fn order(&self, order_id: OrderId) -> Option<&OrderRecord> {
		self.orders.get(order_id)
	}

	pub fn solver(&self, solver: Address) -> SolverRecord {
		self.bonds.get(solver)
	}

	pub fn is_nonce_used(&self, solver: Address, nonce: U256) -> bool {
		self.nonces.is_used(solver, nonce)
	}

	pub fn available_bond(&self, solver: Address) -> U256 {
		self.bonds.available(solver)
	}

	pub fn excess_balance(&self, user: Address, token: Address) -> U256 {
		self.excess
			.get(&(user, token))
			.copied()
			.unwrap_or(U256::ZERO)
	}

	/// Deterministic deposit address for a (quote, signature) pair.
	pub fn compute_deposit_address(&self, quote: &Quote, solver_signature: &[u8]) -> Address {
		let order_id = codec::order_id(codec::quote_struct_hash(quote), solver_signature);
		proxy::deposit_address(self.address, order_id, self.proxy_code_hash)
	}

	pub fn bank(&self) -> &B {
		&self.bank
	}

	pub fn bank_mut(&mut self) -> &mut B {
		&mut self.bank
	}

	/// Take all events emitted since the last drain. The host stamps them
	/// with block numbers.
	pub fn drain_events(&mut self) -> Vec<EngineEvent> {
		std::mem::take(&mut self.events)
	}

	// ---- deposit paths ----

	/// Contract-deposit: the caller delivers input tokens to the engine and
	/// the solver fills later.
	pub fn deposit(&mut self, quote: &Quote, signature: &[u8], env: CallEnv) -> Result<OrderId> {
		let quote_hash = self.validate_quote(quote, signature, env.timestamp, false)?;
		let order_id = codec::order_id(quote_hash, signature);
		self.check_replay(order_id, quote.solver, quote.nonce)?;
		self.bonds.check_reserve(quote.solver, quote.output_amount)?;
		if !self
			.bank
			.can_pull(quote.input_token, self.address, env.caller, quote.input_amount)
		{
			return Err(EngineError::TokenTransfer(
				"deposit pull would fail: balance or allowance too low".into(),
			));
		}

		self.nonces.mark_used(quote.solver, quote.nonce)?;
		self.bonds.reserve(quote.solver, quote.output_amount)?;
		self.orders
			.create(order_id, OrderRecord::from_quote(quote, OrderState::Deposited))?;

		let received = self.pull_to_self(quote.input_token, env.caller, quote.input_amount)?;
		self.orders
			.get_mut(order_id)
			.ok_or(EngineError::OrderNotFound)?
			.input_amount = received;

		self.events.push(EngineEvent::Deposited {
			order_id,
			user: quote.user,
			solver: quote.solver,
			input_token: quote.input_token,
			input_amount: received,
			output_token: quote.output_token,
			output_amount: quote.output_amount,
			fill_deadline: quote.fill_deadline,
		});
		self.events.push(self.open_event(order_id, quote));
		Ok(order_id)
	}

	/// Contract-deposit funded through a Permit2-style signature transfer;
	/// tokens are drawn from the permit signer.
	pub fn deposit_with_permit2(
		&mut self,
		quote: &Quote,
		signature: &[u8],
		permit: &PermitTransferFrom,
		permit_signature: &[u8],
		env: CallEnv,
	) -> Result<OrderId> {
		let quote_hash = self.validate_quote(quote, signature, env.timestamp, false)?;
		let order_id = codec::order_id(quote_hash, signature);
		self.check_replay(order_id, quote.solver, quote.nonce)?;
		self.bonds.check_reserve(quote.solver, quote.output_amount)?;

		permit.check(quote.input_token, quote.input_amount, self.address, env.timestamp)?;
		let owner = permit.recover_owner(&self.permit_domain, permit_signature)?;
		if self.permit_nonces.is_used(owner, permit.nonce) {
			return Err(EngineError::NonceAlreadyUsed);
		}
		if !self
			.bank
			.can_transfer(quote.input_token, owner, quote.input_amount)
		{
			return Err(EngineError::TokenTransfer(
				"permit transfer would fail: owner balance too low".into(),
			));
		}

		self.nonces.mark_used(quote.solver, quote.nonce)?;
		self.permit_nonces.mark_used(owner, permit.nonce)?;
		self.bonds.reserve(quote.solver, quote.output_amount)?;
		self.orders
			.create(order_id, OrderRecord::from_quote(quote, OrderState::Deposited))?;

		let before = self.bank.balance_of(quote.input_token, self.address);
		self.bank
			.transfer(quote.input_token, owner, self.address, quote.input_amount)?;
		let received = self.bank.balance_of(quote.input_token, self.address) - before;
		self.orders
			.get_mut(order_id)
			.ok_or(EngineError::OrderNotFound)?
			.input_amount = received;

		self.events.push(EngineEvent::Deposited {
			order_id,
			user: quote.user,
			solver: quote.solver,
			input_token: quote.input_token,
			input_amount: received,
			output_token: quote.output_token,
			output_amount: quote.output_amount,
			fill_deadline: quote.fill_deadline,
		});
		self.events.push(self.open_event(order_id, quote));
		Ok(order_id)
	}

	/// Solver settles a contract-deposit order: delivers output to the
	/// user, collects the deposited input, releases its reservation.
	pub fn fill(&mut self, order_id: OrderId, env: CallEnv) -> Result<()> {
		let order = self
			.orders
			.get(order_id)
			.ok_or(EngineError::OrderNotFound)?
			.clone();
		if order.state != OrderState::Deposited {
			return Err(EngineError::OrderNotDeposited);
		}
		if env.caller != order.solver {
			return Err(EngineError::NotSolver);
		}
		if env.timestamp > order.fill_deadline as u64 {
			return Err(EngineError::QuoteExpired);
		}
		if !self.bank.can_pull(
			order.output_token,
			self.address,
			order.solver,
			order.output_amount,
		) {
			return Err(EngineError::TokenTransfer(
				"fill pull would fail: solver balance or allowance too low".into(),
			));
		}
		if !self
			.bank
			.can_transfer(order.input_token, self.address, order.input_amount)
		{
			return Err(EngineError::TokenTransfer(
				"engine does not hold the deposited input".into(),
			));
		}

		self.orders
			.transition(order_id, OrderState::Deposited, OrderState::Settled)?;
		self.bonds.release(order.solver, order.output_amount);

		self.bank.transfer_from(
			order.output_token,
			self.address,
			order.solver,
			order.user,
			order.output_amount,
		)?;
		self.bank
			.transfer(order.input_token, self.address, order.solver, order.input_amount)?;

		self.events.push(EngineEvent::Settled {
			order_id,
			user: order.user,
			solver: order.solver,
		});
		Ok(())
	}

	// ---- address-deposit paths ----

	/// Atomic settlement of an address deposit.
	pub fn settle(&mut self, quote: &Quote, signature: &[u8], env: CallEnv) -> Result<OrderId> {
		self.settle_inner(quote, signature, None, env)
	}

	/// As [`Self::settle`], but the solver explicitly accepts a deposit of
	/// `accepted_input_amount ≤ quote.inputAmount`. The user still receives
	/// the full quoted output.
	pub fn settle_with_tolerance(
		&mut self,
		quote: &Quote,
		signature: &[u8],
		accepted_input_amount: U256,
		env: CallEnv,
	) -> Result<OrderId> {
		self.settle_inner(quote, signature, Some(accepted_input_amount), env)
	}

	fn settle_inner(
		&mut self,
		quote: &Quote,
		signature: &[u8],
		accepted: Option<U256>,
		env: CallEnv,
	) -> Result<OrderId> {
		if let Some(a) = accepted {
			if a.is_zero() || a > quote.input_amount {
				return Err(EngineError::InvalidQuote);
			}
		}
		let quote_hash = self.validate_quote(quote, signature, env.timestamp, false)?;
		if env.caller != quote.solver {
			return Err(EngineError::NotSolver);
		}
		let order_id = codec::order_id(quote_hash, signature);
		self.check_replay(order_id, quote.solver, quote.nonce)?;

		let deposit_addr = proxy::deposit_address(self.address, order_id, self.proxy_code_hash);
		let required = accepted.unwrap_or(quote.input_amount);
		let deposited = self.bank.balance_of(quote.input_token, deposit_addr);
		if deposited < required {
			return Err(EngineError::InsufficientDeposit);
		}
		// Read-side bond check only: the atomic path never carries an open
		// reservation.
		self.bonds.check_reserve(quote.solver, quote.output_amount)?;
		if !self.bank.can_pull(
			quote.output_token,
			self.address,
			quote.solver,
			quote.output_amount,
		) {
			return Err(EngineError::TokenTransfer(
				"settle pull would fail: solver balance or allowance too low".into(),
			));
		}

		self.nonces.mark_used(quote.solver, quote.nonce)?;
		self.orders
			.create(order_id, OrderRecord::from_quote(quote, OrderState::Settled))?;
		self.proxies.insert(order_id, deposit_addr);

		let received = self.sweep_to_self(quote.input_token, deposit_addr)?;
		self.bank.transfer_from(
			quote.output_token,
			self.address,
			quote.solver,
			quote.user,
			quote.output_amount,
		)?;

		let to_solver = received.min(quote.input_amount);
		self.bank
			.transfer(quote.input_token, self.address, quote.solver, to_solver)?;
		let excess = received - to_solver;
		if !excess.is_zero() {
			let entry = self
				.excess
				.entry((quote.user, quote.input_token))
				.or_insert(U256::ZERO);
			*entry += excess;
			self.events.push(EngineEvent::ExcessDeposit {
				user: quote.user,
				token: quote.input_token,
				amount: excess,
			});
		}
		self.orders
			.get_mut(order_id)
			.ok_or(EngineError::OrderNotFound)?
			.input_amount = to_solver;

		self.events.push(EngineEvent::Settled {
			order_id,
			user: quote.user,
			solver: quote.solver,
		});
		self.events.push(self.open_event(order_id, quote));
		Ok(order_id)
	}

	// ---- default paths ----

	/// Force a refund of a defaulted contract-deposit order. Callable by
	/// anyone once the fill deadline has passed.
	pub fn refund(&mut self, order_id: OrderId, env: CallEnv) -> Result<()> {
		let order = self
			.orders
			.get(order_id)
			.ok_or(EngineError::OrderNotFound)?
			.clone();
		if order.state != OrderState::Deposited {
			return Err(EngineError::OrderNotDeposited);
		}
		if env.timestamp <= order.fill_deadline as u64 {
			return Err(EngineError::OrderNotExpired);
		}
		let prospective_slash =
			bond::reserve_for(order.output_amount).min(self.bonds.get(order.solver).total_bond);
		if !self
			.bank
			.can_transfer(order.input_token, self.address, order.input_amount)
		{
			return Err(EngineError::TokenTransfer(
				"engine does not hold the deposited input".into(),
			));
		}
		if !prospective_slash.is_zero()
			&& !self
				.bank
				.can_transfer(self.bond_token, self.address, prospective_slash)
		{
			return Err(EngineError::TokenTransfer(
				"engine does not hold the slashable bond".into(),
			));
		}

		self.orders
			.transition(order_id, OrderState::Deposited, OrderState::Refunded)?;
		let slashed = self.bonds.slash(order.solver, order.output_amount);

		self.bank
			.transfer(order.input_token, self.address, order.user, order.input_amount)?;
		if !slashed.is_zero() {
			self.bank
				.transfer(self.bond_token, self.address, order.user, slashed)?;
		}

		self.events.push(EngineEvent::Refunded {
			order_id,
			user: order.user,
			input_amount: order.input_amount,
			bond_slashed: slashed,
		});
		Ok(())
	}

	/// Refund an address deposit whose solver never settled. The bond is
	/// slashed only when the deposit fully funded the quote, so dusting the
	/// address cannot grief the solver.
	pub fn refund_address_deposit(
		&mut self,
		quote: &Quote,
		signature: &[u8],
		env: CallEnv,
	) -> Result<OrderId> {
		let quote_hash = self.validate_quote(quote, signature, env.timestamp, true)?;
		let order_id = codec::order_id(quote_hash, signature);
		self.check_replay(order_id, quote.solver, quote.nonce)?;
		if env.timestamp <= quote.fill_deadline as u64 {
			return Err(EngineError::OrderNotExpired);
		}

		let deposit_addr = proxy::deposit_address(self.address, order_id, self.proxy_code_hash);
		let deposited = self.bank.balance_of(quote.input_token, deposit_addr);
		if deposited.is_zero() {
			return Err(EngineError::InsufficientDeposit);
		}
		let prospective_slash = if deposited >= quote.input_amount {
			bond::reserve_for(quote.output_amount).min(self.bonds.get(quote.solver).total_bond)
		} else {
			U256::ZERO
		};
		if !prospective_slash.is_zero()
			&& !self
				.bank
				.can_transfer(self.bond_token, self.address, prospective_slash)
		{
			return Err(EngineError::TokenTransfer(
				"engine does not hold the slashable bond".into(),
			));
		}

		self.nonces.mark_used(quote.solver, quote.nonce)?;
		let mut record = OrderRecord::from_quote(quote, OrderState::Refunded);
		record.input_amount = U256::ZERO;
		self.orders.create(order_id, record)?;
		self.proxies.insert(order_id, deposit_addr);

		let swept = self.sweep_to_self(quote.input_token, deposit_addr)?;
		self.bank
			.transfer(quote.input_token, self.address, quote.user, swept)?;
		let slashed = if deposited >= quote.input_amount {
			self.bonds.slash(quote.solver, quote.output_amount)
		} else {
			U256::ZERO
		};
		if !slashed.is_zero() {
			self.bank
				.transfer(self.bond_token, self.address, quote.user, slashed)?;
		}
		self.orders
			.get_mut(order_id)
			.ok_or(EngineError::OrderNotFound)?
			.input_amount = swept;

		self.events.push(EngineEvent::Refunded {
			order_id,
			user: quote.user,
			input_amount: swept,
			bond_slashed: slashed,
		});
		Ok(order_id)
	}

	// ---- recovery paths ----

	/// Sweep any token still sitting at an order's deployed proxy to the
	/// user. Callable by anyone; no bond effect.
	pub fn recover_from_proxy(
		&mut self,
		quote: &Quote,
		signature: &[u8],
		token: Address,
		_env: CallEnv,
	) -> Result<()> {
		let recovered = codec::recover_quote_signer(quote, &self.domain, signature)
			.map_err(|_| EngineError::InvalidSignature)?;
		if recovered != quote.solver {
			return Err(EngineError::InvalidSignature);
		}
		let order_id = codec::order_id(codec::quote_struct_hash(quote), signature);
		let order = self
			.orders
			.get(order_id)
			.ok_or(EngineError::OrderNotFound)?
			.clone();
		if !order.state.is_terminal() {
			return Err(EngineError::InvalidQuote);
		}
		let proxy_addr = *self.proxies.get(&order_id).ok_or(EngineError::InvalidQuote)?;

		let amount = self.bank.balance_of(token, proxy_addr);
		self.bank.transfer(token, proxy_addr, order.user, amount)?;

		self.events.push(EngineEvent::TokensRecovered {
			order_id,
			token,
			to: order.user,
			amount,
		});
		Ok(())
	}

	/// Deploy the proxy for an order that never progressed because only a
	/// wrong token arrived at its deposit address, and sweep that token to
	/// the user. Consumes the nonce; no bond effect.
	pub fn deploy_and_recover(
		&mut self,
		quote: &Quote,
		signature: &[u8],
		token: Address,
		env: CallEnv,
	) -> Result<OrderId> {
		if token == quote.input_token {
			return Err(EngineError::InvalidQuote);
		}
		let quote_hash = self.validate_quote(quote, signature, env.timestamp, true)?;
		let order_id = codec::order_id(quote_hash, signature);
		self.check_replay(order_id, quote.solver, quote.nonce)?;
		if env.timestamp <= quote.fill_deadline as u64 {
			return Err(EngineError::OrderNotExpired);
		}

		let deposit_addr = proxy::deposit_address(self.address, order_id, self.proxy_code_hash);

		self.nonces.mark_used(quote.solver, quote.nonce)?;
		let mut record = OrderRecord::from_quote(quote, OrderState::Refunded);
		record.input_amount = U256::ZERO;
		self.orders.create(order_id, record)?;
		self.proxies.insert(order_id, deposit_addr);

		let amount = self.bank.balance_of(token, deposit_addr);
		self.bank.transfer(token, deposit_addr, quote.user, amount)?;

		self.events.push(EngineEvent::TokensRecovered {
			order_id,
			token,
			to: quote.user,
			amount,
		});
		Ok(order_id)
	}

	/// Withdraw the caller's accumulated input overpayments for a token.
	pub fn withdraw_excess(&mut self, token: Address, env: CallEnv) -> Result<U256> {
		let key = (env.caller, token);
		let amount = self.excess.get(&key).copied().unwrap_or(U256::ZERO);
		if amount.is_zero() {
			return Err(EngineError::NoExcessBalance);
		}
		if !self.bank.can_transfer(token, self.address, amount) {
			return Err(EngineError::TokenTransfer(
				"engine does not hold the excess balance".into(),
			));
		}

		self.excess.remove(&key);
		self.bank.transfer(token, self.address, env.caller, amount)?;

		self.events.push(EngineEvent::ExcessWithdrawn {
			user: env.caller,
			token,
			amount,
		});
		Ok(amount)
	}

	// ---- solver management ----

	pub fn register_solver(&mut self, amount: U256, env: CallEnv) -> Result<()> {
		if self.bonds.is_registered(env.caller) {
			return Err(EngineError::SolverAlreadyRegistered);
		}
		if amount < U256::from(bond::MIN_BOND) {
			return Err(EngineError::BelowMinimumBond);
		}
		if !self
			.bank
			.can_pull(self.bond_token, self.address, env.caller, amount)
		{
			return Err(EngineError::TokenTransfer(
				"bond pull would fail: balance or allowance too low".into(),
			));
		}

		let received = self.pull_to_self(self.bond_token, env.caller, amount)?;
		self.bonds.register(env.caller, received)?;

		self.events.push(EngineEvent::SolverRegistered {
			solver: env.caller,
			bond: received,
		});
		Ok(())
	}

	pub fn add_bond(&mut self, amount: U256, env: CallEnv) -> Result<()> {
		if !self.bonds.is_registered(env.caller) {
			return Err(EngineError::SolverNotRegistered);
		}
		if !self
			.bank
			.can_pull(self.bond_token, self.address, env.caller, amount)
		{
			return Err(EngineError::TokenTransfer(
				"bond pull would fail: balance or allowance too low".into(),
			));
		}

		let received = self.pull_to_self(self.bond_token, env.caller, amount)?;
		self.bonds.add(env.caller, received)?;

		self.events.push(EngineEvent::BondAdded {
			solver: env.caller,
			amount: received,
		});
		Ok(())
	}

	pub fn request_unstake(&mut self, amount: U256, env: CallEnv) -> Result<()> {
		let unlock_time = self.bonds.request_unstake(env.caller, amount, env.timestamp)?;
		self.events.push(EngineEvent::UnstakeRequested {
			solver: env.caller,
			amount,
			unlock_time,
		});
		Ok(())
	}

	pub fn cancel_unstake(&mut self, env: CallEnv) -> Result<()> {
		self.bonds.cancel_unstake(env.caller)?;
		self.events
			.push(EngineEvent::UnstakeCancelled { solver: env.caller });
		Ok(())
	}

	pub fn execute_unstake(&mut self, env: CallEnv) -> Result<U256> {
		let record = self.bonds.get(env.caller);
		if !self.bonds.is_registered(env.caller) {
			return Err(EngineError::SolverNotRegistered);
		}
		if !record.has_pending_unstake() {
			return Err(EngineError::NoPendingUnstake);
		}
		if env.timestamp < record.unstake_unlock_time {
			return Err(EngineError::UnstakeNotReady);
		}
		if !self
			.bank
			.can_transfer(self.bond_token, self.address, record.unstake_amount)
		{
			return Err(EngineError::TokenTransfer(
				"engine does not hold the unstake amount".into(),
			));
		}

		let amount = self.bonds.execute_unstake(env.caller, env.timestamp)?;
		self.bank
			.transfer(self.bond_token, self.address, env.caller, amount)?;

		self.events.push(EngineEvent::UnstakeExecuted {
			solver: env.caller,
			amount,
		});
		Ok(amount)
	}

	/// Cancel a single unused nonce of the caller's.
	pub fn cancel_nonce(&mut self, nonce: U256, env: CallEnv) -> Result<()> {
		self.nonces.mark_used(env.caller, nonce)?;
		let bit_index = (nonce & U256::from(0xffu8)).to::<usize>();
		self.events.push(EngineEvent::NonceCancelled {
			solver: env.caller,
			word_index: nonce >> 8usize,
			mask: U256::from(1u8) << bit_index,
		});
		Ok(())
	}

	/// Cancel a whole word's worth of the caller's nonces at once.
	pub fn cancel_nonces(&mut self, word_index: U256, mask: U256, env: CallEnv) -> Result<()> {
		self.nonces.mark_many(env.caller, word_index, mask);
		self.events.push(EngineEvent::NonceCancelled {
			solver: env.caller,
			word_index,
			mask,
		});
		Ok(())
	}

	// ---- internals ----

	/// Signature + deadline + field + chain validation shared by every
	/// quote-bearing entry point. Replay checks are separate so order-id
	/// collisions surface as `OrderAlreadyExists` before the nonce check.
	fn validate_quote(
		&self,
		quote: &Quote,
		signature: &[u8],
		now: u64,
		skip_deposit_deadline: bool,
	) -> Result<B256> {
		quote.check(self.chain_id, now, skip_deposit_deadline)?;
		let recovered = codec::recover_quote_signer(quote, &self.domain, signature)
			.map_err(|_| EngineError::InvalidSignature)?;
		if recovered != quote.solver {
			return Err(EngineError::InvalidSignature);
		}
		Ok(codec::quote_struct_hash(quote))
	}

	fn check_replay(&self, order_id: OrderId, solver: Address, nonce: U256) -> Result<()> {
		if self.orders.exists(order_id) {
			return Err(EngineError::OrderAlreadyExists);
		}
		if !self.bonds.is_registered(solver) {
			return Err(EngineError::SolverNotRegistered);
		}
		if self.nonces.is_used(solver, nonce) {
			return Err(EngineError::NonceAlreadyUsed);
		}
		Ok(())
	}

	/// Allowance-gated pull into the engine, accounted by balance
	/// difference.
	fn pull_to_self(&mut self, token: Address, owner: Address, amount: U256) -> Result<U256> {
		let before = self.bank.balance_of(token, self.address);
		self.bank
			.transfer_from(token, self.address, owner, self.address, amount)?;
		Ok(self.bank.balance_of(token, self.address) - before)
	}

	/// Deploy-and-sweep of a deposit proxy, accounted by balance
	/// difference.
	fn sweep_to_self(&mut self, token: Address, proxy_addr: Address) -> Result<U256> {
		let balance = self.bank.balance_of(token, proxy_addr);
		let before = self.bank.balance_of(token, self.address);
		self.bank.transfer(token, proxy_addr, self.address, balance)?;
		Ok(self.bank.balance_of(token, self.address) - before)
	}

	fn open_event(&self, order_id: OrderId, quote: &Quote) -> EngineEvent {
		EngineEvent::Open(ResolvedSwapOrder {
			order_id,
			user: quote.user,
			origin_chain_id: self.chain_id,
			open_deadline: quote.deposit_deadline,
			fill_deadline: quote.fill_deadline,
			max_spent: vec![ResolvedOutput {
				token: quote.input_token,
				amount: quote.input_amount,
				recipient: quote.solver,
				chain_id: self.chain_id,
			}],
			min_received: vec![ResolvedOutput {
				token: quote.output_token,
				amount: quote.output_amount,
				recipient: quote.user,
				chain_id: quote.output_chain_id,
			}],
			fill_instructions: vec![SwapFillInstruction {
				destination_chain_id: quote.output_chain_id,
				destination_settler: self.address,
				order_id,
			}],
		})
	}
}
