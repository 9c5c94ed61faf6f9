use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use firmswap_aggregator::{Aggregator, AggregatorConfig, HttpQuoteTransport, RouteConfig};
use firmswap_chains::{DevChain, SettlementChain};
use firmswap_config::{Config, ConfigLoader};
use firmswap_engine::{InMemoryBank, SettlementEngine};
use firmswap_registry::{RegistryConfig, SolverRegistry};
use firmswap_service::{relay, AppState, RateLimiter};
use firmswap_solver::{
	DepositWatcher, Filler, FixedRateAdapter, NonceAllocator, Pricer, PricingConfig, QuoteSigner,
	SolverCore, TokenInfo, WatcherConfig,
};
use firmswap_storage::{FileStorage, MemoryStorage, Storage};
use firmswap_types::{Address, ChainId};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::signal;
use tokio::sync::{broadcast, mpsc};
use tracing::info;

#[derive(Parser)]
#[command(name = "firmswap-service")]
#[command(about = "FirmSwap aggregator, registry and reference solver", long_about = None)]
struct Cli {
	#[command(subcommand)]
	command: Option<Commands>,

	#[arg(short, long, value_name = "FILE", default_value = "config/local.toml")]
	config: PathBuf,

	#[arg(long, env = "FIRMSWAP_LOG_LEVEL", default_value = "info")]
	log_level: String,
}

#[derive(Subcommand)]
enum Commands {
	/// Start the service
	Start,
	/// Validate the configuration file
	Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();
	setup_tracing(&cli.log_level);

	match cli.command {
		Some(Commands::Start) | None => start_service(cli).await,
		Some(Commands::Validate) => validate_config(cli),
	}
}

async fn start_service(cli: Cli) -> Result<()> {
	info!("starting firmswap service");
	let config =
		ConfigLoader::from_file(&cli.config).context("failed to load configuration")?;

	let storage: Arc<dyn Storage> = match config.storage.backend.as_str() {
		"memory" => Arc::new(MemoryStorage::new()),
		_ => Arc::new(FileStorage::new(PathBuf::from(&config.storage.path))),
	};

	// In-process chains; production deployments substitute an RPC-backed
	// SettlementChain per chain id.
	let mut chains: HashMap<ChainId, Arc<dyn SettlementChain>> = HashMap::new();
	let mut dev_chains: HashMap<ChainId, DevChain> = HashMap::new();
	let genesis = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.unwrap_or_default()
		.as_secs();
	for (chain_id, chain_config) in &config.chains {
		let engine_address = chain_config.engine.unwrap_or(Address::ZERO);
		let engine = SettlementEngine::new(
			*chain_id,
			engine_address,
			Address::ZERO,
			Address::ZERO,
			InMemoryBank::new(),
		);
		let chain = DevChain::new(engine, genesis);
		info!(chain = %chain_id, name = %chain_config.name, "hosting in-process dev chain");
		chains.insert(*chain_id, Arc::new(chain.clone()));
		dev_chains.insert(*chain_id, chain);
	}

	let mut registry = SolverRegistry::new(
		RegistryConfig {
			max_solvers_per_chain: config.registry.max_solvers_per_chain,
			dev_mode: config.api.dev_mode,
		},
		storage,
	);
	// Registrations verify the candidate's on-chain bond where a chain
	// view exists
	for (chain_id, chain) in &chains {
		registry = registry.attach_chain(*chain_id, chain.clone());
	}
	let registry = Arc::new(registry);
	let chain_ids: Vec<ChainId> = config.chains.keys().copied().collect();
	registry
		.load(&chain_ids)
		.await
		.context("failed to restore solver registry")?;

	let routes: HashMap<ChainId, RouteConfig> = config
		.chains
		.iter()
		.map(|(chain_id, chain_config)| {
			(
				*chain_id,
				RouteConfig {
					chain_id: *chain_id,
					verifying_contract: chain_config.engine,
					proxy_code_hash: chain_config.proxy_code_hash,
				},
			)
		})
		.collect();
	let aggregator = Arc::new(Aggregator::new(
		AggregatorConfig {
			max_fan_out: config.aggregator.max_fan_out,
			quote_timeout: Duration::from_millis(config.aggregator.quote_timeout_ms),
			default_deposit_window: config.aggregator.default_deposit_window_secs,
			default_fill_window: config.aggregator.default_fill_window_secs,
		},
		registry.clone(),
		Arc::new(HttpQuoteTransport::new()),
		routes,
	));

	let (events, _) = broadcast::channel(1_024);
	let chains = Arc::new(chains);
	let mut background = relay::spawn_relays(&chains, events.clone(), Duration::from_secs(1));

	let solver_core = match &config.solver {
		Some(section) => Some(Arc::new(
			start_solver(section, &config, &dev_chains, &mut background).await?,
		)),
		None => None,
	};

	let state = AppState {
		aggregator,
		registry,
		chains,
		limiter: Arc::new(RateLimiter::per_minute()),
		events,
		solver: solver_core,
	};

	let app = firmswap_service::router(state);
	let bind_address = format!("{}:{}", config.api.host, config.api.port);
	let listener = tokio::net::TcpListener::bind(&bind_address)
		.await
		.with_context(|| format!("failed to bind {}", bind_address))?;
	info!("listening on {}", bind_address);

	axum::serve(listener, app)
		.with_graceful_shutdown(shutdown_signal())
		.await
		.context("server error")?;

	info!("shutdown signal received, stopping background tasks");
	for handle in background {
		handle.abort();
	}
	Ok(())
}

async fn start_solver(
	section: &firmswap_config::SolverSection,
	config: &Config,
	dev_chains: &HashMap<ChainId, DevChain>,
	background: &mut Vec<tokio::task::JoinHandle<()>>,
) -> Result<SolverCore> {
	let chain = dev_chains
		.get(&section.chain_id)
		.context("solver chain is not hosted")?;
	let chain_config = config
		.chains
		.get(&section.chain_id)
		.context("solver chain is not configured")?;
	let engine_address = chain_config
		.engine
		.context("solver chain has no engine address")?;

	let signer = QuoteSigner::new(&section.private_key, section.chain_id, engine_address)
		.map_err(|e| anyhow::anyhow!("solver signer: {}", e))?;
	let solver_address = signer.address();

	let tokens: Vec<TokenInfo> = section
		.tokens
		.iter()
		.map(|t| TokenInfo {
			address: t.address,
			symbol: t.symbol.clone(),
			decimals: t.decimals,
			usd_price: t.usd_price,
		})
		.collect();
	// The dev deployment prices off the configured USD marks; a production
	// solver plugs a live exchange adapter in here.
	let mut adapter = FixedRateAdapter::new();
	for base in &section.tokens {
		for quote in &section.tokens {
			if base.address != quote.address && quote.usd_price > 0.0 {
				let price = base.usd_price / quote.usd_price;
				adapter = adapter.with_market(&base.symbol, &quote.symbol, price, price);
			}
		}
	}
	let pricer = Pricer::new(
		PricingConfig {
			spread_bps: section.spread_bps,
			max_order_usd: section.max_order_usd,
		},
		tokens,
		Box::new(adapter),
	);

	let solver_chain: Arc<dyn SettlementChain> = Arc::new(chain.with_account(solver_address));
	let nonces =
		NonceAllocator::initialize(solver_chain.as_ref(), solver_address, section.nonce_scan_window)
			.await
			.map_err(|e| anyhow::anyhow!("nonce scan: {}", e))?;

	let (jobs_tx, jobs_rx) = mpsc::channel(256);
	let watcher = DepositWatcher::new(
		solver_chain.clone(),
		solver_address,
		WatcherConfig {
			poll_interval: Duration::from_secs(section.poll_interval_secs),
			start_block: None,
		},
		jobs_tx,
	);
	let filler = Filler::new(solver_chain, jobs_rx);
	background.push(tokio::spawn(watcher.run()));
	background.push(tokio::spawn(filler.run()));

	info!(solver = %solver_address, chain = %section.chain_id, "reference solver running");
	Ok(SolverCore::new(
		section.chain_id,
		pricer,
		signer,
		nonces,
	))
}

fn validate_config(cli: Cli) -> Result<()> {
	let config = ConfigLoader::from_file(&cli.config).context("configuration is invalid")?;
	info!("configuration is valid");
	info!("chains: {}", config.chains.len());
	info!("solver enabled: {}", config.solver.is_some());
	Ok(())
}

fn setup_tracing(log_level: &str) {
	let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));
	tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

async fn shutdown_signal() {
	let ctrl_c = async {
		signal::ctrl_c()
			.await
			.expect("failed to install Ctrl+C handler");
	};

	#[cfg(unix)]
	let terminate = async {
		signal::unix::signal(signal::unix::SignalKind::terminate())
			.expect("failed to install signal handler")
			.recv()
			.await;
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {},
		_ = terminate => {},
	}
}
