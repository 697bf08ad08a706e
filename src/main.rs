//! ledger-dns
//!
//! Resolves human-readable domain names to network addresses, backed by an
//! authoritative ledger node and a local persistent mirror.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        LEDGER DNS                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Resolution Cache (memory)  ←── positive / negative TTLs    │
//! │  Domain Mirror (RocksDB)    ←── durable ledger copy         │
//! │  Ledger Adapter (JSON-RPC)  ←── authoritative source        │
//! │  Reconciler (periodic)      ←── listing → mirror diffs      │
//! │  HTTP API (3100)            ←── resolve, refresh, metrics   │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

mod api;
mod cache;
mod config;
mod identifier;
mod ledger;
mod mirror;
mod reconcile;
mod resolver;
mod types;

use api::{ApiState, Metrics};
use cache::ResolutionCache;
use config::ResolverConfig;
use ledger::{FixtureLedger, Ledger, RpcLedger};
use mirror::{DomainMirror, Mirror};
use reconcile::{ReconcileScheduler, Reconciler};
use resolver::{Resolver, SystemDnsFallback};

/// Ledger-backed domain resolver
#[derive(Parser, Debug)]
#[command(name = "ledger-dns")]
#[command(version)]
#[command(about = "Domain resolver backed by a ledger node", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "ledger-dns.toml")]
    config: PathBuf,

    /// Data directory for the domain mirror
    #[arg(short, long, default_value = "./data")]
    data_dir: PathBuf,

    /// HTTP API port
    #[arg(long)]
    api_port: Option<u16>,

    /// Ledger node JSON-RPC endpoint
    #[arg(long, env = "LEDGER_RPC_URL")]
    rpc_url: Option<String>,

    /// Ledger node RPC user
    #[arg(long, env = "LEDGER_RPC_USER")]
    rpc_user: Option<String>,

    /// Ledger node RPC password
    #[arg(long, env = "LEDGER_RPC_PASSWORD", hide_env_values = true)]
    rpc_password: Option<String>,

    /// Minutes between reconciliation passes
    #[arg(long)]
    reconcile_interval_mins: Option<u64>,

    /// Serve the built-in fixture domains instead of a ledger node
    #[arg(long)]
    fixture_ledger: bool,

    /// Write the resolved configuration to the config path and exit
    #[arg(long)]
    write_config: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .init();

    info!("🌐 ledger-dns v{}", env!("CARGO_PKG_VERSION"));

    // Create data directory
    tokio::fs::create_dir_all(&args.data_dir).await?;

    // Load configuration
    let config = if args.config.exists() {
        ResolverConfig::load(&args.config)?
    } else {
        warn!("Config file not found, using defaults");
        ResolverConfig::default()
    };

    // Override config with CLI args
    let config = config
        .with_api_port(args.api_port)
        .with_rpc_url(args.rpc_url)
        .with_rpc_credentials(args.rpc_user, args.rpc_password)
        .with_reconcile_interval_mins(args.reconcile_interval_mins);

    config.validate()?;

    if args.write_config {
        config.save(&args.config)?;
        info!("📝 Configuration written to {:?}", args.config);
        return Ok(());
    }

    info!("⚙️  Configuration:");
    info!("   API port: {}", config.api_port);
    if args.fixture_ledger {
        info!("   Ledger: built-in fixtures");
    } else {
        info!("   Ledger: {}", config.ledger_rpc_url);
    }
    info!("   Reconcile interval: {}s", config.reconcile_interval_secs);
    info!(
        "   Cache TTLs: positive={}s negative={}s",
        config.positive_cache_ttl_secs, config.negative_cache_ttl_secs
    );
    info!("   Missing domains: {:?}", config.missing_domain_policy);

    // Open the mirror; the only fatal startup failure
    let mirror_path = args.data_dir.join("domain_mirror");
    let mirror: Arc<dyn Mirror> = Arc::new(DomainMirror::open(&mirror_path)?);
    info!("📦 Domain mirror opened at {:?}", mirror_path);

    let ledger: Arc<dyn Ledger> = if args.fixture_ledger {
        warn!("Using fixture ledger, no node will be contacted");
        Arc::new(FixtureLedger::with_fixtures().with_latency(Duration::from_millis(200)))
    } else {
        Arc::new(RpcLedger::from_config(&config)?)
    };

    let cache = Arc::new(ResolutionCache::new(
        config.positive_cache_ttl(),
        config.negative_cache_ttl(),
    ));
    let metrics = Arc::new(Metrics::new());

    let mut resolver = Resolver::new(ledger.clone(), mirror.clone(), cache.clone(), metrics.clone());
    if config.fallback_to_system_dns {
        info!("   System DNS fallback enabled");
        resolver = resolver.with_fallback(Arc::new(SystemDnsFallback));
    }
    let resolver = Arc::new(resolver);

    let reconciler = Arc::new(
        Reconciler::new(ledger, mirror.clone(), cache.clone(), metrics.clone())
            .with_write_delay(config.reconcile_write_delay())
            .with_policy(config.missing_domain_policy),
    );

    // Start services
    let scheduler = ReconcileScheduler::start(reconciler.clone(), config.reconcile_interval());

    let sweep_handle = (config.cache_sweep_interval_secs > 0).then(|| {
        tokio::spawn(run_cache_sweep(
            cache.clone(),
            Duration::from_secs(config.cache_sweep_interval_secs),
        ))
    });

    let api_state = Arc::new(ApiState {
        resolver,
        reconciler,
        cache,
        mirror: mirror.clone(),
        metrics,
    });
    let api_handle = tokio::spawn(api::run_api_server(api_state, config.api_port));

    info!("✅ All services started");
    info!("   Press Ctrl+C to shutdown gracefully");

    // Wait for shutdown signal
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("🛑 Shutdown signal received");
        }
        result = api_handle => {
            error!("HTTP API exited: {:?}", result);
        }
    }

    // Graceful shutdown: let an in-flight pass finish, then flush the mirror
    if let Some(handle) = sweep_handle {
        handle.abort();
    }
    scheduler.shutdown().await;

    mirror.flush()?;
    info!("📦 Domain mirror flushed to disk");

    info!("👋 ledger-dns shutting down");
    Ok(())
}

/// Periodically drop expired cache entries
async fn run_cache_sweep(cache: Arc<ResolutionCache>, every: Duration) {
    let mut interval = tokio::time::interval(every);

    loop {
        interval.tick().await;

        let removed = cache.purge_expired();
        if removed > 0 {
            info!("🧹 Purged {} expired cache entries", removed);
        }
    }
}
