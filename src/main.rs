//! DDNS Responder
//!
//! Authoritative DNS server that doubles as a key-value store. Values are
//! written and read entirely through query names:
//!
//! ```text
//! <value>.<key>.<nonce>.<token>.ddns-set.<base>   store value under key
//! <key>.<nonce>.<token>.ddns-get.<base>           read it back
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      DDNS RESPONDER                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  UDP Server (5353)      ←── one task per datagram           │
//! │  Responder              ←── grammar, token check, answers   │
//! │  Registry (memory)      ←── key -> value, process lifetime  │
//! │  Status reporter        ←── periodic counters in the log    │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

mod config;
mod dns;
mod metrics;
mod protocol;
mod registry;

use config::DdnsConfig;
use dns::DdnsResponder;
use metrics::Metrics;
use registry::{MemoryRegistry, Registry};

/// DDNS Responder - key-value exchange over DNS query names
#[derive(Parser, Debug)]
#[command(name = "ddns-responder")]
#[command(version)]
#[command(about = "Authoritative DNS responder with a key-value registry in its query names", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "ddns.toml")]
    config: PathBuf,

    /// Base domain the responder is authoritative for
    #[arg(long, env = "GDD_BASE_DOMAIN")]
    base_domain: Option<String>,

    /// Address to listen on
    #[arg(long, env = "GDD_LISTEN_ADDR")]
    listen_addr: Option<IpAddr>,

    /// UDP port to listen on (requires root or CAP_NET_BIND_SERVICE for port 53)
    #[arg(long, env = "GDD_LISTEN_PORT")]
    listen_port: Option<String>,

    /// NS records, `;`-separated, e.g. "example.com. 30 IN NS dns1.example.com."
    #[arg(long, env = "GDD_NS_RECORDS")]
    ns_records: Option<String>,

    /// SOA record, e.g. "example.com. 3600 IN SOA dns1.example.com. admin.example.com. 1 300 300 2592000 7200"
    #[arg(long, env = "GDD_SOA_RECORD")]
    soa_record: Option<String>,

    /// Shared secret carried in every set/get query name
    #[arg(long, env = "GDD_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Seconds between status log lines
    #[arg(long)]
    status_interval_secs: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "GDD_LOG_LEVEL", default_value = "info")]
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

    info!("🌐 DDNS Responder v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = if args.config.exists() {
        DdnsConfig::load(&args.config)?
    } else {
        warn!("Config file {:?} not found, using defaults", args.config);
        DdnsConfig::default()
    };

    // Override config with CLI args and environment
    let config = config
        .with_base_domain(args.base_domain)
        .with_listen_addr(args.listen_addr)
        .with_listen_port(args.listen_port)?
        .with_ns_records(args.ns_records)
        .with_soa_record(args.soa_record)
        .with_token(args.token)
        .with_status_interval(args.status_interval_secs)
        .finalize();

    config.validate()?;
    config.check_static_records();

    info!("⚙️  Configuration:");
    info!("   Base domain: {}", config.base_domain);
    info!("   Listen: {}:{}", config.listen_addr, config.listen_port);
    info!("   NS records: {}", config.ns_records.len());
    info!("   SOA record: {}", config.soa_record());

    let shared_config = Arc::new(config);

    let registry: Arc<dyn Registry> = Arc::new(MemoryRegistry::new());
    let metrics = Arc::new(Metrics::new());

    let responder = Arc::new(DdnsResponder::new(
        shared_config.clone(),
        registry.clone(),
        metrics.clone(),
    ));

    let dns_handle = tokio::spawn(dns::run_dns_server(shared_config.clone(), responder));

    let status_handle = tokio::spawn(run_status_reporter(
        shared_config.clone(),
        registry.clone(),
        metrics.clone(),
    ));

    info!("✅ Responder started at {}", metrics.started_at());
    info!("   Press Ctrl+C to shutdown");

    // Wait for shutdown signal
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("🛑 Shutdown signal received");
        }
        result = dns_handle => {
            match result {
                Ok(Err(e)) => {
                    error!("DNS server exited: {}", e);
                    return Err(e);
                }
                other => error!("DNS server exited: {:?}", other),
            }
        }
        result = status_handle => {
            error!("Status reporter exited: {:?}", result);
        }
    }

    let stats = registry.stats().await;
    info!("👋 DDNS Responder shutting down, {} keys discarded", stats.entries);
    Ok(())
}

/// Periodic status line with counters and registry size
async fn run_status_reporter(
    config: Arc<DdnsConfig>,
    registry: Arc<dyn Registry>,
    metrics: Arc<Metrics>,
) -> anyhow::Result<()> {
    let mut interval = tokio::time::interval(std::time::Duration::from_secs(
        config.status_interval_secs,
    ));
    // The first tick completes immediately
    interval.tick().await;

    loop {
        interval.tick().await;

        let stats = registry.stats().await;
        let snapshot = metrics.snapshot();
        info!(
            "📊 Status: up {}s, {} queries, {} sets, {} gets ({} misses), {} auth failures, {} skipped, {} answers, {} keys ({} bytes)",
            snapshot.uptime_secs,
            snapshot.queries,
            snapshot.sets,
            snapshot.gets,
            snapshot.get_misses,
            snapshot.auth_failures,
            snapshot.skipped_questions,
            snapshot.answers,
            stats.entries,
            stats.value_bytes
        );
    }
}
