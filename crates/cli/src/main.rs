//! Process entry point: loads configuration, wires the cache, trust-anchor
//! store, resolver core, and worker engine together, and drives the
//! UDP/TCP listening loops on a single `current_thread` runtime plus one
//! `LocalSet` (§5) — the same bootstrap shape as the teacher's server, minus
//! the web dashboard and multi-worker `SO_REUSEPORT` fan-out this resolver's
//! single-task concurrency model has no use for.

use std::net::IpAddr;
use std::rc::Rc;
use std::time::Duration;

use clap::Parser;
use tern_dns_application::ports::DnsEngine;
use tern_dns_application::HandleQueryUseCase;
use tern_dns_domain::config::{CliOverrides, Config};
use tern_dns_domain::ProtocolFlags;
use tern_dns_runtime::cache::{self, InMemoryKv};
use tern_dns_runtime::network::NetworkEndpoints;
use tern_dns_runtime::resolver::ResolverCore;
use tern_dns_runtime::trust_anchor::TrustAnchorStore;
use tern_dns_runtime::worker::ResolverEngine;
use tracing::{info, warn};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "tern-dns")]
#[command(version)]
#[command(about = "Caching iterative DNS resolver")]
struct Cli {
    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<String>,

    /// Listen port
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// Bind address
    #[arg(short = 'b', long)]
    bind: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let overrides = CliOverrides {
        port: cli.port,
        bind_address: cli.bind.clone(),
        log_level: cli.log_level.clone(),
    };
    let config = Config::load(cli.config.as_deref(), overrides)?;
    config.validate()?;

    let log_level = config.logging.level.parse().unwrap_or(tracing::Level::INFO);
    tracing_subscriber::fmt()
        .with_target(true)
        .with_thread_ids(false)
        .with_level(true)
        .with_max_level(log_level)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "starting tern-dns");
    info!(
        bind = %config.server.bind_address,
        port = config.server.port,
        udp = config.server.udp,
        tcp = config.server.tcp,
        "configuration loaded"
    );

    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    let local = tokio::task::LocalSet::new();
    local.block_on(&runtime, run(config))
}

async fn run(config: Config) -> anyhow::Result<()> {
    if !config.server.udp && !config.server.tcp {
        warn!("neither udp nor tcp listeners are enabled, exiting");
        return Ok(());
    }

    let kv: Rc<dyn tern_dns_application::ports::KvBackend> =
        Rc::new(InMemoryKv::with_config(config.cache.clone()));
    let trust_anchors = if config.trust_anchor.seed_root_anchor {
        TrustAnchorStore::with_root_anchor().into_rc()
    } else {
        TrustAnchorStore::empty().into_rc()
    };
    let core = Rc::new(ResolverCore::new(kv, trust_anchors, None, config.resolver.clone()));
    let engine: Rc<dyn DnsEngine> = Rc::new(ResolverEngine::new(core));
    let handler = Rc::new(HandleQueryUseCase::new(engine));

    let network = Rc::new(NetworkEndpoints::new(handler));

    let mut protocols = ProtocolFlags::empty();
    if config.server.udp {
        protocols = protocols.union(ProtocolFlags::UDP);
    }
    if config.server.tcp {
        protocols = protocols.union(ProtocolFlags::TCP);
    }

    let bind_address: IpAddr = config
        .server
        .bind_address
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid bind address: {}", config.server.bind_address))?;

    network
        .listen(bind_address, config.server.port, protocols, config.server.tcp_backlog)
        .await?;
    info!(bind = %bind_address, port = config.server.port, "listening");

    tokio::task::spawn_local(run_clock_tick()).await?;
    Ok(())
}

/// Resynchronize the coarse cache clock against the wall clock once a
/// second (§4.1) — frequent enough that `drift`/`materialize` track real
/// elapsed time within a second, too infrequent to cost a syscall per cache
/// lookup the way an uncached `SystemTime::now()` would.
async fn run_clock_tick() {
    let mut interval = tokio::time::interval(Duration::from_secs(1));
    loop {
        interval.tick().await;
        cache::tick();
    }
}
