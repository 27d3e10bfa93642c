//! pika-exporter - Prometheus exporter for pika
//!
//! Every collection scrapes all configured instances in parallel and
//! exposes their INFO metrics over HTTP.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use pika_exporter::client::{ConnectionFactory, Connector};
use pika_exporter::config::{CliArgs, ExporterConfig};
use pika_exporter::discovery::{Discovery, FileDiscovery, StaticDiscovery};
use pika_exporter::exporter::{KeyspaceStatsTask, PikaExporter};
use pika_exporter::metrics::Registry;
use pika_exporter::web;

fn setup_logging(verbose: bool, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else if verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

fn build_discovery(args: &CliArgs) -> Result<Arc<dyn Discovery>> {
    let discovery: Arc<dyn Discovery> = match args.host_file {
        Some(ref path) => {
            info!("Discovering instances from host file {}", path.display());
            Arc::new(FileDiscovery::new(path)?)
        }
        None => Arc::new(StaticDiscovery::from_args(
            &args.pika_addr,
            &args.pika_password,
            &args.pika_alias,
        )?),
    };
    Ok(discovery)
}

fn run() -> Result<()> {
    // Parse CLI arguments
    let args = CliArgs::parse_args();

    // Setup logging
    setup_logging(args.verbose, args.quiet);

    // Build configuration
    let config = ExporterConfig::from_cli(&args)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    let listen: SocketAddr = config
        .listen_address
        .parse()
        .with_context(|| format!("invalid listen address {}", config.listen_address))?;

    let discovery = build_discovery(&args)?;
    let connector: Arc<dyn Connector> = Arc::new(ConnectionFactory {
        connect_timeout: config.connect_timeout,
        read_timeout: config.request_timeout,
        write_timeout: config.request_timeout,
    });

    let rules = Registry::pika()?;
    info!("Loaded {} metric rules", rules.len());

    let config = Arc::new(config);
    let exporter = PikaExporter::new(config.clone(), discovery.clone(), connector.clone(), rules)?;

    let registry = Arc::new(prometheus::Registry::new());
    registry.register(Box::new(exporter))?;

    let mut keyspace_task =
        KeyspaceStatsTask::spawn(config.keyspace_stats_clock, discovery, connector)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("http")
        .build()?;

    info!(
        "pika-exporter v{} serving {} on {}",
        env!("CARGO_PKG_VERSION"),
        config.telemetry_path,
        listen
    );
    let app = web::router(registry, &config.telemetry_path);
    let served = runtime.block_on(web::serve(listen, app));

    keyspace_task.shutdown();
    served.context("HTTP server failed")?;

    info!("Exporter stopped");
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        error!("Error: {:#}", e);
        std::process::exit(1);
    }
}
