//! NextGCore UDM PP (Parameter Provisioning)
//!
//! Serves the Nudm_PP 5G VN group resources:
//! - group create/get/modify/delete backed by the UDR
//! - internal group id allocation and the external/internal id map
//! - 5G VN group configuration subscriptions and change notifications

use anyhow::{Context, Result};
use clap::Parser;
use nextgcore_udm_ppd::{
    pp_sbi_close, pp_sbi_open, EngineOptions, GroupProvisioningEngine, IdentifierAllocator,
    NotificationDispatcher, SbiNotificationSender, SubscriptionRegistry, UdmPpConfig,
    UdmPpContext, UdrClient,
};
use ogs_dbi::{masked_db_uri, GroupIdMapStore, MemoryGroupIdMapStore, MongoGroupIdMapStore, OgsMongoc};
use ogs_sbi::SbiClientConfig;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// NextGCore UDM PP - 5G VN group provisioning
#[derive(Parser, Debug)]
#[command(name = "nextgcore-udm-ppd")]
#[command(author = "NextGCore")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "5G Core UDM Parameter Provisioning (5G VN groups)", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short = 'c', long, default_value = "/etc/nextgcore/udm.yaml")]
    config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'e', long, default_value = "info")]
    log_level: String,

    /// Disable color output
    #[arg(short = 'm', long)]
    no_color: bool,

    /// SBI server address (overrides udm.sbi.addr)
    #[arg(long)]
    sbi_addr: Option<String>,

    /// SBI server port (overrides udm.sbi.port)
    #[arg(long)]
    sbi_port: Option<u16>,

    /// MongoDB URI for the group id map (overrides udm.db_uri)
    #[arg(long)]
    db_uri: Option<String>,
}

/// Global shutdown flag
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args)?;

    log::info!("NextGCore UDM PP v{} starting...", env!("CARGO_PKG_VERSION"));

    let shutdown = Arc::new(AtomicBool::new(false));
    setup_signal_handlers(shutdown.clone())?;

    let config = load_config(&args)?;
    log::info!(
        "PLMN {}-{}, UDR {}:{}, {} 5G LAN service type(s)",
        config.plmn.mcc,
        config.plmn.mnc,
        config.udr.addr,
        config.udr.port,
        config.vn5glan_service_type.len()
    );

    let store = open_group_id_map(&config).await?;
    let context = Arc::new(UdmPpContext::new(
        config.plmn_id(),
        config.vn5glan_service_type.clone(),
    ));
    let allocator = IdentifierAllocator::new(context, store)
        .with_suffix_len(config.vn_group.internal_id_suffix_len);

    let repository = Arc::new(UdrClient::new(
        SbiClientConfig::new(config.udr.addr.clone(), config.udr.port)
            .with_request_timeout(config.udr_timeout()),
    ));
    let dispatcher = NotificationDispatcher::new(
        Arc::new(SubscriptionRegistry::new()),
        Arc::new(SbiNotificationSender::new(config.notify_timeout())),
    )
    .with_timeout(config.notify_timeout());

    let engine = Arc::new(
        GroupProvisioningEngine::new(repository, allocator, dispatcher).with_options(EngineOptions {
            remove_mapping_on_delete: config.vn_group.remove_mapping_on_delete,
        }),
    );

    let sbi_addr: SocketAddr = format!("{}:{}", config.sbi.addr, config.sbi.port)
        .parse()
        .context("Invalid SBI address")?;
    let sbi_server = pp_sbi_open(engine, sbi_addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to start SBI server: {}", e))?;

    log::info!("SBI HTTP/2 server listening on {}", sbi_addr);
    log::info!("NextGCore UDM PP ready");

    run_event_loop_async(shutdown).await?;

    log::info!("Shutting down...");

    pp_sbi_close(&sbi_server)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to stop SBI server: {}", e))?;

    log::info!("NextGCore UDM PP stopped");
    Ok(())
}

/// Configuration file (defaults when absent) with command line overrides applied
fn load_config(args: &Args) -> Result<UdmPpConfig> {
    let mut config = if std::path::Path::new(&args.config).exists() {
        log::info!("Loading configuration from {}", args.config);
        UdmPpConfig::load(&args.config)
            .with_context(|| format!("Failed to load configuration {}", args.config))?
    } else {
        log::debug!("Configuration file not found: {}", args.config);
        UdmPpConfig::default()
    };

    if let Some(addr) = &args.sbi_addr {
        config.sbi.addr = addr.clone();
    }
    if let Some(port) = args.sbi_port {
        config.sbi.port = port;
    }
    if let Some(db_uri) = &args.db_uri {
        config.db_uri = Some(db_uri.clone());
    }
    Ok(config)
}

async fn open_group_id_map(config: &UdmPpConfig) -> Result<Arc<dyn GroupIdMapStore>> {
    match config.db_uri() {
        Some(db_uri) => {
            let mongoc = OgsMongoc::connect(db_uri)
                .await
                .with_context(|| format!("Failed to connect to {}", masked_db_uri(db_uri)))?;
            let store = MongoGroupIdMapStore::new(&mongoc);
            store
                .ensure_indexes()
                .await
                .context("Failed to create group id map indexes")?;
            log::info!("Group id map on {}", masked_db_uri(db_uri));
            Ok(Arc::new(store))
        }
        None => {
            log::warn!("No db_uri configured, group id map kept in memory");
            Ok(Arc::new(MemoryGroupIdMapStore::new()))
        }
    }
}

/// Initialize logging
fn init_logging(args: &Args) -> Result<()> {
    let mut builder = env_logger::Builder::new();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => log::LevelFilter::Trace,
        "debug" => log::LevelFilter::Debug,
        "info" => log::LevelFilter::Info,
        "warn" => log::LevelFilter::Warn,
        "error" => log::LevelFilter::Error,
        _ => log::LevelFilter::Info,
    };
    builder.filter_level(level);

    builder.format_timestamp_millis();

    if args.no_color {
        builder.write_style(env_logger::WriteStyle::Never);
    }

    builder.init();

    Ok(())
}

/// Set up signal handlers for graceful shutdown
fn setup_signal_handlers(shutdown: Arc<AtomicBool>) -> Result<()> {
    let shutdown_clone = shutdown.clone();
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        shutdown_clone.store(true, Ordering::SeqCst);
        SHUTDOWN.store(true, Ordering::SeqCst);
    })
    .context("Failed to set Ctrl+C handler")?;

    Ok(())
}

/// Wait for shutdown; requests are served by the SBI server tasks
async fn run_event_loop_async(shutdown: Arc<AtomicBool>) -> Result<()> {
    log::debug!("Entering async main event loop");

    let mut interval = tokio::time::interval(Duration::from_millis(100));

    while !shutdown.load(Ordering::SeqCst) && !SHUTDOWN.load(Ordering::SeqCst) {
        interval.tick().await;
    }

    log::debug!("Exiting async main event loop");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_default() {
        let args = Args::parse_from(["nextgcore-udm-ppd"]);
        assert_eq!(args.config, "/etc/nextgcore/udm.yaml");
        assert_eq!(args.log_level, "info");
        assert!(!args.no_color);
        assert_eq!(args.sbi_addr, None);
        assert_eq!(args.sbi_port, None);
        assert_eq!(args.db_uri, None);
    }

    #[test]
    fn test_args_overrides() {
        let args = Args::parse_from([
            "nextgcore-udm-ppd",
            "-c",
            "/nonexistent/udm.yaml",
            "-e",
            "debug",
            "-m",
            "--sbi-addr",
            "0.0.0.0",
            "--sbi-port",
            "8080",
        ]);
        assert!(args.no_color);

        let config = load_config(&args).unwrap();
        assert_eq!(config.sbi.addr, "0.0.0.0");
        assert_eq!(config.sbi.port, 8080);
        assert_eq!(config.udr.port, 7777);
    }
}
