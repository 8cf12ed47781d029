use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use onboardd::broker::{BrokerGateway, IbkrClient};
use onboardd::config::{ConfigWatcher, HotConfig, OnboardConfig};
use onboardd::identity;
use onboardd::rest;
use onboardd::storage::audit_log::AuditLog;
use onboardd::storage::Storage;
use onboardd::AppContext;

#[derive(Parser)]
#[command(
    name = "onboardd",
    about = "Onboard Host — brokerage client-onboarding service",
    version
)]
struct Args {
    /// REST API port
    #[arg(long, env = "ONBOARDD_PORT")]
    port: Option<u16>,

    /// Data directory for config, SQLite database, and audit log
    #[arg(long, env = "ONBOARDD_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "ONBOARDD_LOG")]
    log: Option<String>,

    /// Bind address for the REST server (default: 127.0.0.1)
    #[arg(long, env = "ONBOARDD_BIND")]
    bind_address: Option<String>,

    /// Write logs to this file path (rotated daily). Optional.
    #[arg(long, env = "ONBOARDD_LOG_FILE")]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Arc::new(OnboardConfig::new(
        args.port,
        args.data_dir,
        args.log,
        args.bind_address,
    ));

    let _log_guard = init_tracing(&config, args.log_file.as_deref());

    info!(
        version = env!("CARGO_PKG_VERSION"),
        data_dir = %config.data_dir.display(),
        "onboardd starting"
    );

    let storage = Arc::new(
        Storage::new_with_slow_query(
            &config.data_dir,
            config.observability.slow_query_threshold_ms,
        )
        .await?,
    );
    let service_id = identity::get_or_create(&storage).await?;
    info!(service_id = %service_id, "service identity ready");

    let broker: Arc<dyn BrokerGateway> = Arc::new(IbkrClient::new(&config.broker)?);
    let audit = Arc::new(AuditLog::new(&config.data_dir));

    let ctx = Arc::new(AppContext::new(
        Arc::clone(&config),
        Arc::clone(&storage),
        broker,
        audit,
        service_id,
    ));

    // Hot-reload of log level and the draft-prune window; non-fatal if the
    // watcher cannot start.
    let watcher = ConfigWatcher::start(&config.data_dir);
    spawn_draft_janitor(
        Arc::clone(&storage),
        watcher.as_ref().map(|w| Arc::clone(&w.hot)),
        config.draft_prune_days,
    );

    rest::start_rest_server(ctx).await
}

/// Initialise the tracing subscriber: pretty or JSON output, optionally into
/// a daily-rotated file. Returns the appender guard that must stay alive for
/// the process lifetime.
fn init_tracing(
    config: &OnboardConfig,
    log_file: Option<&std::path::Path>,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&config.log).unwrap_or_else(|_| EnvFilter::new("info"));
    let json = config.log_format == "json";

    match log_file {
        Some(path) => {
            let dir = path.parent().unwrap_or_else(|| std::path::Path::new("."));
            let file = path
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_else(|| "onboardd.log".to_string());
            let appender = tracing_appender::rolling::daily(dir, file);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let builder = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false);
            if json {
                builder.json().init();
            } else {
                builder.init();
            }
            Some(guard)
        }
        None => {
            let builder = tracing_subscriber::fmt().with_env_filter(filter);
            if json {
                builder.json().init();
            } else {
                builder.init();
            }
            None
        }
    }
}

/// Prune abandoned draft applications once a day. The window comes from the
/// hot config when the watcher is running, so it can be tuned without a
/// restart; 0 disables pruning.
fn spawn_draft_janitor(
    storage: Arc<Storage>,
    hot: Option<Arc<tokio::sync::RwLock<HotConfig>>>,
    fallback_days: u32,
) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(24 * 60 * 60));
        loop {
            interval.tick().await;
            let days = match &hot {
                Some(hot) => hot.read().await.draft_prune_days,
                None => fallback_days,
            };
            if days == 0 {
                continue;
            }
            match storage.prune_stale_drafts(days).await {
                Ok(0) => {}
                Ok(count) => info!(count, days, "pruned stale draft applications"),
                Err(e) => warn!(err = %e, "draft prune failed"),
            }
        }
    });
}
