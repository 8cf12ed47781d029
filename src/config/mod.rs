use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

const DEFAULT_PORT: u16 = 4310;
const DEFAULT_BROKER_URL: &str = "https://gw.clearing-broker.example/api/v1";
const DEFAULT_BROKER_TIMEOUT_SECS: u64 = 10;
const DEFAULT_PRUNE_DAYS: u32 = 30;
const DEFAULT_MAX_DOCUMENT_BYTES: u64 = 10 * 1024 * 1024;

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

// ─── BrokerConfig ─────────────────────────────────────────────────────────────

/// Clearing-broker gateway configuration (`[broker]` in config.toml).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Base URL of the clearing-broker REST gateway.
    pub base_url: String,
    /// Bearer token for the gateway. None = unauthenticated (sandbox).
    pub token: Option<String>,
    /// Per-request timeout in seconds (default: 10). There is no retry —
    /// a failed call surfaces to the user for explicit re-submission.
    pub timeout_secs: u64,
    /// `inputLanguage` value sent with document submissions (default: "en").
    pub input_language: String,
    /// Whether the broker should translate submitted forms (default: false).
    pub translation: bool,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BROKER_URL.to_string(),
            token: None,
            timeout_secs: DEFAULT_BROKER_TIMEOUT_SECS,
            input_language: "en".to_string(),
            translation: false,
        }
    }
}

// ─── LimitsConfig ─────────────────────────────────────────────────────────────

/// Upload limits (`[limits]` in config.toml).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum decoded size of one uploaded document (default: 10 MiB).
    /// Uploads are hashed whole-file in memory — form and ID scans only.
    pub max_document_bytes: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
        }
    }
}

// ─── ObservabilityConfig ──────────────────────────────────────────────────────

/// Observability configuration (`[observability]` in config.toml).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log SQLite queries that exceed this threshold (milliseconds). Default: 100.
    /// Set to 0 to disable slow query logging.
    pub slow_query_threshold_ms: u64,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            slow_query_threshold_ms: 100,
        }
    }
}

// ─── TOML config file ─────────────────────────────────────────────────────────

/// `{data_dir}/config.toml` — all fields are optional overrides.
/// Priority: CLI / env var  >  TOML  >  built-in default.
#[derive(Deserialize, Default)]
struct TomlConfig {
    /// REST server port (default: 4310).
    port: Option<u16>,
    /// Log level filter string, e.g. "debug", "info,onboardd=trace" (default: "info").
    log: Option<String>,
    /// Log output format: "pretty" (default, human-readable) | "json" (structured).
    log_format: Option<String>,
    /// Bind address for the REST server (default: "127.0.0.1").
    bind_address: Option<String>,
    /// Bearer token required to call the private REST API.
    /// None = auth disabled (local-only, trusted loopback use).
    api_token: Option<String>,
    /// Allowed CORS origin for the public apply page. None = same-origin only.
    apply_origin: Option<String>,
    /// How many days before abandoned draft applications are pruned (default: 30; 0 = never).
    draft_prune_days: Option<u32>,
    /// Clearing-broker gateway configuration (`[broker]`).
    broker: Option<BrokerConfig>,
    /// Upload limits (`[limits]`).
    limits: Option<LimitsConfig>,
    /// Observability configuration (`[observability]`).
    observability: Option<ObservabilityConfig>,
}

fn load_toml(data_dir: &Path) -> Option<TomlConfig> {
    let path = data_dir.join("config.toml");
    let contents = std::fs::read_to_string(&path).ok()?;
    match toml::from_str::<TomlConfig>(&contents) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            error!(path = %path.display(), err = %e, "failed to parse config.toml — using defaults");
            None
        }
    }
}

// ─── OnboardConfig ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct OnboardConfig {
    pub port: u16,
    pub data_dir: PathBuf,
    pub log: String,
    /// Log output format: "pretty" (default) | "json" (for log aggregators).
    pub log_format: String,
    /// Bind address for the REST server (ONBOARDD_BIND env var, default: "127.0.0.1").
    pub bind_address: String,
    /// Bearer token required to call the private REST API (ONBOARDD_API_TOKEN).
    /// The public apply link and health check are always exempt.
    pub api_token: Option<String>,
    /// Allowed CORS origin for the public apply page.
    pub apply_origin: Option<String>,
    /// How many days before abandoned drafts are pruned (0 = never).
    pub draft_prune_days: u32,
    /// Clearing-broker gateway settings.
    pub broker: BrokerConfig,
    /// Upload limits.
    pub limits: LimitsConfig,
    /// Slow query threshold and friends.
    pub observability: ObservabilityConfig,
}

impl OnboardConfig {
    /// Build config from CLI/env args + optional TOML file.
    ///
    /// Priority (highest to lowest):
    ///   1. CLI / env — passed as `Some(value)` from clap
    ///   2. TOML file at `{data_dir}/config.toml`
    ///   3. Built-in defaults
    pub fn new(
        port: Option<u16>,
        data_dir: Option<PathBuf>,
        log: Option<String>,
        bind_address: Option<String>,
    ) -> Self {
        let data_dir = data_dir.unwrap_or_else(default_data_dir);

        // Load TOML as the lowest-priority override layer
        let toml = load_toml(&data_dir).unwrap_or_default();

        let port = port.or(toml.port).unwrap_or(DEFAULT_PORT);
        let log = log.or(toml.log).unwrap_or_else(|| "info".to_string());

        let log_format = std::env::var("ONBOARDD_LOG_FORMAT")
            .ok()
            .filter(|s| !s.is_empty())
            .or(toml.log_format)
            .unwrap_or_else(|| "pretty".to_string());

        let bind_address = bind_address
            .or(std::env::var("ONBOARDD_BIND").ok().filter(|s| !s.is_empty()))
            .or(toml.bind_address)
            .unwrap_or_else(default_bind_address);

        let api_token = std::env::var("ONBOARDD_API_TOKEN")
            .ok()
            .filter(|s| !s.is_empty())
            .or(toml.api_token);

        let apply_origin = std::env::var("ONBOARDD_APPLY_ORIGIN")
            .ok()
            .filter(|s| !s.is_empty())
            .or(toml.apply_origin);

        let draft_prune_days = toml.draft_prune_days.unwrap_or(DEFAULT_PRUNE_DAYS);

        let mut broker = toml.broker.unwrap_or_default();
        if let Ok(url) = std::env::var("ONBOARDD_BROKER_URL") {
            if !url.is_empty() {
                broker.base_url = url;
            }
        }
        if let Ok(token) = std::env::var("ONBOARDD_BROKER_TOKEN") {
            if !token.is_empty() {
                broker.token = Some(token);
            }
        }

        let limits = toml.limits.unwrap_or_default();
        let observability = toml.observability.unwrap_or_default();

        Self {
            port,
            data_dir,
            log,
            log_format,
            bind_address,
            api_token,
            apply_origin,
            draft_prune_days,
            broker,
            limits,
            observability,
        }
    }
}

// ─── Hot-reloadable config subset ─────────────────────────────────────────────

/// Non-critical config fields that can be changed without restarting the service.
#[derive(Debug, Clone)]
pub struct HotConfig {
    pub log_level: String,
    pub draft_prune_days: u32,
}

/// Watches `config.toml` for changes and reloads non-critical fields.
///
/// The watcher uses the `notify` crate (kqueue on macOS, inotify on Linux)
/// to detect file modifications. Only `log_level` and `draft_prune_days`
/// are reloaded; port, bind address, and other startup-only fields require
/// a full restart.
pub struct ConfigWatcher {
    pub hot: Arc<RwLock<HotConfig>>,
    // Hold the watcher alive; dropping it stops the file watch.
    _watcher: notify_debouncer_full::Debouncer<
        notify_debouncer_full::notify::RecommendedWatcher,
        notify_debouncer_full::FileIdMap,
    >,
}

impl ConfigWatcher {
    /// Start watching `{data_dir}/config.toml` for changes.
    ///
    /// Returns `None` if the watcher could not be created (non-fatal; the
    /// service runs fine without hot-reload).
    pub fn start(data_dir: &Path) -> Option<Self> {
        let config_path = data_dir.join("config.toml");
        let initial = load_hot_config(&config_path);
        let hot = Arc::new(RwLock::new(initial));

        let hot_clone = hot.clone();
        let config_path_clone = config_path.clone();
        let rt_handle = tokio::runtime::Handle::current();

        let watcher = notify_debouncer_full::new_debouncer(
            std::time::Duration::from_secs(2),
            None,
            move |result: notify_debouncer_full::DebounceEventResult| {
                if let Ok(events) = result {
                    // Only act on modify/create events
                    let relevant = events.iter().any(|e| {
                        use notify_debouncer_full::notify::EventKind;
                        matches!(e.event.kind, EventKind::Modify(_) | EventKind::Create(_))
                    });
                    if relevant {
                        let hot = hot_clone.clone();
                        let path = config_path_clone.clone();
                        rt_handle.spawn(async move {
                            let new_config = load_hot_config(&path);
                            let mut guard = hot.write().await;
                            if guard.log_level != new_config.log_level
                                || guard.draft_prune_days != new_config.draft_prune_days
                            {
                                info!(
                                    log_level = %new_config.log_level,
                                    prune_days = new_config.draft_prune_days,
                                    "config.toml reloaded"
                                );
                                *guard = new_config;
                            }
                        });
                    }
                }
            },
        );

        match watcher {
            Ok(mut debouncer) => {
                use notify_debouncer_full::notify::Watcher as _;
                // Watch the data_dir (parent of config.toml) since watching a
                // non-existent file fails on some platforms.
                let watch_path = config_path.parent().unwrap_or_else(|| Path::new("."));
                if let Err(e) = debouncer.watcher().watch(
                    watch_path,
                    notify_debouncer_full::notify::RecursiveMode::NonRecursive,
                ) {
                    warn!("config watcher failed to start: {e} — hot-reload disabled");
                    return None;
                }
                info!(path = %config_path.display(), "config hot-reload watcher started");
                Some(Self {
                    hot,
                    _watcher: debouncer,
                })
            }
            Err(e) => {
                warn!("config watcher creation failed: {e} — hot-reload disabled");
                None
            }
        }
    }
}

/// Load only the hot-reloadable fields from config.toml.
fn load_hot_config(path: &Path) -> HotConfig {
    let toml = std::fs::read_to_string(path)
        .ok()
        .and_then(|s| toml::from_str::<TomlConfig>(&s).ok())
        .unwrap_or_default();
    HotConfig {
        log_level: toml.log.unwrap_or_else(|| "info".to_string()),
        draft_prune_days: toml.draft_prune_days.unwrap_or(DEFAULT_PRUNE_DAYS),
    }
}

fn default_data_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        // ~/Library/Application Support/onboardd
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("onboardd");
        }
    }
    #[cfg(target_os = "linux")]
    {
        // $XDG_DATA_HOME/onboardd or ~/.local/share/onboardd
        if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
            return PathBuf::from(xdg).join("onboardd");
        }
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join(".local")
                .join("share")
                .join("onboardd");
        }
    }
    #[cfg(target_os = "windows")]
    {
        // %APPDATA%\onboardd
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata).join("onboardd");
        }
    }
    // Fallback
    PathBuf::from(".onboardd")
}
