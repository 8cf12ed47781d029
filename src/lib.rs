pub mod broker;
pub mod config;
pub mod documents;
pub mod error;
pub mod identity;
pub mod model;
pub mod rest;
pub mod storage;
pub mod wizard;

use std::sync::Arc;

use broker::BrokerGateway;
use config::OnboardConfig;
use storage::audit_log::AuditLog;
use storage::Storage;
use wizard::Wizard;

/// Shared application state passed to every REST handler and background task.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<OnboardConfig>,
    pub storage: Arc<Storage>,
    /// Clearing-broker gateway — a reqwest client in production, a mock in tests.
    pub broker: Arc<dyn BrokerGateway>,
    /// Append-only wizard audit log (`{data_dir}/audit.log`).
    pub audit: Arc<AuditLog>,
    /// Step controller over the rules engine; owns all wizard transitions.
    pub wizard: Arc<Wizard>,
    /// Stable service identity (SHA-256 fingerprint, minted on first run).
    pub service_id: String,
    pub started_at: std::time::Instant,
}

impl AppContext {
    /// Wire the shared subsystems together. The wizard gets its own handles
    /// to storage, broker, and audit so handlers can stay thin.
    pub fn new(
        config: Arc<OnboardConfig>,
        storage: Arc<Storage>,
        broker: Arc<dyn BrokerGateway>,
        audit: Arc<AuditLog>,
        service_id: String,
    ) -> Self {
        let wizard = Arc::new(Wizard::new(
            Arc::clone(&storage),
            Arc::clone(&broker),
            Arc::clone(&audit),
            Arc::clone(&config),
            service_id.clone(),
        ));
        Self {
            config,
            storage,
            broker,
            audit,
            wizard,
            service_id,
            started_at: std::time::Instant::now(),
        }
    }
}
