pub mod audit_log;

use anyhow::{Context as _, Result};
use chrono::{Duration, Utc};
use sqlx::{sqlite::SqliteConnectOptions, SqlitePool};
use std::{path::Path, str::FromStr};
use uuid::Uuid;

use crate::broker::BrokerTask;

/// Default timeout for individual SQLite queries.
/// Prevents hung queries from blocking the service indefinitely.
const QUERY_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Execute a future with the standard query timeout.
/// Returns an error if the operation takes longer than `QUERY_TIMEOUT`.
async fn with_timeout<T>(fut: impl std::future::Future<Output = Result<T>>) -> Result<T> {
    match tokio::time::timeout(QUERY_TIMEOUT, fut).await {
        Ok(result) => result,
        Err(_) => Err(anyhow::anyhow!(
            "database query timed out after {}s",
            QUERY_TIMEOUT.as_secs()
        )),
    }
}

// ─── Rows ─────────────────────────────────────────────────────────────────────

/// One persisted wizard session: the serialized form tree plus the step and
/// auxiliary state columns the controller reads back.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ApplicationRow {
    pub id: String,
    pub status: String,
    pub step: String,
    pub customer_type: String,
    /// JSON-serialized `model::Application`.
    pub payload: String,
    pub estimated_deposit: Option<f64>,
    pub signature: Option<String>,
    pub master_account: Option<String>,
    pub advisor_id: Option<String>,
    pub lead_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct LeadRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub status: String,
    pub advisor_id: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct AdvisorRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub master_account: String,
    pub created_at: String,
}

#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct AccountRow {
    pub id: String,
    pub application_id: String,
    pub broker_account_id: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Cached broker task (pending or registration), refreshed per dashboard fetch.
#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct BrokerTaskRow {
    pub id: String,
    pub account_id: String,
    pub kind: String,
    pub task_id: String,
    pub form_number: Option<i64>,
    pub description: String,
    pub required: bool,
    pub fetched_at: String,
}

#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct DocumentRow {
    pub id: String,
    pub application_id: String,
    pub form_number: i64,
    pub file_name: String,
    pub file_length: i64,
    pub sha1_checksum: String,
    pub status: String,
    pub created_at: String,
    pub submitted_at: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct InvestmentProposalRow {
    pub id: String,
    pub account_id: String,
    pub name: String,
    pub risk_profile: String,
    /// JSON body: allocations, fees, notes — opaque to this service.
    pub body: String,
    pub created_at: String,
}

// ─── Storage ──────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    pub async fn new(data_dir: &Path) -> Result<Self> {
        Self::new_with_slow_query(data_dir, 0).await
    }

    /// Create storage with slow-query logging enabled.
    ///
    /// `slow_query_ms` is the threshold in milliseconds — queries exceeding it
    /// are logged at WARN level. Set to 0 to disable slow-query logging.
    pub async fn new_with_slow_query(data_dir: &Path, slow_query_ms: u64) -> Result<Self> {
        tokio::fs::create_dir_all(data_dir).await?;
        let db_path = data_dir.join("onboardd.db");
        let mut opts =
            SqliteConnectOptions::from_str(&format!("sqlite://{}?mode=rwc", db_path.display()))?
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
                .create_if_missing(true);

        if slow_query_ms > 0 {
            use sqlx::ConnectOptions as _;
            opts = opts.log_slow_statements(
                log::LevelFilter::Warn,
                std::time::Duration::from_millis(slow_query_ms),
            );
        }

        let pool = SqlitePool::connect_with(opts).await?;
        Self::migrate(&pool).await?;
        Ok(Self { pool })
    }

    /// Return a clone of the connection pool (cheap — Arc-backed).
    pub fn pool(&self) -> SqlitePool {
        self.pool.clone()
    }

    async fn migrate(pool: &SqlitePool) -> Result<()> {
        sqlx::migrate!("src/storage/migrations")
            .run(pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    // ─── Applications ───────────────────────────────────────────────────────

    /// Insert a fresh draft application row.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_application(
        &self,
        id: &str,
        step: &str,
        customer_type: &str,
        payload: &str,
        master_account: Option<&str>,
        advisor_id: Option<&str>,
        lead_id: Option<&str>,
    ) -> Result<ApplicationRow> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO applications
               (id, status, step, customer_type, payload, master_account, advisor_id, lead_id, created_at, updated_at)
             VALUES (?, 'Draft', ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(step)
        .bind(customer_type)
        .bind(payload)
        .bind(master_account)
        .bind(advisor_id)
        .bind(lead_id)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        self.get_application(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("application not found after insert"))
    }

    /// Update an existing application row after an edit or step transition.
    #[allow(clippy::too_many_arguments)]
    pub async fn update_application(
        &self,
        id: &str,
        status: &str,
        step: &str,
        customer_type: &str,
        payload: &str,
        estimated_deposit: Option<f64>,
        signature: Option<&str>,
        master_account: Option<&str>,
        advisor_id: Option<&str>,
        lead_id: Option<&str>,
    ) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "UPDATE applications
             SET status = ?, step = ?, customer_type = ?, payload = ?,
                 estimated_deposit = ?, signature = ?,
                 master_account = ?, advisor_id = ?, lead_id = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(status)
        .bind(step)
        .bind(customer_type)
        .bind(payload)
        .bind(estimated_deposit)
        .bind(signature)
        .bind(master_account)
        .bind(advisor_id)
        .bind(lead_id)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            anyhow::bail!("application {id} does not exist");
        }
        Ok(())
    }

    pub async fn get_application(&self, id: &str) -> Result<Option<ApplicationRow>> {
        Ok(sqlx::query_as("SELECT * FROM applications WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn list_applications(&self) -> Result<Vec<ApplicationRow>> {
        with_timeout(async {
            Ok(
                sqlx::query_as("SELECT * FROM applications ORDER BY created_at DESC")
                    .fetch_all(&self.pool)
                    .await?,
            )
        })
        .await
    }

    /// Delete abandoned drafts not touched for `days` days. Completed
    /// applications are never pruned. Returns the number of rows removed.
    pub async fn prune_stale_drafts(&self, days: u32) -> Result<u64> {
        if days == 0 {
            return Ok(0);
        }
        let cutoff = (Utc::now() - Duration::days(i64::from(days))).to_rfc3339();
        let result = sqlx::query(
            "DELETE FROM applications WHERE status = 'Draft' AND updated_at < ?",
        )
        .bind(&cutoff)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    // ─── Leads ──────────────────────────────────────────────────────────────

    pub async fn create_lead(
        &self,
        name: &str,
        email: &str,
        phone: Option<&str>,
        advisor_id: Option<&str>,
    ) -> Result<LeadRow> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO leads (id, name, email, phone, status, advisor_id, created_at)
             VALUES (?, ?, ?, ?, 'new', ?, ?)",
        )
        .bind(&id)
        .bind(name)
        .bind(email)
        .bind(phone)
        .bind(advisor_id)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        self.get_lead(&id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("lead not found after insert"))
    }

    pub async fn get_lead(&self, id: &str) -> Result<Option<LeadRow>> {
        Ok(sqlx::query_as("SELECT * FROM leads WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn list_leads(&self) -> Result<Vec<LeadRow>> {
        with_timeout(async {
            Ok(sqlx::query_as("SELECT * FROM leads ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await?)
        })
        .await
    }

    pub async fn update_lead_status(&self, id: &str, status: &str) -> Result<()> {
        let result = sqlx::query("UPDATE leads SET status = ? WHERE id = ?")
            .bind(status)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            anyhow::bail!("lead {id} does not exist");
        }
        Ok(())
    }

    // ─── Advisors ───────────────────────────────────────────────────────────

    pub async fn upsert_advisor(
        &self,
        id: &str,
        name: &str,
        email: &str,
        master_account: &str,
    ) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO advisors (id, name, email, master_account, created_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name, email = excluded.email,
                 master_account = excluded.master_account",
        )
        .bind(id)
        .bind(name)
        .bind(email)
        .bind(master_account)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_advisor(&self, id: &str) -> Result<Option<AdvisorRow>> {
        Ok(sqlx::query_as("SELECT * FROM advisors WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn list_advisors(&self) -> Result<Vec<AdvisorRow>> {
        with_timeout(async {
            Ok(sqlx::query_as("SELECT * FROM advisors ORDER BY name")
                .fetch_all(&self.pool)
                .await?)
        })
        .await
    }

    // ─── Accounts ───────────────────────────────────────────────────────────

    /// Record the broker account opened for a finalized application.
    pub async fn record_account(
        &self,
        application_id: &str,
        broker_account_id: &str,
    ) -> Result<AccountRow> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO accounts (id, application_id, broker_account_id, status, created_at, updated_at)
             VALUES (?, ?, ?, 'open_pending', ?, ?)",
        )
        .bind(&id)
        .bind(application_id)
        .bind(broker_account_id)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        self.get_account(&id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("account not found after insert"))
    }

    pub async fn get_account(&self, id: &str) -> Result<Option<AccountRow>> {
        Ok(sqlx::query_as("SELECT * FROM accounts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn list_accounts(&self) -> Result<Vec<AccountRow>> {
        with_timeout(async {
            Ok(
                sqlx::query_as("SELECT * FROM accounts ORDER BY created_at DESC")
                    .fetch_all(&self.pool)
                    .await?,
            )
        })
        .await
    }

    pub async fn update_account_status(&self, id: &str, status: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query("UPDATE accounts SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status)
            .bind(&now)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            anyhow::bail!("account {id} does not exist");
        }
        Ok(())
    }

    // ─── Broker task cache ──────────────────────────────────────────────────

    /// Replace the cached task list of one kind for an account with a fresh
    /// fetch from the broker.
    pub async fn replace_broker_tasks(
        &self,
        account_id: &str,
        kind: &str,
        tasks: &[BrokerTask],
    ) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM broker_tasks WHERE account_id = ? AND kind = ?")
            .bind(account_id)
            .bind(kind)
            .execute(&mut *tx)
            .await?;
        for task in tasks {
            sqlx::query(
                "INSERT INTO broker_tasks (id, account_id, kind, task_id, form_number, description, required, fetched_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(account_id)
            .bind(kind)
            .bind(&task.task_id)
            .bind(task.form_number.map(i64::from))
            .bind(&task.description)
            .bind(task.required)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn list_broker_tasks(
        &self,
        account_id: &str,
        kind: &str,
    ) -> Result<Vec<BrokerTaskRow>> {
        with_timeout(async {
            Ok(sqlx::query_as(
                "SELECT * FROM broker_tasks WHERE account_id = ? AND kind = ? ORDER BY task_id",
            )
            .bind(account_id)
            .bind(kind)
            .fetch_all(&self.pool)
            .await?)
        })
        .await
    }

    // ─── Documents ──────────────────────────────────────────────────────────

    /// Record an attached document, replacing any earlier upload for the
    /// same form — re-uploading a corrected scan is the normal flow.
    pub async fn record_document(
        &self,
        application_id: &str,
        form_number: u32,
        file_name: &str,
        file_length: u64,
        sha1_checksum: &str,
    ) -> Result<DocumentRow> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO documents (id, application_id, form_number, file_name, file_length, sha1_checksum, status, created_at)
             VALUES (?, ?, ?, ?, ?, ?, 'attached', ?)
             ON CONFLICT(application_id, form_number) DO UPDATE SET
                 file_name = excluded.file_name,
                 file_length = excluded.file_length,
                 sha1_checksum = excluded.sha1_checksum,
                 status = 'attached',
                 submitted_at = NULL",
        )
        .bind(&id)
        .bind(application_id)
        .bind(i64::from(form_number))
        .bind(file_name)
        .bind(file_length as i64)
        .bind(sha1_checksum)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        let row: Option<DocumentRow> =
            sqlx::query_as("SELECT * FROM documents WHERE application_id = ? AND form_number = ?")
                .bind(application_id)
                .bind(i64::from(form_number))
                .fetch_optional(&self.pool)
                .await?;
        row.ok_or_else(|| anyhow::anyhow!("document not found after insert"))
    }

    pub async fn list_documents(&self, application_id: &str) -> Result<Vec<DocumentRow>> {
        with_timeout(async {
            Ok(sqlx::query_as(
                "SELECT * FROM documents WHERE application_id = ? ORDER BY form_number",
            )
            .bind(application_id)
            .fetch_all(&self.pool)
            .await?)
        })
        .await
    }

    pub async fn mark_documents_submitted(&self, application_id: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "UPDATE documents SET status = 'submitted', submitted_at = ? WHERE application_id = ?",
        )
        .bind(&now)
        .bind(application_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // ─── Investment proposals ───────────────────────────────────────────────

    pub async fn create_proposal(
        &self,
        account_id: &str,
        name: &str,
        risk_profile: &str,
        body: &str,
    ) -> Result<InvestmentProposalRow> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO investment_proposals (id, account_id, name, risk_profile, body, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(account_id)
        .bind(name)
        .bind(risk_profile)
        .bind(body)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        let row: Option<InvestmentProposalRow> =
            sqlx::query_as("SELECT * FROM investment_proposals WHERE id = ?")
                .bind(&id)
                .fetch_optional(&self.pool)
                .await?;
        row.ok_or_else(|| anyhow::anyhow!("proposal not found after insert"))
    }

    pub async fn list_proposals(&self) -> Result<Vec<InvestmentProposalRow>> {
        with_timeout(async {
            Ok(sqlx::query_as(
                "SELECT * FROM investment_proposals ORDER BY created_at DESC",
            )
            .fetch_all(&self.pool)
            .await?)
        })
        .await
    }

    // ─── Settings ───────────────────────────────────────────────────────────

    pub async fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(v,)| v))
    }

    pub async fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO settings (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
