use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::{fs::OpenOptions, io::AsyncWriteExt, sync::Mutex};

/// Maximum audit log file size before rotation (50 MB).
const ROTATE_BYTES: u64 = 50 * 1024 * 1024;

// ─── Entry ────────────────────────────────────────────────────────────────────

/// One structured JSON line written to the audit log per wizard action.
///
/// All fields are `camelCase` for easy `jq` querying:
/// ```sh
/// jq 'select(.action == "finalize")' ~/.local/share/onboardd/audit.log
/// jq '[.applicationId, .action, .outcome] | @tsv' ~/.local/share/onboardd/audit.log
/// ```
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    /// RFC-3339 timestamp of when the action was processed.
    pub timestamp: String,
    /// Stable service identity of the instance that handled the action.
    pub service_id: String,
    /// Application the action was applied to.
    pub application_id: String,
    /// Wizard step the session was on when the action ran.
    pub step: String,
    /// Action kind: `"edit"` | `"advance"` | `"retreat"` | `"document"` | `"finalize"`.
    pub action: String,
    /// Outcome: `"ok"` | `"validation_failed"` | `"rejected"` | `"error"`.
    pub outcome: String,
    /// Lowercase hex SHA-256 of the serialized form tree after the action.
    /// Allows change correlation without storing applicant data in the log.
    pub payload_hash: String,
}

impl AuditEntry {
    /// Build an entry, hashing `payload_json` with SHA-256.
    pub fn new(
        service_id: impl Into<String>,
        application_id: impl Into<String>,
        step: impl Into<String>,
        action: impl Into<String>,
        outcome: impl Into<String>,
        payload_json: &str,
    ) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(payload_json.as_bytes());
        let hash = format!("{:x}", hasher.finalize());
        Self {
            timestamp: Utc::now().to_rfc3339(),
            service_id: service_id.into(),
            application_id: application_id.into(),
            step: step.into(),
            action: action.into(),
            outcome: outcome.into(),
            payload_hash: hash,
        }
    }
}

// ─── Log ──────────────────────────────────────────────────────────────────────

/// Append-only structured audit log for wizard actions.
///
/// Writes one JSON line per action to `{data_dir}/audit.log`.
/// Rotates to `audit.log.1` when the active file reaches 50 MB.
/// The file handle is cached for the process lifetime to avoid the overhead
/// of an `open()` syscall on every action.
pub struct AuditLog {
    path: PathBuf,
    /// Cached, open file handle; `None` until the first write.
    file: Mutex<Option<tokio::fs::File>>,
}

impl AuditLog {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join("audit.log"),
            file: Mutex::new(None),
        }
    }

    /// Append one structured entry to the audit log.
    ///
    /// Opens the file lazily on first call.  Rotates to `audit.log.1` when
    /// the active file reaches 50 MB.  Errors are logged at WARN level and
    /// never propagated — a broken audit log must not interrupt the wizard.
    pub async fn append(&self, entry: &AuditEntry) {
        if let Err(e) = self.try_append(entry).await {
            tracing::warn!(err = %e, "audit log write failed");
        }
    }

    async fn try_append(&self, entry: &AuditEntry) -> Result<()> {
        let line = serde_json::to_string(entry)? + "\n";
        let bytes = line.as_bytes();

        let mut guard = self.file.lock().await;

        // Rotation check: if the on-disk file has grown past 50 MB, close the
        // handle and rename the file before opening a fresh one.
        if guard.is_some() {
            if let Ok(meta) = tokio::fs::metadata(&self.path).await {
                if meta.len() >= ROTATE_BYTES {
                    *guard = None; // drop file handle (flushes on drop)
                    let rotated = self.path.with_extension("log.1");
                    let _ = tokio::fs::rename(&self.path, &rotated).await;
                }
            }
        }

        // Open (or re-open after rotation) lazily.
        if guard.is_none() {
            if let Some(parent) = self.path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            let f = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .await?;
            *guard = Some(f);
        }

        if let Some(f) = guard.as_mut() {
            f.write_all(bytes).await?;
        }
        Ok(())
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_hash_is_sha256_hex() {
        let entry = AuditEntry::new(
            "svc-1",
            "app-1",
            "personal_info",
            "advance",
            "ok",
            r#"{"id":"app-1"}"#,
        );
        // SHA-256 should be 64 hex chars
        assert_eq!(entry.payload_hash.len(), 64);
        assert!(entry.payload_hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn entry_serialises_to_camel_case() {
        let entry = AuditEntry::new("svc", "app", "documents", "document", "ok", "{}");
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"applicationId\""));
        assert!(json.contains("\"payloadHash\""));
        assert!(json.contains("\"serviceId\""));
    }

    #[tokio::test]
    async fn appends_line_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let log = AuditLog::new(dir.path());
        let entry = AuditEntry::new("svc", "app-9", "agreements", "finalize", "ok", "{}");
        log.append(&entry).await;

        let content = tokio::fs::read_to_string(dir.path().join("audit.log"))
            .await
            .unwrap();
        assert!(content.contains("\"applicationId\":\"app-9\""));
        assert!(content.ends_with('\n'));
    }
}
