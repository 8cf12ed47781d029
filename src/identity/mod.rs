//! Stable service identity for audit stamping.
//!
//! Mints a SHA-256 fingerprint on first run, stores it in the `settings`
//! table, and returns the same value on every subsequent startup. Audit
//! entries carry it so logs from several instances can be told apart.

use anyhow::Result;
use sha2::{Digest, Sha256};

use crate::storage::Storage;

const SETTING_KEY: &str = "service_id";

/// Returns the stable service identity string.
///
/// On first call it hashes a freshly minted UUID with SHA-256, stores the
/// hex digest in the `settings` table, and returns it. On every subsequent
/// call it reads and returns the stored value.
pub async fn get_or_create(storage: &Storage) -> Result<String> {
    if let Some(id) = storage.get_setting(SETTING_KEY).await? {
        return Ok(id);
    }

    let seed = uuid::Uuid::new_v4().to_string();
    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    let digest = hex::encode(hasher.finalize());
    storage.set_setting(SETTING_KEY, &digest).await?;
    Ok(digest)
}
