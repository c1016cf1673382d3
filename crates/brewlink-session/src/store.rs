//! Durable single-record session store.
//!
//! Persists exactly one [`CafeSession`] as a JSON file. The public surface
//! is best-effort: storage failures are logged and converted into
//! `false`/`None` results so an unavailable filesystem can never crash the
//! caller.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::fs;
use tracing::{debug, warn};

use brewlink_core::AppResult;
use brewlink_core::config::SessionConfig;

use crate::session::{CafeSession, TimeRemaining};

/// Durable CRUD over the single cafe-session record.
#[derive(Debug, Clone)]
pub struct SessionStore {
    /// Path of the JSON record file.
    path: PathBuf,
}

impl SessionStore {
    /// Create a store at the configured record path.
    pub fn new(config: &SessionConfig) -> Self {
        Self::with_path(&config.storage_path)
    }

    /// Create a store at an explicit path.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Persist the session, overwriting any prior record.
    ///
    /// Requires `cafe_id` and `expires_at` to be set; returns `false`
    /// without writing otherwise. After writing, a verification read
    /// guards against quota/availability failures in the underlying
    /// filesystem.
    pub async fn save(&self, session: &CafeSession) -> bool {
        if session.cafe_id.as_i64() == 0 {
            warn!("Refusing to save session without a cafe id");
            return false;
        }
        if session.expires_at.is_none() {
            warn!(cafe_id = %session.cafe_id, "Refusing to save session without an expiry");
            return false;
        }

        let mut record = session.clone();
        record.saved_at = Some(Utc::now());

        if let Err(e) = self.write_record(&record).await {
            warn!(error = %e, path = %self.path.display(), "Failed to persist session");
            return false;
        }

        // Verification read: the write must be readable back.
        match self.read_record().await {
            Ok(Some(read_back))
                if read_back.cafe_id == record.cafe_id
                    && read_back.expires_at == record.expires_at =>
            {
                debug!(cafe_id = %record.cafe_id, "Session persisted");
                true
            }
            Ok(_) => {
                warn!(path = %self.path.display(), "Session verification read mismatched");
                false
            }
            Err(e) => {
                warn!(error = %e, "Session verification read failed");
                false
            }
        }
    }

    /// Load the current record.
    ///
    /// Returns `None` when the record is absent, unreadable, or expired.
    /// An expired record found here is proactively deleted so no later
    /// load has to filter it again.
    pub async fn load(&self) -> Option<CafeSession> {
        let record = match self.read_record().await {
            Ok(Some(record)) => record,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, path = %self.path.display(), "Failed to read session record");
                return None;
            }
        };

        if record.is_expired_at(Utc::now()) {
            debug!(cafe_id = %record.cafe_id, "Evicting expired session record");
            self.clear().await;
            return None;
        }

        Some(record)
    }

    /// Delete the record unconditionally. Idempotent; "nothing to delete"
    /// is success.
    pub async fn clear(&self) -> bool {
        match fs::remove_file(&self.path).await {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(e) => {
                warn!(error = %e, path = %self.path.display(), "Failed to clear session record");
                false
            }
        }
    }

    /// Whether the session is expired right now.
    pub fn is_expired(&self, session: &CafeSession) -> bool {
        session.is_expired_at(Utc::now())
    }

    /// Remaining time right now, decomposed for display.
    pub fn time_remaining(&self, session: &CafeSession) -> TimeRemaining {
        session.time_remaining_at(Utc::now())
    }

    async fn write_record(&self, record: &CafeSession) -> AppResult<()> {
        ensure_parent(&self.path).await?;
        let json = serde_json::to_vec_pretty(record)?;
        fs::write(&self.path, json).await?;
        Ok(())
    }

    async fn read_record(&self) -> AppResult<Option<CafeSession>> {
        let raw = match fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let record = serde_json::from_slice(&raw)?;
        Ok(Some(record))
    }
}

/// Ensure the parent directory of a path exists.
async fn ensure_parent(path: &Path) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }
    Ok(())
}
