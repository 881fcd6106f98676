//! Durable storage for the session id.
//!
//! The session id is the only client state that outlives a process. It is
//! stored with an absolute expiry seven days after it was written; an expired
//! entry reads as absent and is removed.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::{Error, Result};

/// How long a persisted session id stays valid, in days.
pub const SESSION_TTL_DAYS: i64 = 7;

/// A persisted session id with its expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSession {
  pub user_id:    Uuid,
  pub expires_at: DateTime<Utc>,
}

impl PersistedSession {
  pub fn issue(user_id: Uuid) -> Self {
    Self { user_id, expires_at: Utc::now() + Duration::days(SESSION_TTL_DAYS) }
  }

  pub fn is_expired(&self, now: DateTime<Utc>) -> bool { now >= self.expires_at }
}

/// Where the session id lives between runs.
pub trait SessionPersistence: Send + Sync {
  /// The stored, unexpired session, if any.
  fn load(&self) -> Result<Option<PersistedSession>>;

  /// Store `user_id` with a fresh expiry, replacing any previous entry.
  fn save(&self, user_id: Uuid) -> Result<()>;

  /// Forget the stored session. Clearing an empty store is not an error.
  fn clear(&self) -> Result<()>;
}

// ─── File ─────────────────────────────────────────────────────────────────────

/// JSON file on disk, e.g. `~/.config/remotelabs/session.json`.
#[derive(Debug, Clone)]
pub struct FileSession {
  path: PathBuf,
}

impl FileSession {
  pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }

  pub fn path(&self) -> &Path { &self.path }
}

fn storage_err(path: &Path, e: impl std::fmt::Display) -> Error {
  Error::Persistence(format!("{}: {e}", path.display()))
}

impl SessionPersistence for FileSession {
  fn load(&self) -> Result<Option<PersistedSession>> {
    let raw = match std::fs::read_to_string(&self.path) {
      Ok(raw) => raw,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
      Err(e) => return Err(storage_err(&self.path, e)),
    };
    let session: PersistedSession = match serde_json::from_str(&raw) {
      Ok(s) => s,
      Err(e) => {
        debug!(path = %self.path.display(), error = %e, "discarding unreadable session file");
        self.clear()?;
        return Ok(None);
      }
    };
    if session.is_expired(Utc::now()) {
      debug!(path = %self.path.display(), "session expired");
      self.clear()?;
      return Ok(None);
    }
    Ok(Some(session))
  }

  fn save(&self, user_id: Uuid) -> Result<()> {
    if let Some(dir) = self.path.parent()
      && !dir.as_os_str().is_empty()
    {
      std::fs::create_dir_all(dir).map_err(|e| storage_err(dir, e))?;
    }
    let body = serde_json::to_string_pretty(&PersistedSession::issue(user_id))
      .map_err(|e| storage_err(&self.path, e))?;
    std::fs::write(&self.path, body).map_err(|e| storage_err(&self.path, e))
  }

  fn clear(&self) -> Result<()> {
    match std::fs::remove_file(&self.path) {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
      Err(e) => Err(storage_err(&self.path, e)),
    }
  }
}

// ─── Memory ───────────────────────────────────────────────────────────────────

/// Process-local store; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemorySession {
  slot: Mutex<Option<PersistedSession>>,
}

impl MemorySession {
  pub fn new() -> Self { Self::default() }

  /// Pre-populate with an arbitrary entry (e.g. an already-expired one).
  pub fn with(session: PersistedSession) -> Self { Self { slot: Mutex::new(Some(session)) } }
}

impl SessionPersistence for MemorySession {
  fn load(&self) -> Result<Option<PersistedSession>> {
    let mut slot = self.slot.lock();
    if slot.is_some_and(|s| s.is_expired(Utc::now())) {
      *slot = None;
    }
    Ok(*slot)
  }

  fn save(&self, user_id: Uuid) -> Result<()> {
    *self.slot.lock() = Some(PersistedSession::issue(user_id));
    Ok(())
  }

  fn clear(&self) -> Result<()> {
    *self.slot.lock() = None;
    Ok(())
  }
}

impl<P: SessionPersistence + ?Sized> SessionPersistence for std::sync::Arc<P> {
  fn load(&self) -> Result<Option<PersistedSession>> { (**self).load() }
  fn save(&self, user_id: Uuid) -> Result<()> { (**self).save(user_id) }
  fn clear(&self) -> Result<()> { (**self).clear() }
}
