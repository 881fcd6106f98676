//! The single error type returned by every client operation.

use remotelabs_core::role::Capability;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  /// The backend answered with a non-success status. `message` is the
  /// response body, verbatim.
  #[error("{message}")]
  Api { status: u16, message: String },

  #[error("could not build HTTP client: {0}")]
  Client(#[source] reqwest::Error),

  #[error("{method} {path} failed: {source}")]
  Transport {
    method: &'static str,
    path:   String,
    #[source]
    source: reqwest::Error,
  },

  #[error("unexpected response from {path}: {source}")]
  Decode {
    path:   String,
    #[source]
    source: reqwest::Error,
  },

  /// A client-side check failed; no request was issued.
  #[error(transparent)]
  Precondition(#[from] Precondition),

  #[error("session storage: {0}")]
  Persistence(String),

  /// Template/VM creation failed and deleting the customisation VM or the
  /// half-created subject failed as well. Whatever could not be deleted is
  /// left orphaned on the backend.
  #[error("{cause}; rolling back subject {subject_id} also failed: {rollback}")]
  RollbackFailed {
    subject_id: Uuid,
    cause:      Box<Error>,
    rollback:   Box<Error>,
  },
}

impl Error {
  /// HTTP status of an [`Error::Api`] response.
  pub fn status(&self) -> Option<u16> {
    match self {
      Error::Api { status, .. } => Some(*status),
      _ => None,
    }
  }
}

/// Checks performed before a mutating request is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Precondition {
  #[error("not logged in")]
  NotLoggedIn,

  #[error("add an SSH public key to your profile first")]
  MissingSshKey,

  #[error("you cannot remove yourself from a subject")]
  SelfRemoval,

  #[error("user {0} still has a running instance")]
  UserHasRunningInstance(Uuid),

  #[error("instance {0} is already running; stop it before starting another")]
  InstanceAlreadyRunning(Uuid),

  #[error("your role does not allow: {0}")]
  Forbidden(Capability),

  #[error("invalid input: {0}")]
  InvalidInput(String),
}

impl From<remotelabs_core::Error> for Error {
  fn from(e: remotelabs_core::Error) -> Self {
    Error::Precondition(Precondition::InvalidInput(e.to_string()))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
