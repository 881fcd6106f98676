//! Instances: provisioned virtual machines.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::template::Resources;

/// Hypervisor-reported state. Free text on the wire; unknown values are kept.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum InstanceStatus {
  Running,
  Idle,
  Paused,
  InShutdown,
  Crashed,
  ShutOff,
  PmSuspended,
  Other(String),
}

impl InstanceStatus {
  pub fn as_str(&self) -> &str {
    match self {
      Self::Running => "running",
      Self::Idle => "idle",
      Self::Paused => "paused",
      Self::InShutdown => "in shutdown",
      Self::Crashed => "crashed",
      Self::ShutOff => "shut off",
      Self::PmSuspended => "pmsuspended",
      Self::Other(s) => s,
    }
  }

  pub fn is_running(&self) -> bool { matches!(self, Self::Running) }
}

impl From<String> for InstanceStatus {
  fn from(s: String) -> Self {
    match s.trim().to_ascii_lowercase().as_str() {
      "running" => Self::Running,
      "idle" => Self::Idle,
      "paused" => Self::Paused,
      "in shutdown" => Self::InShutdown,
      "crashed" => Self::Crashed,
      "shut off" => Self::ShutOff,
      "pmsuspended" => Self::PmSuspended,
      _ => Self::Other(s),
    }
  }
}

impl From<InstanceStatus> for String {
  fn from(s: InstanceStatus) -> Self {
    match s {
      InstanceStatus::Other(raw) => raw,
      known => known.as_str().to_owned(),
    }
  }
}

impl fmt::Display for InstanceStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// A VM owned by a user within a subject.
///
/// `resources` is a snapshot of the template at creation time; later edits to
/// the template do not change it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
  pub id:               Uuid,
  pub status:           InstanceStatus,
  pub user_mail:        String,
  pub subject_id:       Uuid,
  #[serde(default)]
  pub subject_name:     Option<String>,
  pub created_at:       DateTime<Utc>,
  #[serde(flatten)]
  pub resources:        Resources,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub wireguard_config: Option<String>,
}
