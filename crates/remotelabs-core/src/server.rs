//! Fleet health snapshot entries.

use serde::{Deserialize, Serialize};

/// One hypervisor host as reported by `GET /servers/status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerStatus {
  pub name:         String,
  #[serde(default = "online_default")]
  pub online:       bool,
  /// Utilisation percentages in `0.0..=100.0`.
  pub cpu_percent:  f64,
  pub ram_percent:  f64,
  pub disk_percent: f64,
}

fn online_default() -> bool { true }
