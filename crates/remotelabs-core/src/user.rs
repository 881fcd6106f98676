//! A user account on the platform.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::role::{Capability, Role};

/// A platform account as returned by `GET /users/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
  pub id:       Uuid,
  pub name:     String,
  pub mail:     String,
  pub role:     Role,
  /// OpenSSH public keys injected into instances the user creates.
  #[serde(default)]
  pub ssh_keys: Vec<String>,
}

impl User {
  pub fn can(&self, capability: Capability) -> bool { self.role.can(capability) }

  pub fn has_ssh_key(&self) -> bool {
    self.ssh_keys.iter().any(|k| !k.trim().is_empty())
  }
}
