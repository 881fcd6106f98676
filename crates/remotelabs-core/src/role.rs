//! Roles and the capabilities they grant.
//!
//! Role checks are expressed as [`Role::can`] against a closed set of
//! [`Capability`] values instead of comparing role strings at call sites.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::Error;

/// The role a user holds on the platform.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  AsRefStr,
  EnumIter,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Role {
  Student,
  Professor,
  Admin,
}

/// Something a role may or may not be allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum Capability {
  /// Create and delete subjects, enroll and remove members.
  ManageSubjects,
  /// Define and delete VM templates.
  DefineTemplates,
  /// List and delete arbitrary users.
  ManageUsers,
  /// Create professor accounts.
  CreateProfessors,
  /// Read the fleet-wide server health snapshot.
  ViewFleetStatus,
  /// Start an instance while another owned instance is already running.
  RunConcurrentInstances,
}

impl Role {
  /// Whether this role grants `capability`.
  pub fn can(self, capability: Capability) -> bool {
    use Capability::*;
    match self {
      Role::Admin => true,
      Role::Professor => matches!(
        capability,
        ManageSubjects | DefineTemplates | RunConcurrentInstances
      ),
      Role::Student => false,
    }
  }

  /// Parse a role typed by a user, ignoring surrounding whitespace.
  pub fn from_input(s: &str) -> crate::Result<Role> {
    s.trim().parse().map_err(|_| Error::UnknownRole(s.to_owned()))
  }
}
