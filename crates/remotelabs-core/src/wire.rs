//! Request and response bodies exchanged with the RemoteLabs API.
//!
//! Field names are camelCase on the wire.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::template::Resources;

/// Body of `POST /users/validate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
  pub mail:     String,
  pub password: String,
}

/// Body of `POST /users` and `POST /users/professors`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
  pub name:     String,
  pub mail:     String,
  pub password: String,
}

/// Body of `PUT /users/update`. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
  pub id:       Uuid,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name:     Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub password: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub ssh_keys: Option<Vec<String>>,
}

/// Body of `POST /subjects`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSubject {
  pub name:           String,
  pub code:           String,
  pub professor_mail: String,
}

/// Where a template's disk image comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum TemplateSource {
  /// Snapshot an existing (usually professor-customised) instance.
  Instance(Uuid),
  /// Start from an immutable base image.
  Base(String),
}

/// Body of `POST /templates/define`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateDefinition {
  pub source:       TemplateSource,
  pub subject_id:   Uuid,
  pub description:  String,
  pub is_validated: bool,
  #[serde(flatten)]
  pub resources:    Resources,
}

/// What a new instance boots from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum InstanceSource {
  Template(Uuid),
  Base(String),
}

/// Body of `POST /instances/create`.
///
/// `resources` is required when booting from a base and ignored for
/// templates, which carry their own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInstance {
  pub user_id:    Uuid,
  pub subject_id: Uuid,
  pub source:     InstanceSource,
  pub ssh_keys:   Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub resources:  Option<Resources>,
}

/// `{ "id": ... }` returned by every creating endpoint and by login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Created {
  pub id: Uuid,
}

/// Body of `POST /auth/forgot-password`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailRequest {
  pub mail: String,
}

/// Body of `POST /auth/reset-password`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordReset {
  pub token:    String,
  pub password: String,
}
