//! Path templates of the RemoteLabs API, rendered against a base URL.
//!
//! Every user-supplied path segment is percent-encoded.

use urlencoding::encode;
use uuid::Uuid;

/// Resolves endpoint URLs for one backend.
#[derive(Debug, Clone)]
pub struct Endpoints {
  base: String,
}

impl Endpoints {
  pub fn new(base_url: &str) -> Self {
    Self { base: base_url.trim_end_matches('/').to_owned() }
  }

  pub fn base(&self) -> &str { &self.base }

  /// Absolute URL for an already-rendered `path`.
  pub fn url(&self, path: &str) -> String { format!("{}{}", self.base, path) }

  // ── Users ─────────────────────────────────────────────────────────────────

  pub fn users() -> String { "/users".into() }
  pub fn professors() -> String { "/users/professors".into() }
  pub fn validate() -> String { "/users/validate".into() }
  pub fn user(id: Uuid) -> String { format!("/users/{id}") }
  pub fn update_user() -> String { "/users/update".into() }
  pub fn user_subjects(id: Uuid) -> String { format!("/users/{id}/subjects") }

  // ── Subjects ──────────────────────────────────────────────────────────────

  pub fn subjects() -> String { "/subjects".into() }
  pub fn subject(id: Uuid) -> String { format!("/subjects/{id}") }
  pub fn subject_users(id: Uuid) -> String { format!("/subjects/{id}/users") }

  pub fn enroll(subject_id: Uuid, mail: &str) -> String {
    format!("/subjects/{subject_id}/add/users/{}", encode(mail))
  }

  pub fn unenroll(subject_id: Uuid, mail: &str) -> String {
    format!("/subjects/{subject_id}/remove/users/{}", encode(mail))
  }

  // ── Templates & bases ─────────────────────────────────────────────────────

  pub fn bases() -> String { "/bases".into() }
  pub fn define_template() -> String { "/templates/define".into() }

  pub fn subject_templates(subject_id: Uuid) -> String {
    format!("/templates/subjects/{subject_id}")
  }

  pub fn delete_template(template_id: Uuid, subject_id: Uuid) -> String {
    format!("/templates/delete/{template_id}/{subject_id}")
  }

  // ── Instances ─────────────────────────────────────────────────────────────

  pub fn create_instance() -> String { "/instances/create".into() }
  pub fn user_instances(user_id: Uuid) -> String { format!("/instances/status/{user_id}") }
  pub fn start_instance(id: Uuid) -> String { format!("/instances/start/{id}") }
  pub fn stop_instance(id: Uuid) -> String { format!("/instances/stop/{id}") }
  pub fn delete_instance(id: Uuid) -> String { format!("/instances/delete/{id}") }
  pub fn wireguard(id: Uuid) -> String { format!("/instances/wireguard/{id}") }

  // ── Fleet & account lifecycle ─────────────────────────────────────────────

  pub fn servers_status() -> String { "/servers/status".into() }
  pub fn verify_email(token: &str) -> String { format!("/verify-email/{}", encode(token)) }
  pub fn forgot_password() -> String { "/auth/forgot-password".into() }
  pub fn reset_password() -> String { "/auth/reset-password".into() }
  pub fn renew_session(token: &str) -> String { format!("/renew-session/{}", encode(token)) }
}
