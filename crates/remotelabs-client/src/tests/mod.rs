//! Client tests against the in-memory backend on a localhost port.

mod creation;
mod monitor;
mod resources;
mod session;

use std::sync::Arc;

use remotelabs_core::{role::Role, user::User};
use remotelabs_mock::Backend;
use tokio::task::JoinHandle;

use crate::{ApiClient, ApiConfig};

pub(crate) const KEY: &str = "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAITestKey test@lab";

pub(crate) struct Harness {
  pub backend: Arc<Backend>,
  pub client:  ApiClient,
  server:      JoinHandle<()>,
}

impl Harness {
  pub async fn start() -> Self {
    let backend = Arc::new(Backend::new());
    let (url, server) = remotelabs_mock::spawn(Arc::clone(&backend))
      .await
      .expect("bind mock backend");
    let client = ApiClient::new(ApiConfig::new(url)).expect("client");
    Self { backend, client, server }
  }

  pub fn student(&self, mail: &str) -> User {
    self.backend.seed_user("Student", mail, "pw", Role::Student, &[KEY])
  }

  pub fn professor(&self, mail: &str) -> User {
    self.backend.seed_user("Professor", mail, "pw", Role::Professor, &[KEY])
  }

  pub fn admin(&self, mail: &str) -> User {
    self.backend.seed_user("Admin", mail, "pw", Role::Admin, &[KEY])
  }
}

impl Drop for Harness {
  fn drop(&mut self) { self.server.abort(); }
}
