use std::sync::Arc;

use chrono::{Duration, Utc};
use remotelabs_core::{role::Capability, wire::ProfileUpdate};
use reqwest::Method;
use uuid::Uuid;

use super::Harness;
use crate::{
  Error, Precondition,
  persist::{FileSession, MemorySession, PersistedSession, SessionPersistence},
  session::{Route, SessionService},
};

fn service(h: &Harness, store: &Arc<MemorySession>) -> SessionService<Arc<MemorySession>> {
  SessionService::new(h.client.clone(), Arc::clone(store))
}

// ─── Login ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn login_populates_user_and_persists_returned_id() {
  let h = Harness::start().await;
  let alice = h.student("alice@uni.cat");
  let store = Arc::new(MemorySession::new());
  let mut session = service(&h, &store);
  session.init().await;

  session.login("alice@uni.cat", "pw").await.unwrap();

  let state = session.state();
  assert!(state.is_logged_in);
  assert_eq!(state.user.as_ref(), Some(&alice));
  assert_eq!(store.load().unwrap().map(|s| s.user_id), Some(alice.id));
  assert_eq!(session.route(), Route::Home);
}

#[tokio::test]
async fn failed_login_returns_body_verbatim_and_stays_logged_out() {
  let h = Harness::start().await;
  h.student("alice@uni.cat");
  let store = Arc::new(MemorySession::new());
  let mut session = service(&h, &store);
  session.init().await;

  let err = session.login("alice@uni.cat", "wrong").await.unwrap_err();

  assert!(matches!(&err, Error::Api { status: 401, message } if message == "Invalid mail or password"));
  assert_eq!(err.to_string(), "Invalid mail or password");
  assert!(!session.state().is_logged_in);
  assert!(session.state().user.is_none());
  assert!(store.load().unwrap().is_none());
  assert_eq!(session.route(), Route::Login);
}

// ─── Restore ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn reload_after_logout_makes_no_user_request() {
  let h = Harness::start().await;
  h.student("alice@uni.cat");
  let store = Arc::new(MemorySession::new());
  let mut session = service(&h, &store);
  session.init().await;
  session.login("alice@uni.cat", "pw").await.unwrap();
  session.logout().unwrap();
  assert_eq!(session.route(), Route::Login);

  h.backend.clear_requests();
  let mut reloaded = service(&h, &store);
  let state = reloaded.init().await;

  assert!(!state.is_logged_in);
  assert!(!state.is_loading);
  assert!(h.backend.requests().is_empty());
}

#[tokio::test]
async fn init_restores_a_persisted_session() {
  let h = Harness::start().await;
  let alice = h.student("alice@uni.cat");
  let store = Arc::new(MemorySession::new());
  store.save(alice.id).unwrap();

  let mut session = service(&h, &store);
  assert!(session.state().is_loading);
  let state = session.init().await.clone();

  assert!(state.is_logged_in);
  assert!(!state.is_loading);
  assert_eq!(state.user.map(|u| u.mail), Some("alice@uni.cat".to_string()));
  assert_eq!(session.route(), Route::Home);
  assert_eq!(h.backend.count(Method::GET, &format!("/users/{}", alice.id)), 1);
}

#[tokio::test]
async fn unknown_persisted_id_is_cleared() {
  let h = Harness::start().await;
  let store = Arc::new(MemorySession::new());
  store.save(Uuid::new_v4()).unwrap();

  let mut session = service(&h, &store);
  let state = session.init().await;

  assert!(!state.is_logged_in);
  assert!(!state.is_loading);
  assert!(store.load().unwrap().is_none());
}

#[tokio::test]
async fn expired_session_is_not_restored() {
  let h = Harness::start().await;
  let alice = h.student("alice@uni.cat");
  let store = Arc::new(MemorySession::with(PersistedSession {
    user_id:    alice.id,
    expires_at: Utc::now() - Duration::minutes(1),
  }));

  let mut session = service(&h, &store);
  assert!(!session.init().await.is_logged_in);
  assert!(h.backend.requests().is_empty());
}

// ─── Registration & account lifecycle ─────────────────────────────────────────

#[tokio::test]
async fn register_does_not_log_in_until_verified() {
  let h = Harness::start().await;
  let store = Arc::new(MemorySession::new());
  let mut session = service(&h, &store);
  session.init().await;

  session.register("Bob", "bob@uni.cat", "pw").await.unwrap();
  assert!(!session.state().is_logged_in);
  assert!(store.load().unwrap().is_none());

  let err = session.login("bob@uni.cat", "pw").await.unwrap_err();
  assert_eq!(err.status(), Some(403));

  let token = h.backend.verification_token("bob@uni.cat").unwrap();
  session.verify_email(&token).await.unwrap();
  session.login("bob@uni.cat", "pw").await.unwrap();
  assert!(session.state().is_logged_in);
}

#[tokio::test]
async fn duplicate_registration_reports_backend_message() {
  let h = Harness::start().await;
  h.student("alice@uni.cat");
  let mut session = service(&h, &Arc::new(MemorySession::new()));

  let err = session.register("Alice", "alice@uni.cat", "pw").await.unwrap_err();
  assert_eq!(err.to_string(), "alice@uni.cat is already registered");
}

#[tokio::test]
async fn password_reset_flow() {
  let h = Harness::start().await;
  h.student("alice@uni.cat");
  let mut session = service(&h, &Arc::new(MemorySession::new()));

  session.forgot_password("alice@uni.cat").await.unwrap();
  let token = h.backend.reset_token("alice@uni.cat").unwrap();
  session.reset_password(&token, "new-pw").await.unwrap();

  assert!(session.login("alice@uni.cat", "pw").await.is_err());
  session.login("alice@uni.cat", "new-pw").await.unwrap();
}

#[tokio::test]
async fn renew_session_logs_in_and_persists() {
  let h = Harness::start().await;
  let alice = h.student("alice@uni.cat");
  let store = Arc::new(MemorySession::new());
  let mut session = service(&h, &store);
  session.init().await;

  let token = h.backend.issue_renewal(alice.id);
  session.renew_session(&token).await.unwrap();

  assert!(session.state().is_logged_in);
  assert_eq!(store.load().unwrap().map(|s| s.user_id), Some(alice.id));
  assert!(session.renew_session(&token).await.is_err());
}

#[tokio::test]
async fn update_profile_reloads_user() {
  let h = Harness::start().await;
  let professor = h.professor("prof@uni.cat");
  let mut session = service(&h, &Arc::new(MemorySession::new()));
  session.login("prof@uni.cat", "pw").await.unwrap();

  let update = ProfileUpdate {
    name: Some("Dr. Prof".into()),
    ssh_keys: Some(vec!["ssh-rsa AAAAB3 new@lab".into()]),
    ..Default::default()
  };
  let user = session.update_profile(update).await.unwrap();

  assert_eq!(user.id, professor.id);
  assert_eq!(user.name, "Dr. Prof");
  assert_eq!(user.ssh_keys, vec!["ssh-rsa AAAAB3 new@lab".to_string()]);
}

#[tokio::test]
async fn capability_checks_use_the_session_role() {
  let h = Harness::start().await;
  h.student("alice@uni.cat");
  let mut session = service(&h, &Arc::new(MemorySession::new()));

  assert!(matches!(
    session.current_user(),
    Err(Error::Precondition(Precondition::NotLoggedIn))
  ));
  session.login("alice@uni.cat", "pw").await.unwrap();
  assert!(matches!(
    session.require(Capability::ViewFleetStatus),
    Err(Error::Precondition(Precondition::Forbidden(Capability::ViewFleetStatus)))
  ));
}

// ─── File persistence ─────────────────────────────────────────────────────────

#[test]
fn file_session_round_trips_and_clears() {
  let path = std::env::temp_dir().join(format!("remotelabs-{}/session.json", Uuid::new_v4()));
  let store = FileSession::new(&path);
  assert!(store.load().unwrap().is_none());

  let id = Uuid::new_v4();
  store.save(id).unwrap();
  let loaded = store.load().unwrap().unwrap();
  assert_eq!(loaded.user_id, id);
  assert!(loaded.expires_at > Utc::now() + Duration::days(6));

  store.clear().unwrap();
  assert!(!path.exists());
  store.clear().unwrap();
}

#[test]
fn file_session_discards_expired_entry() {
  let path = std::env::temp_dir().join(format!("remotelabs-{}.json", Uuid::new_v4()));
  let stale = PersistedSession { user_id: Uuid::new_v4(), expires_at: Utc::now() - Duration::days(1) };
  std::fs::write(&path, serde_json::to_string(&stale).unwrap()).unwrap();

  let store = FileSession::new(&path);
  assert!(store.load().unwrap().is_none());
  assert!(!path.exists());
}
