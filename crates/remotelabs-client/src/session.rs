//! Session service: the single source of truth for "who is logged in".
//!
//! Lifecycle: construct with an [`ApiClient`] and a persistence backend, call
//! [`SessionService::init`] once at start-up, and [`SessionService::logout`]
//! to tear the session down. The service never retries a request.

use remotelabs_core::{
  role::Capability,
  user::User,
  wire::{Credentials, NewUser, PasswordReset, ProfileUpdate},
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{ApiClient, Precondition, Result, persist::SessionPersistence};

/// Observable session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
  pub is_logged_in: bool,
  pub user:         Option<User>,
  /// `true` until the first [`SessionService::init`] completes.
  pub is_loading:   bool,
}

impl Default for SessionState {
  fn default() -> Self { Self { is_logged_in: false, user: None, is_loading: true } }
}

/// Where the front-end should be after a session transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
  Login,
  Home,
}

pub struct SessionService<P> {
  client:      ApiClient,
  persistence: P,
  state:       SessionState,
  route:       Route,
}

impl<P: SessionPersistence> SessionService<P> {
  pub fn new(client: ApiClient, persistence: P) -> Self {
    Self { client, persistence, state: SessionState::default(), route: Route::Login }
  }

  pub fn state(&self) -> &SessionState { &self.state }
  pub fn route(&self) -> Route { self.route }
  pub fn client(&self) -> &ApiClient { &self.client }
  pub fn persistence(&self) -> &P { &self.persistence }

  /// The logged-in user, or [`Precondition::NotLoggedIn`].
  pub fn current_user(&self) -> Result<&User> {
    match (&self.state.user, self.state.is_logged_in) {
      (Some(user), true) => Ok(user),
      _ => Err(Precondition::NotLoggedIn.into()),
    }
  }

  /// The logged-in user if their role grants `capability`.
  pub fn require(&self, capability: Capability) -> Result<&User> {
    let user = self.current_user()?;
    if user.can(capability) {
      Ok(user)
    } else {
      Err(Precondition::Forbidden(capability).into())
    }
  }

  // ── Lifecycle ─────────────────────────────────────────────────────────────

  /// Restore a persisted session, if any.
  ///
  /// A stored id whose user cannot be fetched is cleared and the service is
  /// left logged out. `is_loading` is cleared either way.
  pub async fn init(&mut self) -> &SessionState {
    let stored = self.persistence.load().unwrap_or_else(|e| {
      warn!(error = %e, "could not read stored session");
      None
    });

    if let Some(session) = stored {
      match self.fetch_user_details(session.user_id).await {
        Ok(()) => {
          info!(user_id = %session.user_id, "session restored");
          self.route = Route::Home;
        }
        Err(e) => {
          warn!(user_id = %session.user_id, error = %e, "stored session rejected");
          self.forget();
        }
      }
    }

    self.state.is_loading = false;
    &self.state
  }

  /// Validate credentials, persist the returned id and load the user.
  ///
  /// On failure the state is left logged out; an [`Error::Api`] carries the
  /// backend's response body verbatim.
  pub async fn login(&mut self, mail: &str, password: &str) -> Result<()> {
    let credentials = Credentials { mail: mail.to_owned(), password: password.to_owned() };
    let id = self.client.validate(&credentials).await?;
    self.establish(id).await?;
    info!(user_id = %id, "logged in");
    Ok(())
  }

  /// Create an account. Does not log in: the address must be verified first.
  pub async fn register(&mut self, name: &str, mail: &str, password: &str) -> Result<Uuid> {
    let user = NewUser { name: name.to_owned(), mail: mail.to_owned(), password: password.to_owned() };
    Ok(self.client.create_user(&user).await?.id)
  }

  /// Clear the in-memory identity and the persisted id.
  pub fn logout(&mut self) -> Result<()> {
    self.state.user = None;
    self.state.is_logged_in = false;
    self.route = Route::Login;
    info!("logged out");
    self.persistence.clear()
  }

  /// Replace `user` with the backend's copy of user `id`.
  pub async fn fetch_user_details(&mut self, id: Uuid) -> Result<()> {
    let user = self.client.get_user(id).await?;
    self.state.user = Some(user);
    self.state.is_logged_in = true;
    Ok(())
  }

  // ── Account lifecycle ─────────────────────────────────────────────────────

  pub async fn verify_email(&self, token: &str) -> Result<()> {
    self.client.verify_email(token).await
  }

  pub async fn forgot_password(&self, mail: &str) -> Result<()> {
    self.client.forgot_password(mail).await
  }

  pub async fn reset_password(&self, token: &str, password: &str) -> Result<()> {
    let reset = PasswordReset { token: token.to_owned(), password: password.to_owned() };
    self.client.reset_password(&reset).await
  }

  /// Exchange a renewal token for a fresh session, like a login.
  pub async fn renew_session(&mut self, token: &str) -> Result<()> {
    let id = self.client.renew_session(token).await?;
    self.establish(id).await?;
    info!(user_id = %id, "session renewed");
    Ok(())
  }

  /// Update the logged-in user's profile and reload it.
  ///
  /// `update.id` is ignored; the current user's id is always used.
  pub async fn update_profile(&mut self, mut update: ProfileUpdate) -> Result<&User> {
    let id = self.current_user()?.id;
    update.id = id;
    self.client.update_user(&update).await?;
    self.fetch_user_details(id).await?;
    self.current_user()
  }

  // ── Internals ─────────────────────────────────────────────────────────────

  async fn establish(&mut self, id: Uuid) -> Result<()> {
    self.persistence.save(id)?;
    if let Err(e) = self.fetch_user_details(id).await {
      self.forget();
      return Err(e);
    }
    self.route = Route::Home;
    Ok(())
  }

  fn forget(&mut self) {
    self.state.user = None;
    self.state.is_logged_in = false;
    if let Err(e) = self.persistence.clear() {
      warn!(error = %e, "could not clear stored session");
    }
  }
}

impl<P> std::fmt::Debug for SessionService<P> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("SessionService")
      .field("state", &self.state)
      .field("route", &self.route)
      .finish_non_exhaustive()
  }
}
