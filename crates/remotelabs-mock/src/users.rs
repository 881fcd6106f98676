//! Handlers for users, login and the account lifecycle.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/users` | All users |
//! | `POST` | `/users` | Self-registration; unverified until `/verify-email/{token}` |
//! | `POST` | `/users/professors` | Verified professor account |
//! | `POST` | `/users/validate` | Login; returns `{"id":...}` |
//! | `GET`  | `/users/{id}` | 404 if not found |
//! | `DELETE` | `/users/{id}` | 409 while the user has a running instance |
//! | `PUT`  | `/users/update` | Partial profile update |
//! | `GET`  | `/users/{id}/subjects` | Taught or enrolled subjects |
//! | `GET`  | `/verify-email/{token}` | |
//! | `POST` | `/auth/forgot-password` | Always 200 |
//! | `POST` | `/auth/reset-password` | |
//! | `PUT`  | `/renew-session/{token}` | Returns `{"id":...}` |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use remotelabs_core::{
  role::Role,
  subject::Subject,
  user::User,
  wire::{Created, Credentials, MailRequest, NewUser, PasswordReset, ProfileUpdate},
};
use tracing::info;
use uuid::Uuid;

use crate::{
  error::{ApiError, ApiResult},
  state::{Account, Backend, token},
};

fn require_fields(user: &NewUser) -> ApiResult<()> {
  if user.name.trim().is_empty() || user.mail.trim().is_empty() || user.password.is_empty() {
    return Err(ApiError::BadRequest("name, mail and password are required".into()));
  }
  if !user.mail.contains('@') {
    return Err(ApiError::BadRequest(format!("invalid mail address: {}", user.mail)));
  }
  Ok(())
}

fn insert_account(backend: &Backend, body: NewUser, role: Role, verified: bool) -> ApiResult<Uuid> {
  require_fields(&body)?;
  let mut db = backend.db.write();
  if db.account_by_mail(&body.mail).is_some() {
    return Err(ApiError::Conflict(format!("{} is already registered", body.mail)));
  }
  let user = User {
    id: Uuid::new_v4(),
    name: body.name.trim().to_owned(),
    mail: body.mail.trim().to_owned(),
    role,
    ssh_keys: Vec::new(),
  };
  let id = user.id;
  db.accounts.insert(id, Account::new(user, &body.password, verified));
  if !verified {
    db.verify_tokens.insert(token(), id);
  }
  Ok(id)
}

/// `GET /users`
pub async fn list(State(backend): State<Arc<Backend>>) -> Json<Vec<User>> {
  Json(backend.db.read().accounts.values().map(|a| a.user.clone()).collect())
}

/// `POST /users`
pub async fn register(
  State(backend): State<Arc<Backend>>,
  Json(body): Json<NewUser>,
) -> ApiResult<impl IntoResponse> {
  let id = insert_account(&backend, body, Role::Student, false)?;
  info!(%id, "user registered");
  Ok((StatusCode::CREATED, Json(Created { id })))
}

/// `POST /users/professors`
pub async fn create_professor(
  State(backend): State<Arc<Backend>>,
  Json(body): Json<NewUser>,
) -> ApiResult<impl IntoResponse> {
  let id = insert_account(&backend, body, Role::Professor, true)?;
  Ok((StatusCode::CREATED, Json(Created { id })))
}

/// `POST /users/validate`
pub async fn validate(
  State(backend): State<Arc<Backend>>,
  Json(body): Json<Credentials>,
) -> ApiResult<Json<Created>> {
  let db = backend.db.read();
  let account = db
    .account_by_mail(&body.mail)
    .filter(|a| a.password_matches(&body.password))
    .ok_or_else(|| ApiError::Unauthorized("Invalid mail or password".into()))?;
  if !account.verified {
    return Err(ApiError::Forbidden("Email address not verified".into()));
  }
  Ok(Json(Created { id: account.user.id }))
}

/// `GET /users/{id}`
pub async fn get_one(
  State(backend): State<Arc<Backend>>,
  Path(id): Path<Uuid>,
) -> ApiResult<Json<User>> {
  backend
    .db
    .read()
    .accounts
    .get(&id)
    .map(|a| Json(a.user.clone()))
    .ok_or_else(|| ApiError::NotFound(format!("user {id} not found")))
}

/// `DELETE /users/{id}`
pub async fn delete(
  State(backend): State<Arc<Backend>>,
  Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
  let mut db = backend.db.write();
  if !db.accounts.contains_key(&id) {
    return Err(ApiError::NotFound(format!("user {id} not found")));
  }
  if db.instances.values().any(|(owner, i)| *owner == id && i.status.is_running()) {
    return Err(ApiError::Conflict("user has running instances".into()));
  }
  db.accounts.remove(&id);
  db.instances.retain(|_, (owner, _)| *owner != id);
  for members in db.members.values_mut() {
    members.remove(&id);
  }
  Ok(StatusCode::NO_CONTENT)
}

/// `PUT /users/update`
pub async fn update(
  State(backend): State<Arc<Backend>>,
  Json(body): Json<ProfileUpdate>,
) -> ApiResult<StatusCode> {
  let mut db = backend.db.write();
  let account = db
    .accounts
    .get_mut(&body.id)
    .ok_or_else(|| ApiError::NotFound(format!("user {} not found", body.id)))?;
  if let Some(name) = body.name.filter(|n| !n.trim().is_empty()) {
    account.user.name = name;
  }
  if let Some(password) = body.password.filter(|p| !p.is_empty()) {
    account.set_password(&password);
  }
  if let Some(keys) = body.ssh_keys {
    account.user.ssh_keys = keys.into_iter().filter(|k| !k.trim().is_empty()).collect();
  }
  Ok(StatusCode::NO_CONTENT)
}

/// `GET /users/{id}/subjects`
pub async fn subjects(
  State(backend): State<Arc<Backend>>,
  Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<Subject>>> {
  let db = backend.db.read();
  let account = db
    .accounts
    .get(&id)
    .ok_or_else(|| ApiError::NotFound(format!("user {id} not found")))?;
  let subjects = db
    .subjects
    .values()
    .filter(|s| {
      s.professor_mail.eq_ignore_ascii_case(&account.user.mail)
        || db.members.get(&s.id).is_some_and(|m| m.contains(&id))
    })
    .cloned()
    .collect();
  Ok(Json(subjects))
}

// ─── Account lifecycle ────────────────────────────────────────────────────────

/// `GET /verify-email/{token}`
pub async fn verify_email(
  State(backend): State<Arc<Backend>>,
  Path(t): Path<String>,
) -> ApiResult<&'static str> {
  let mut db = backend.db.write();
  let id = db
    .verify_tokens
    .remove(&t)
    .ok_or_else(|| ApiError::NotFound("Invalid or expired verification link".into()))?;
  if let Some(account) = db.accounts.get_mut(&id) {
    account.verified = true;
  }
  Ok("Email verified")
}

/// `POST /auth/forgot-password`
///
/// Answers 200 whether or not the address exists.
pub async fn forgot_password(
  State(backend): State<Arc<Backend>>,
  Json(body): Json<MailRequest>,
) -> StatusCode {
  let mut db = backend.db.write();
  if let Some(id) = db.user_id_by_mail(&body.mail) {
    db.reset_tokens.retain(|_, v| *v != id);
    db.reset_tokens.insert(token(), id);
  }
  StatusCode::OK
}

/// `POST /auth/reset-password`
pub async fn reset_password(
  State(backend): State<Arc<Backend>>,
  Json(body): Json<PasswordReset>,
) -> ApiResult<StatusCode> {
  if body.password.is_empty() {
    return Err(ApiError::BadRequest("password is required".into()));
  }
  let mut db = backend.db.write();
  let id = db
    .reset_tokens
    .remove(&body.token)
    .ok_or_else(|| ApiError::NotFound("Invalid or expired reset link".into()))?;
  if let Some(account) = db.accounts.get_mut(&id) {
    account.set_password(&body.password);
  }
  Ok(StatusCode::OK)
}

/// `PUT /renew-session/{token}`
pub async fn renew_session(
  State(backend): State<Arc<Backend>>,
  Path(t): Path<String>,
) -> ApiResult<Json<Created>> {
  let id = backend
    .db
    .write()
    .renew_tokens
    .remove(&t)
    .ok_or_else(|| ApiError::Unauthorized("Session renewal link is invalid".into()))?;
  Ok(Json(Created { id }))
}
