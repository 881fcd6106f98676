//! Handlers for `/subjects` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/subjects` | Body: [`NewSubject`]; 409 on duplicate code |
//! | `DELETE` | `/subjects/{id}` | Drops the subject's templates and enrollments |
//! | `GET`  | `/subjects/{id}/users` | Enrolled users |
//! | `PUT`  | `/subjects/{id}/add/users/{email}` | 404 for unknown addresses |
//! | `DELETE` | `/subjects/{id}/remove/users/{email}` | |

use std::{collections::BTreeSet, sync::Arc};

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use remotelabs_core::{
  subject::Subject,
  user::User,
  wire::{Created, NewSubject},
};
use tracing::info;
use uuid::Uuid;

use crate::{
  error::{ApiError, ApiResult},
  state::Backend,
};

fn subject_missing(id: Uuid) -> ApiError { ApiError::NotFound(format!("subject {id} not found")) }

/// `POST /subjects`
pub async fn create(
  State(backend): State<Arc<Backend>>,
  Json(body): Json<NewSubject>,
) -> ApiResult<impl IntoResponse> {
  if body.name.trim().is_empty() || body.code.trim().is_empty() {
    return Err(ApiError::BadRequest("name and code are required".into()));
  }
  let mut db = backend.db.write();
  if db.subjects.values().any(|s| s.code == body.code.trim()) {
    return Err(ApiError::Conflict(format!("a subject with code {} already exists", body.code)));
  }
  let professor_name = db.account_by_mail(&body.professor_mail).map(|a| a.user.name.clone());
  let subject = Subject {
    id: Uuid::new_v4(),
    name: body.name.trim().to_owned(),
    code: body.code.trim().to_owned(),
    professor_name,
    professor_mail: body.professor_mail.trim().to_owned(),
  };
  let id = subject.id;
  db.members.insert(id, BTreeSet::new());
  db.subjects.insert(id, subject);
  info!(%id, "subject created");
  Ok((StatusCode::CREATED, Json(Created { id })))
}

/// `DELETE /subjects/{id}`
pub async fn delete(
  State(backend): State<Arc<Backend>>,
  Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
  let mut db = backend.db.write();
  db.subjects.remove(&id).ok_or_else(|| subject_missing(id))?;
  db.members.remove(&id);
  db.templates.retain(|_, t| t.subject_id != id);
  Ok(StatusCode::NO_CONTENT)
}

/// `GET /subjects/{id}/users`
pub async fn members(
  State(backend): State<Arc<Backend>>,
  Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<User>>> {
  let db = backend.db.read();
  let ids = db.members.get(&id).ok_or_else(|| subject_missing(id))?;
  let users = ids
    .iter()
    .filter_map(|uid| db.accounts.get(uid))
    .map(|a| a.user.clone())
    .collect();
  Ok(Json(users))
}

/// `PUT /subjects/{id}/add/users/{email}`
pub async fn enroll(
  State(backend): State<Arc<Backend>>,
  Path((id, email)): Path<(Uuid, String)>,
) -> ApiResult<StatusCode> {
  let mut db = backend.db.write();
  let user_id = db
    .user_id_by_mail(&email)
    .ok_or_else(|| ApiError::NotFound(format!("no user with mail {email}")))?;
  db.members.get_mut(&id).ok_or_else(|| subject_missing(id))?.insert(user_id);
  Ok(StatusCode::OK)
}

/// `DELETE /subjects/{id}/remove/users/{email}`
pub async fn unenroll(
  State(backend): State<Arc<Backend>>,
  Path((id, email)): Path<(Uuid, String)>,
) -> ApiResult<StatusCode> {
  let mut db = backend.db.write();
  let user_id = db
    .user_id_by_mail(&email)
    .ok_or_else(|| ApiError::NotFound(format!("no user with mail {email}")))?;
  let members = db.members.get_mut(&id).ok_or_else(|| subject_missing(id))?;
  if !members.remove(&user_id) {
    return Err(ApiError::NotFound(format!("{email} is not enrolled")));
  }
  Ok(StatusCode::NO_CONTENT)
}
