//! Handlers for bases and templates.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/bases` | Source images |
//! | `POST` | `/templates/define` | Body: [`TemplateDefinition`]; returns 201 + `{"id":...}` |
//! | `GET`  | `/templates/subjects/{subjectId}` | |
//! | `DELETE` | `/templates/delete/{templateId}/{subjectId}` | |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use remotelabs_core::{
  template::{Base, Template},
  wire::{Created, TemplateDefinition, TemplateSource},
};
use uuid::Uuid;

use crate::{
  error::{ApiError, ApiResult},
  state::Backend,
};

/// `GET /bases`
pub async fn bases(State(backend): State<Arc<Backend>>) -> Json<Vec<Base>> {
  Json(backend.db.read().bases.values().cloned().collect())
}

/// `POST /templates/define`
pub async fn define(
  State(backend): State<Arc<Backend>>,
  Json(def): Json<TemplateDefinition>,
) -> ApiResult<impl IntoResponse> {
  let mut db = backend.db.write();
  if !db.subjects.contains_key(&def.subject_id) {
    return Err(ApiError::NotFound(format!("subject {} not found", def.subject_id)));
  }
  match &def.source {
    TemplateSource::Base(id) if !db.bases.contains_key(id) => {
      return Err(ApiError::NotFound(format!("base {id} not found")));
    }
    TemplateSource::Instance(id) if !db.instances.contains_key(id) => {
      return Err(ApiError::NotFound(format!("instance {id} not found")));
    }
    _ => {}
  }
  let r = def.resources;
  if r.vcpu_count == 0 || r.vram_mb == 0 || r.size_mb == 0 {
    return Err(ApiError::BadRequest("resources must be positive".into()));
  }
  let template = Template {
    id:          Uuid::new_v4(),
    description: def.description,
    subject_id:  def.subject_id,
    resources:   def.resources,
  };
  let id = template.id;
  db.templates.insert(id, template);
  Ok((StatusCode::CREATED, Json(Created { id })))
}

/// `GET /templates/subjects/{subjectId}`
pub async fn for_subject(
  State(backend): State<Arc<Backend>>,
  Path(subject_id): Path<Uuid>,
) -> Json<Vec<Template>> {
  Json(
    backend
      .db
      .read()
      .templates
      .values()
      .filter(|t| t.subject_id == subject_id)
      .cloned()
      .collect(),
  )
}

/// `DELETE /templates/delete/{templateId}/{subjectId}`
pub async fn delete(
  State(backend): State<Arc<Backend>>,
  Path((template_id, subject_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
  let mut db = backend.db.write();
  let in_subject = db
    .templates
    .get(&template_id)
    .is_some_and(|t| t.subject_id == subject_id);
  if !in_subject {
    return Err(ApiError::NotFound(format!(
      "template {template_id} not found in subject {subject_id}"
    )));
  }
  db.templates.remove(&template_id);
  Ok(StatusCode::NO_CONTENT)
}
