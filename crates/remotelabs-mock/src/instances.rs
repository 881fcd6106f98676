//! Handlers for `/instances` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/instances/create` | Body: [`NewInstance`]; new VMs boot `running` |
//! | `GET`  | `/instances/status/{userId}` | A user's VMs |
//! | `POST` | `/instances/start/{id}` | |
//! | `POST` | `/instances/stop/{id}` | |
//! | `DELETE` | `/instances/delete/{id}` | |
//! | `GET`  | `/instances/wireguard/{id}` | `text/plain` client configuration |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::Utc;
use remotelabs_core::{
  instance::{Instance, InstanceStatus},
  wire::{Created, InstanceSource, NewInstance},
};
use uuid::Uuid;

use crate::{
  error::{ApiError, ApiResult},
  state::Backend,
};

fn instance_missing(id: Uuid) -> ApiError { ApiError::NotFound(format!("instance {id} not found")) }

fn wireguard_config(id: Uuid, octet: u8) -> String {
  format!(
    "[Interface]\n\
     # instance {id}\n\
     Address = 10.8.0.{octet}/32\n\
     DNS = 10.8.0.1\n\
     \n\
     [Peer]\n\
     AllowedIPs = 10.8.0.0/24\n\
     Endpoint = vpn.remotelabs.local:51820\n\
     PersistentKeepalive = 25\n"
  )
}

/// `POST /instances/create`
pub async fn create(
  State(backend): State<Arc<Backend>>,
  Json(body): Json<NewInstance>,
) -> ApiResult<impl IntoResponse> {
  if body.ssh_keys.iter().all(|k| k.trim().is_empty()) {
    return Err(ApiError::BadRequest("at least one SSH public key is required".into()));
  }
  let mut db = backend.db.write();
  let owner = db
    .accounts
    .get(&body.user_id)
    .map(|a| a.user.clone())
    .ok_or_else(|| ApiError::NotFound(format!("user {} not found", body.user_id)))?;
  let subject = db
    .subjects
    .get(&body.subject_id)
    .cloned()
    .ok_or_else(|| ApiError::NotFound(format!("subject {} not found", body.subject_id)))?;

  let resources = match &body.source {
    InstanceSource::Template(tid) => db
      .templates
      .get(tid)
      .filter(|t| t.subject_id == subject.id)
      .map(|t| t.resources)
      .ok_or_else(|| ApiError::NotFound(format!("template {tid} not found")))?,
    InstanceSource::Base(bid) => {
      if !db.bases.contains_key(bid) {
        return Err(ApiError::NotFound(format!("base {bid} not found")));
      }
      body
        .resources
        .ok_or_else(|| ApiError::BadRequest("resources are required for base images".into()))?
    }
  };

  let id = Uuid::new_v4();
  let octet = u8::try_from(db.instances.len() % 250 + 2).unwrap_or(2);
  let instance = Instance {
    id,
    status: InstanceStatus::Running,
    user_mail: owner.mail,
    subject_id: subject.id,
    subject_name: Some(subject.name),
    created_at: Utc::now(),
    resources,
    wireguard_config: Some(wireguard_config(id, octet)),
  };
  db.instances.insert(id, (owner.id, instance));
  Ok((StatusCode::CREATED, Json(Created { id })))
}

/// `GET /instances/status/{userId}`
pub async fn for_user(
  State(backend): State<Arc<Backend>>,
  Path(user_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Instance>>> {
  let db = backend.db.read();
  if !db.accounts.contains_key(&user_id) {
    return Err(ApiError::NotFound(format!("user {user_id} not found")));
  }
  Ok(Json(
    db.instances
      .values()
      .filter(|(owner, _)| *owner == user_id)
      .map(|(_, i)| i.clone())
      .collect(),
  ))
}

fn set_status(backend: &Backend, id: Uuid, status: InstanceStatus) -> ApiResult<StatusCode> {
  let mut db = backend.db.write();
  let (_, instance) = db.instances.get_mut(&id).ok_or_else(|| instance_missing(id))?;
  if instance.status == status {
    return Err(ApiError::Conflict(format!("instance {id} is already {status}")));
  }
  instance.status = status;
  Ok(StatusCode::OK)
}

/// `POST /instances/start/{id}`
pub async fn start(State(backend): State<Arc<Backend>>, Path(id): Path<Uuid>) -> ApiResult<StatusCode> {
  set_status(&backend, id, InstanceStatus::Running)
}

/// `POST /instances/stop/{id}`
pub async fn stop(State(backend): State<Arc<Backend>>, Path(id): Path<Uuid>) -> ApiResult<StatusCode> {
  set_status(&backend, id, InstanceStatus::ShutOff)
}

/// `DELETE /instances/delete/{id}`
pub async fn delete(State(backend): State<Arc<Backend>>, Path(id): Path<Uuid>) -> ApiResult<StatusCode> {
  backend
    .db
    .write()
    .instances
    .remove(&id)
    .map(|_| StatusCode::NO_CONTENT)
    .ok_or_else(|| instance_missing(id))
}

/// `GET /instances/wireguard/{id}`
pub async fn wireguard(
  State(backend): State<Arc<Backend>>,
  Path(id): Path<Uuid>,
) -> ApiResult<String> {
  let db = backend.db.read();
  let (_, instance) = db.instances.get(&id).ok_or_else(|| instance_missing(id))?;
  instance
    .wireguard_config
    .clone()
    .ok_or_else(|| ApiError::NotFound(format!("instance {id} has no VPN configuration")))
}
