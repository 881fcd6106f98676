//! In-memory reference backend for the RemoteLabs API.
//!
//! Implements every endpoint the client calls, records each request it
//! receives and can be told to delay or fail chosen routes. The client's tests run
//! against it; the `remotelabs-mock` binary serves it for local demos.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let backend = Arc::new(Backend::new());
//! axum::serve(listener, remotelabs_mock::router(backend)).await?;
//! ```

pub mod error;
pub mod instances;
pub mod state;
pub mod subjects;
pub mod templates;
pub mod users;

use std::{net::SocketAddr, sync::Arc};

use axum::{
  Json, Router,
  extract::{Request, State},
  http::StatusCode,
  middleware::{self, Next},
  response::{IntoResponse, Response},
  routing::{delete, get, post, put},
};
use remotelabs_core::server::ServerStatus;
use tokio::{net::TcpListener, task::JoinHandle};
use tower_http::trace::TraceLayer;

pub use error::ApiError;
pub use state::{Backend, RecordedRequest};

/// Build the API router for `backend`.
pub fn router(backend: Arc<Backend>) -> Router {
  Router::new()
    // Users & account lifecycle
    .route("/users", get(users::list).post(users::register))
    .route("/users/professors", post(users::create_professor))
    .route("/users/validate", post(users::validate))
    .route("/users/update", put(users::update))
    .route("/users/{id}", get(users::get_one).delete(users::delete))
    .route("/users/{id}/subjects", get(users::subjects))
    .route("/verify-email/{token}", get(users::verify_email))
    .route("/auth/forgot-password", post(users::forgot_password))
    .route("/auth/reset-password", post(users::reset_password))
    .route("/renew-session/{token}", put(users::renew_session))
    // Subjects
    .route("/subjects", post(subjects::create))
    .route("/subjects/{id}", delete(subjects::delete))
    .route("/subjects/{id}/users", get(subjects::members))
    .route("/subjects/{id}/add/users/{email}", put(subjects::enroll))
    .route("/subjects/{id}/remove/users/{email}", delete(subjects::unenroll))
    // Templates
    .route("/bases", get(templates::bases))
    .route("/templates/define", post(templates::define))
    .route("/templates/subjects/{subject_id}", get(templates::for_subject))
    .route("/templates/delete/{template_id}/{subject_id}", delete(templates::delete))
    // Instances
    .route("/instances/create", post(instances::create))
    .route("/instances/status/{user_id}", get(instances::for_user))
    .route("/instances/start/{id}", post(instances::start))
    .route("/instances/stop/{id}", post(instances::stop))
    .route("/instances/delete/{id}", delete(instances::delete))
    .route("/instances/wireguard/{id}", get(instances::wireguard))
    // Fleet
    .route("/servers/status", get(servers_status))
    .layer(middleware::from_fn_with_state(Arc::clone(&backend), record_and_inject))
    .layer(TraceLayer::new_for_http())
    .with_state(backend)
}

/// `GET /servers/status`
async fn servers_status(State(backend): State<Arc<Backend>>) -> Json<Vec<ServerStatus>> {
  Json(backend.db.read().servers.clone())
}

/// Log every request, apply any configured delay, then short-circuit it if
/// a fault matches.
async fn record_and_inject(
  State(backend): State<Arc<Backend>>,
  req: Request,
  next: Next,
) -> Response {
  let method = req.method().clone();
  let path = req.uri().path().to_owned();
  backend.record(method.clone(), path.clone());
  if let Some(by) = backend.delay_for(&method, &path) {
    tokio::time::sleep(by).await;
  }
  if backend.is_faulted(&method, &path) {
    tracing::debug!(%method, %path, "injected failure");
    return (StatusCode::INTERNAL_SERVER_ERROR, format!("injected failure: {method} {path}"))
      .into_response();
  }
  next.run(req).await
}

/// Serve `backend` on an ephemeral localhost port.
///
/// Returns the base URL and the server task; abort the task to stop it.
pub async fn spawn(backend: Arc<Backend>) -> std::io::Result<(String, JoinHandle<()>)> {
  let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
  let addr = listener.local_addr()?;
  let app = router(backend);
  let task = tokio::spawn(async move {
    if let Err(e) = axum::serve(listener, app).await {
      tracing::error!(error = %e, "mock backend stopped");
    }
  });
  Ok((format!("http://{addr}"), task))
}

// ─── Tests ────────────────────────────────────────────────────────────────────
