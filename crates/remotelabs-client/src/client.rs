//! Async HTTP client wrapping the RemoteLabs JSON API.
//!
//! One method per endpoint. Non-success responses become [`Error::Api`]
//! carrying the body text verbatim; nothing is retried.

use std::time::Duration;

use remotelabs_core::{
  instance::Instance,
  server::ServerStatus,
  subject::Subject,
  template::{Base, Template},
  user::User,
  wire::{
    Created, Credentials, MailRequest, NewInstance, NewSubject, NewUser, PasswordReset,
    ProfileUpdate, TemplateDefinition,
  },
};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;
use uuid::Uuid;

use crate::{Error, Result, endpoints::Endpoints};

/// Connection settings for the RemoteLabs API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
  pub timeout:  Duration,
}

impl ApiConfig {
  pub fn new(base_url: impl Into<String>) -> Self {
    Self { base_url: base_url.into(), timeout: Duration::from_secs(30) }
  }
}

/// Async HTTP client for the RemoteLabs REST API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Debug, Clone)]
pub struct ApiClient {
  client:    Client,
  endpoints: Endpoints,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(config.timeout)
      .build()
      .map_err(Error::Client)?;
    Ok(Self { client, endpoints: Endpoints::new(&config.base_url) })
  }

  pub fn endpoints(&self) -> &Endpoints { &self.endpoints }

  // ── Plumbing ──────────────────────────────────────────────────────────────

  fn request(&self, method: Method, path: &str) -> RequestBuilder {
    self.client.request(method, self.endpoints.url(path))
  }

  /// Send `req` and turn non-2xx answers into [`Error::Api`].
  async fn send(&self, method: Method, path: &str, req: RequestBuilder) -> Result<Response> {
    let method_name = method_name(&method);
    let resp = req.send().await.map_err(|source| Error::Transport {
      method: method_name,
      path: path.to_owned(),
      source,
    })?;
    let status = resp.status();
    debug!(method = method_name, path, status = status.as_u16(), "api response");
    if status.is_success() {
      return Ok(resp);
    }
    let message = resp.text().await.unwrap_or_default();
    Err(Error::Api { status: status.as_u16(), message })
  }

  async fn json<T: DeserializeOwned>(&self, path: &str, resp: Response) -> Result<T> {
    resp
      .json()
      .await
      .map_err(|source| Error::Decode { path: path.to_owned(), source })
  }

  async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
    let resp = self.send(Method::GET, path, self.request(Method::GET, path)).await?;
    self.json(path, resp).await
  }

  async fn get_text(&self, path: &str) -> Result<String> {
    let resp = self.send(Method::GET, path, self.request(Method::GET, path)).await?;
    resp.text().await.map_err(|source| Error::Decode { path: path.to_owned(), source })
  }

  async fn send_json<B: Serialize + ?Sized>(
    &self,
    method: Method,
    path: &str,
    body: &B,
  ) -> Result<Response> {
    let req = self.request(method.clone(), path).json(body);
    self.send(method, path, req).await
  }

  async fn create<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Created> {
    let resp = self.send_json(Method::POST, path, body).await?;
    self.json(path, resp).await
  }

  async fn empty(&self, method: Method, path: &str) -> Result<()> {
    let req = self.request(method.clone(), path);
    self.send(method, path, req).await.map(drop)
  }

  // ── Users & account ───────────────────────────────────────────────────────

  /// `POST /users/validate`: returns the id of the matching user.
  pub async fn validate(&self, credentials: &Credentials) -> Result<Uuid> {
    Ok(self.create(&Endpoints::validate(), credentials).await?.id)
  }

  /// `POST /users`
  pub async fn create_user(&self, user: &NewUser) -> Result<Created> {
    self.create(&Endpoints::users(), user).await
  }

  /// `POST /users/professors`
  pub async fn create_professor(&self, user: &NewUser) -> Result<Created> {
    self.create(&Endpoints::professors(), user).await
  }

  /// `GET /users/{id}`
  pub async fn get_user(&self, id: Uuid) -> Result<User> { self.get(&Endpoints::user(id)).await }

  /// `GET /users`
  pub async fn list_users(&self) -> Result<Vec<User>> { self.get(&Endpoints::users()).await }

  /// `PUT /users/update`
  pub async fn update_user(&self, update: &ProfileUpdate) -> Result<()> {
    self.send_json(Method::PUT, &Endpoints::update_user(), update).await.map(drop)
  }

  /// `DELETE /users/{id}`
  pub async fn delete_user(&self, id: Uuid) -> Result<()> {
    self.empty(Method::DELETE, &Endpoints::user(id)).await
  }

  /// `GET /verify-email/{token}`
  pub async fn verify_email(&self, token: &str) -> Result<()> {
    self.empty(Method::GET, &Endpoints::verify_email(token)).await
  }

  /// `POST /auth/forgot-password`
  pub async fn forgot_password(&self, mail: &str) -> Result<()> {
    let body = MailRequest { mail: mail.to_owned() };
    self.send_json(Method::POST, &Endpoints::forgot_password(), &body).await.map(drop)
  }

  /// `POST /auth/reset-password`
  pub async fn reset_password(&self, reset: &PasswordReset) -> Result<()> {
    self.send_json(Method::POST, &Endpoints::reset_password(), reset).await.map(drop)
  }

  /// `PUT /renew-session/{token}`: returns the id of the renewed user.
  pub async fn renew_session(&self, token: &str) -> Result<Uuid> {
    let path = Endpoints::renew_session(token);
    let resp = self.send(Method::PUT, &path, self.request(Method::PUT, &path)).await?;
    Ok(self.json::<Created>(&path, resp).await?.id)
  }

  // ── Subjects ──────────────────────────────────────────────────────────────

  /// `GET /users/{id}/subjects`
  pub async fn user_subjects(&self, user_id: Uuid) -> Result<Vec<Subject>> {
    self.get(&Endpoints::user_subjects(user_id)).await
  }

  /// `POST /subjects`
  pub async fn create_subject(&self, subject: &NewSubject) -> Result<Created> {
    self.create(&Endpoints::subjects(), subject).await
  }

  /// `DELETE /subjects/{id}`
  pub async fn delete_subject(&self, id: Uuid) -> Result<()> {
    self.empty(Method::DELETE, &Endpoints::subject(id)).await
  }

  /// `GET /subjects/{id}/users`
  pub async fn subject_users(&self, id: Uuid) -> Result<Vec<User>> {
    self.get(&Endpoints::subject_users(id)).await
  }

  /// `PUT /subjects/{id}/add/users/{mail}`
  pub async fn enroll(&self, subject_id: Uuid, mail: &str) -> Result<()> {
    self.empty(Method::PUT, &Endpoints::enroll(subject_id, mail)).await
  }

  /// `DELETE /subjects/{id}/remove/users/{mail}`
  pub async fn unenroll(&self, subject_id: Uuid, mail: &str) -> Result<()> {
    self.empty(Method::DELETE, &Endpoints::unenroll(subject_id, mail)).await
  }

  // ── Templates & bases ─────────────────────────────────────────────────────

  /// `GET /bases`
  pub async fn bases(&self) -> Result<Vec<Base>> { self.get(&Endpoints::bases()).await }

  /// `POST /templates/define`
  pub async fn define_template(&self, def: &TemplateDefinition) -> Result<Created> {
    self.create(&Endpoints::define_template(), def).await
  }

  /// `GET /templates/subjects/{subjectId}`
  pub async fn subject_templates(&self, subject_id: Uuid) -> Result<Vec<Template>> {
    self.get(&Endpoints::subject_templates(subject_id)).await
  }

  /// `DELETE /templates/delete/{templateId}/{subjectId}`
  pub async fn delete_template(&self, template_id: Uuid, subject_id: Uuid) -> Result<()> {
    self
      .empty(Method::DELETE, &Endpoints::delete_template(template_id, subject_id))
      .await
  }

  // ── Instances ─────────────────────────────────────────────────────────────

  /// `POST /instances/create`
  pub async fn create_instance(&self, instance: &NewInstance) -> Result<Created> {
    self.create(&Endpoints::create_instance(), instance).await
  }

  /// `GET /instances/status/{userId}`
  pub async fn user_instances(&self, user_id: Uuid) -> Result<Vec<Instance>> {
    self.get(&Endpoints::user_instances(user_id)).await
  }

  /// `POST /instances/start/{instanceId}`
  pub async fn start_instance(&self, id: Uuid) -> Result<()> {
    self.empty(Method::POST, &Endpoints::start_instance(id)).await
  }

  /// `POST /instances/stop/{instanceId}`
  pub async fn stop_instance(&self, id: Uuid) -> Result<()> {
    self.empty(Method::POST, &Endpoints::stop_instance(id)).await
  }

  /// `DELETE /instances/delete/{instanceId}`
  pub async fn delete_instance(&self, id: Uuid) -> Result<()> {
    self.empty(Method::DELETE, &Endpoints::delete_instance(id)).await
  }

  /// `GET /instances/wireguard/{instanceId}`: the client config as text.
  pub async fn wireguard_config(&self, id: Uuid) -> Result<String> {
    self.get_text(&Endpoints::wireguard(id)).await
  }

  // ── Fleet ─────────────────────────────────────────────────────────────────

  /// `GET /servers/status`
  pub async fn servers_status(&self) -> Result<Vec<ServerStatus>> {
    self.get(&Endpoints::servers_status()).await
  }

  /// Typed GET for list services that only know their path.
  pub(crate) async fn get_list<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
    self.get(path).await
  }
}

fn method_name(method: &Method) -> &'static str {
  match *method {
    Method::GET => "GET",
    Method::POST => "POST",
    Method::PUT => "PUT",
    Method::DELETE => "DELETE",
    Method::PATCH => "PATCH",
    _ => "OTHER",
  }
}
