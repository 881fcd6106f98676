//! Single-purpose mutating operations.
//!
//! Action services own no list state. Each tracks how many of its requests
//! are in flight and reports every outcome, success or failure, through a
//! [`Notifier`]. Callers refresh whichever resource displayed the entity.

use std::{
  future::Future,
  sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
  },
};

use remotelabs_core::{
  instance::Instance,
  role::Capability,
  template::Resources,
  user::User,
  wire::{Created, InstanceSource, NewInstance, TemplateDefinition},
};
use uuid::Uuid;

use crate::{ApiClient, Error, Precondition, Result, notify::Notifier};

// ─── In-flight tracking ───────────────────────────────────────────────────────

#[derive(Debug, Default, Clone)]
struct InFlight(Arc<AtomicUsize>);

struct InFlightGuard(Arc<AtomicUsize>);

impl InFlight {
  fn enter(&self) -> InFlightGuard {
    self.0.fetch_add(1, Ordering::SeqCst);
    InFlightGuard(Arc::clone(&self.0))
  }

  fn any(&self) -> bool { self.0.load(Ordering::SeqCst) > 0 }
}

impl Drop for InFlightGuard {
  fn drop(&mut self) { self.0.fetch_sub(1, Ordering::SeqCst); }
}

/// Await `op`, then notify `success` or the failure prefixed by `failure`.
async fn report<T>(
  notifier: &dyn Notifier,
  in_flight: &InFlight,
  op: impl Future<Output = Result<T>>,
  success: impl FnOnce(&T) -> String,
  failure: &str,
) -> Result<T> {
  let _guard = in_flight.enter();
  match op.await {
    Ok(value) => {
      notifier.success(success(&value));
      Ok(value)
    }
    Err(e) => {
      notifier.error(format!("{failure}: {e}"));
      Err(e)
    }
  }
}

fn refuse<T>(notifier: &dyn Notifier, precondition: Precondition) -> Result<T> {
  notifier.error(precondition.to_string());
  Err(Error::Precondition(precondition))
}

// ─── Instances ────────────────────────────────────────────────────────────────

/// Power control, creation and deletion of VMs.
#[derive(Clone)]
pub struct InstanceActions {
  client:    ApiClient,
  notifier:  Arc<dyn Notifier>,
  in_flight: InFlight,
}

impl InstanceActions {
  pub fn new(client: ApiClient, notifier: Arc<dyn Notifier>) -> Self {
    Self { client, notifier, in_flight: InFlight::default() }
  }

  pub fn is_loading(&self) -> bool { self.in_flight.any() }

  /// Start instance `target`.
  ///
  /// `owned` is the actor's current instance list. A role without
  /// [`Capability::RunConcurrentInstances`] may not start a VM while another
  /// of its own is running; in that case no request is sent.
  pub async fn start_vm(&self, actor: &User, target: Uuid, owned: &[Instance]) -> Result<()> {
    if !actor.can(Capability::RunConcurrentInstances)
      && let Some(running) = owned.iter().find(|i| i.status.is_running() && i.id != target)
    {
      return refuse(&*self.notifier, Precondition::InstanceAlreadyRunning(running.id));
    }
    report(
      &*self.notifier,
      &self.in_flight,
      self.client.start_instance(target),
      |_| format!("Instance {target} starting"),
      "Could not start instance",
    )
    .await
  }

  pub async fn stop_vm(&self, target: Uuid) -> Result<()> {
    report(
      &*self.notifier,
      &self.in_flight,
      self.client.stop_instance(target),
      |_| format!("Instance {target} stopping"),
      "Could not stop instance",
    )
    .await
  }

  pub async fn delete_vm(&self, target: Uuid) -> Result<()> {
    report(
      &*self.notifier,
      &self.in_flight,
      self.client.delete_instance(target),
      |_| format!("Instance {target} deleted"),
      "Could not delete instance",
    )
    .await
  }

  /// Create a VM owned by `user` in `subject_id`.
  ///
  /// Requires a logged-in user with at least one SSH public key; otherwise the
  /// failure is notified and no request is sent.
  pub async fn create_instance(
    &self,
    user: Option<&User>,
    subject_id: Uuid,
    source: InstanceSource,
    resources: Option<Resources>,
  ) -> Result<Created> {
    let Some(user) = user else {
      return refuse(&*self.notifier, Precondition::NotLoggedIn);
    };
    if !user.has_ssh_key() {
      return refuse(&*self.notifier, Precondition::MissingSshKey);
    }
    let body = NewInstance {
      user_id: user.id,
      subject_id,
      source,
      ssh_keys: user.ssh_keys.clone(),
      resources,
    };
    report(
      &*self.notifier,
      &self.in_flight,
      self.client.create_instance(&body),
      |c| format!("Instance {} created", c.id),
      "Could not create instance",
    )
    .await
  }

  /// A student's request for a VM from one of the subject's templates.
  pub async fn request_lab(
    &self,
    user: Option<&User>,
    subject_id: Uuid,
    template_id: Uuid,
  ) -> Result<Created> {
    self
      .create_instance(user, subject_id, InstanceSource::Template(template_id), None)
      .await
  }

  /// The instance's WireGuard client configuration.
  pub async fn wireguard_config(&self, target: Uuid) -> Result<String> {
    let _guard = self.in_flight.enter();
    self.client.wireguard_config(target).await.inspect_err(|e| {
      self.notifier.error(format!("Could not fetch VPN configuration: {e}"));
    })
  }
}

// ─── Templates ────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct TemplateActions {
  client:    ApiClient,
  notifier:  Arc<dyn Notifier>,
  in_flight: InFlight,
}

impl TemplateActions {
  pub fn new(client: ApiClient, notifier: Arc<dyn Notifier>) -> Self {
    Self { client, notifier, in_flight: InFlight::default() }
  }

  pub fn is_loading(&self) -> bool { self.in_flight.any() }

  pub async fn define_template(&self, actor: &User, def: &TemplateDefinition) -> Result<Created> {
    if !actor.can(Capability::DefineTemplates) {
      return refuse(&*self.notifier, Precondition::Forbidden(Capability::DefineTemplates));
    }
    report(
      &*self.notifier,
      &self.in_flight,
      self.client.define_template(def),
      |c| format!("Template {} defined", c.id),
      "Could not define template",
    )
    .await
  }
}
