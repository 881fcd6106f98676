//! Subject creation: the one multi-step workflow with a compensating action.
//!
//! ```text
//! Idle → CreatingSubject → EnrollingUsers → CreatingTemplateOrVm → Done
//!                                                  │
//!                                                  └→ RollingBack → Failed
//! ```
//!
//! A failure while creating the subject aborts with nothing to undo.
//! Enrollment failures are collected and never abort. A failure while
//! creating the VM or template deletes the customisation VM (if one was
//! created) and the subject again; enrollments are not undone, they
//! disappear with the subject on the backend.
//!
//! The customisation VM is owned by the user running the workflow, which is
//! the owning professor unless an admin creates the subject on their behalf.
//!
//! Every failure is notified exactly once, by the workflow itself.

use std::{collections::HashSet, sync::Arc};

use remotelabs_core::{
  role::Capability,
  template::Resources,
  user::User,
  wire::{InstanceSource, NewInstance, NewSubject, TemplateDefinition, TemplateSource},
};
use tokio::task::JoinSet;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{ApiClient, Error, Precondition, Result, notify::Notifier};

// ─── Form ─────────────────────────────────────────────────────────────────────

/// Input of the subject creation panel. Resource fields are kept as typed
/// text and validated by [`SubjectForm::validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectForm {
  pub name:             String,
  pub code:             String,
  /// The first address owns the subject; all of them are enrolled.
  pub professor_emails: Vec<String>,
  pub student_emails:   Vec<String>,
  pub base_id:          String,
  /// GiB.
  pub vm_ram:           String,
  pub vm_cpu:           String,
  /// GiB.
  pub vm_storage:       String,
  /// Boot a VM from the base for the professor to customise, and snapshot
  /// the template from it, instead of using the base directly.
  pub customize_vm:     bool,
  /// Template description; the subject name is used when empty.
  pub description:      String,
}

impl SubjectForm {
  /// Check required fields and parse the resource numbers.
  pub fn validate(&self) -> Result<Resources> {
    for (field, value) in [("name", &self.name), ("code", &self.code), ("base", &self.base_id)] {
      if value.trim().is_empty() {
        return Err(remotelabs_core::Error::MissingField(field).into());
      }
    }
    if self.owner_mail().is_none() {
      return Err(remotelabs_core::Error::MissingField("professor email").into());
    }
    Ok(Resources::from_form(&self.vm_ram, &self.vm_cpu, &self.vm_storage)?)
  }

  pub fn owner_mail(&self) -> Option<&str> {
    self.professor_emails.iter().map(|m| m.trim()).find(|m| !m.is_empty())
  }

  /// Every address to enroll, trimmed, without blanks or duplicates.
  pub fn enrollees(&self) -> Vec<String> {
    let mut seen = HashSet::new();
    self
      .professor_emails
      .iter()
      .chain(&self.student_emails)
      .map(|m| m.trim())
      .filter(|m| !m.is_empty() && seen.insert(m.to_ascii_lowercase()))
      .map(str::to_owned)
      .collect()
  }

  pub fn reset(&mut self) { *self = Self::default(); }
}

// ─── Outcome ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreationState {
  Idle,
  CreatingSubject,
  EnrollingUsers,
  CreatingTemplateOrVm,
  Done,
  RollingBack,
  Failed,
}

/// An address that could not be enrolled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentError {
  pub mail:    String,
  pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectCreated {
  pub subject_id:        Uuid,
  pub template_id:       Uuid,
  /// The professor's customisation VM, when one was created.
  pub instance_id:       Option<Uuid>,
  pub enrollment_errors: Vec<EnrollmentError>,
}

// ─── Workflow ─────────────────────────────────────────────────────────────────

pub struct SubjectCreation {
  client:   ApiClient,
  notifier: Arc<dyn Notifier>,
  state:    CreationState,
  history:  Vec<CreationState>,
}

impl SubjectCreation {
  pub fn new(client: ApiClient, notifier: Arc<dyn Notifier>) -> Self {
    Self { client, notifier, state: CreationState::Idle, history: vec![CreationState::Idle] }
  }

  pub fn state(&self) -> CreationState { self.state }

  /// Every state entered during the last run, starting with `Idle`.
  pub fn history(&self) -> &[CreationState] { &self.history }

  fn enter(&mut self, state: CreationState) {
    info!(from = ?self.state, to = ?state, "subject creation");
    self.state = state;
    self.history.push(state);
  }

  fn fail(&mut self, e: Error) -> Error {
    self.enter(CreationState::Failed);
    self.notifier.error(e.to_string());
    e
  }

  /// Run the whole workflow as `actor`. On success `form` is reset.
  pub async fn run(&mut self, actor: &User, form: &mut SubjectForm) -> Result<SubjectCreated> {
    self.state = CreationState::Idle;
    self.history = vec![CreationState::Idle];

    for capability in [Capability::ManageSubjects, Capability::DefineTemplates] {
      if !actor.can(capability) {
        return Err(self.fail(Precondition::Forbidden(capability).into()));
      }
    }
    let resources = match form.validate() {
      Ok(r) => r,
      Err(e) => return Err(self.fail(e)),
    };
    if form.customize_vm && !actor.has_ssh_key() {
      return Err(self.fail(Precondition::MissingSshKey.into()));
    }

    // 1. Subject. Nothing to undo if this fails.
    self.enter(CreationState::CreatingSubject);
    let new_subject = NewSubject {
      name:           form.name.trim().to_owned(),
      code:           form.code.trim().to_owned(),
      professor_mail: form.owner_mail().unwrap_or_default().to_owned(),
    };
    let subject_id = match self.client.create_subject(&new_subject).await {
      Ok(created) => created.id,
      Err(e) => return Err(self.fail(e)),
    };

    // 2. Enrollment. Partial success is accepted.
    self.enter(CreationState::EnrollingUsers);
    let enrollment_errors = self.enroll_all(subject_id, form.enrollees()).await;
    for err in &enrollment_errors {
      self.notifier.warning(format!("Could not enroll {}: {}", err.mail, err.message));
    }

    // 3. VM and/or template; compensate on failure.
    self.enter(CreationState::CreatingTemplateOrVm);
    let mut vm = None;
    match self.provision(actor, subject_id, form, resources, &mut vm).await {
      Ok(template_id) => {
        self.enter(CreationState::Done);
        self.notifier.success(format!("Subject {} created", new_subject.name));
        form.reset();
        Ok(SubjectCreated { subject_id, template_id, instance_id: vm, enrollment_errors })
      }
      Err(cause) => {
        self.enter(CreationState::RollingBack);
        warn!(%subject_id, vm = ?vm, error = %cause, "rolling back subject");
        let err = match self.compensate(subject_id, vm).await {
          Ok(()) => cause,
          Err(rollback) => Error::RollbackFailed {
            subject_id,
            cause: Box::new(cause),
            rollback: Box::new(rollback),
          },
        };
        Err(self.fail(err))
      }
    }
  }

  async fn enroll_all(&self, subject_id: Uuid, mails: Vec<String>) -> Vec<EnrollmentError> {
    let mut set = JoinSet::new();
    for mail in mails {
      let client = self.client.clone();
      set.spawn(async move {
        let result = client.enroll(subject_id, &mail).await;
        (mail, result)
      });
    }

    let mut errors = Vec::new();
    while let Some(joined) = set.join_next().await {
      match joined {
        Ok((_, Ok(()))) => {}
        Ok((mail, Err(e))) => errors.push(EnrollmentError { mail, message: e.to_string() }),
        Err(join) => warn!(error = %join, "enrollment task failed"),
      }
    }
    errors.sort_by(|a, b| a.mail.cmp(&b.mail));
    errors
  }

  /// Create the customisation VM if asked for, then the template. `vm` is
  /// set as soon as the VM exists so a failed template can be compensated.
  async fn provision(
    &self,
    actor: &User,
    subject_id: Uuid,
    form: &SubjectForm,
    resources: Resources,
    vm: &mut Option<Uuid>,
  ) -> Result<Uuid> {
    let base_id = form.base_id.trim().to_owned();
    let description = match form.description.trim() {
      "" => form.name.trim().to_owned(),
      d => d.to_owned(),
    };

    let source = if form.customize_vm {
      let instance = NewInstance {
        user_id:   actor.id,
        subject_id,
        source:    InstanceSource::Base(base_id),
        ssh_keys:  actor.ssh_keys.clone(),
        resources: Some(resources),
      };
      let id = self.client.create_instance(&instance).await?.id;
      *vm = Some(id);
      TemplateSource::Instance(id)
    } else {
      TemplateSource::Base(base_id)
    };

    let def = TemplateDefinition {
      source,
      subject_id,
      description,
      is_validated: !form.customize_vm,
      resources,
    };
    Ok(self.client.define_template(&def).await?.id)
  }

  /// Delete what step 3 left behind, then the subject. Both deletes are
  /// attempted; the first failure is returned.
  async fn compensate(&self, subject_id: Uuid, vm: Option<Uuid>) -> Result<()> {
    let vm_deleted = match vm {
      Some(id) => self.client.delete_instance(id).await,
      None => Ok(()),
    };
    let subject_deleted = self.client.delete_subject(subject_id).await;
    vm_deleted.and(subject_deleted)
  }
}
