//! Typed list services, one per backend collection.
//!
//! Each wraps a [`Resource`] scoped by its key and adds the mutating helpers
//! that belong to that collection. Helpers issue exactly one mutating request
//! and re-fetch the list on success before returning.

use std::ops::Deref;

use remotelabs_core::{
  instance::Instance,
  subject::Subject,
  template::{Base, Template},
  user::User,
  wire::{Created, NewUser},
};
use tracing::info;
use uuid::Uuid;

use crate::{ApiClient, Precondition, Result, endpoints::Endpoints, resource::Resource};

macro_rules! deref_resource {
  ($ty:ty, $item:ty) => {
    impl Deref for $ty {
      type Target = Resource<$item>;

      fn deref(&self) -> &Self::Target { &self.list }
    }
  };
}

// ─── Subjects ─────────────────────────────────────────────────────────────────

/// Subjects a user is enrolled in (or teaches).
#[derive(Debug, Clone)]
pub struct SubjectsResource {
  list: Resource<Subject>,
}

deref_resource!(SubjectsResource, Subject);

impl SubjectsResource {
  pub fn new(client: ApiClient, user_id: Uuid) -> Self {
    Self { list: Resource::new(client, Endpoints::user_subjects(user_id)) }
  }

  pub async fn set_user(&self, user_id: Uuid) -> Result<()> {
    self.list.rescope(Endpoints::user_subjects(user_id)).await
  }

  pub async fn delete_subject(&self, subject_id: Uuid) -> Result<()> {
    self.list.client().delete_subject(subject_id).await?;
    info!(%subject_id, "subject deleted");
    self.list.refresh_after_mutation().await;
    Ok(())
  }
}

// ─── Subject members ──────────────────────────────────────────────────────────

/// Users enrolled in one subject.
#[derive(Debug, Clone)]
pub struct SubjectMembers {
  list:       Resource<User>,
  subject_id: Uuid,
}

deref_resource!(SubjectMembers, User);

impl SubjectMembers {
  pub fn new(client: ApiClient, subject_id: Uuid) -> Self {
    Self { list: Resource::new(client, Endpoints::subject_users(subject_id)), subject_id }
  }

  pub fn subject_id(&self) -> Uuid { self.subject_id }

  pub async fn add_user(&self, mail: &str) -> Result<()> {
    self.list.client().enroll(self.subject_id, mail).await?;
    self.list.refresh_after_mutation().await;
    Ok(())
  }

  /// Unenroll `mail`. `actor` may not remove themself.
  pub async fn remove_user(&self, actor: &User, mail: &str) -> Result<()> {
    if actor.mail.eq_ignore_ascii_case(mail.trim()) {
      return Err(Precondition::SelfRemoval.into());
    }
    self.list.client().unenroll(self.subject_id, mail).await?;
    self.list.refresh_after_mutation().await;
    Ok(())
  }
}

// ─── Users ────────────────────────────────────────────────────────────────────

/// Every account on the platform (admin view).
#[derive(Debug, Clone)]
pub struct UsersResource {
  list: Resource<User>,
}

deref_resource!(UsersResource, User);

impl UsersResource {
  pub fn new(client: ApiClient) -> Self {
    Self { list: Resource::new(client, Endpoints::users()) }
  }

  /// Delete a user that has no running instance.
  ///
  /// The user's instances are read first; a running one blocks the delete
  /// without issuing it.
  pub async fn delete_user(&self, user_id: Uuid) -> Result<()> {
    let client = self.list.client();
    let instances = client.user_instances(user_id).await?;
    if instances.iter().any(|i| i.status.is_running()) {
      return Err(Precondition::UserHasRunningInstance(user_id).into());
    }
    client.delete_user(user_id).await?;
    info!(%user_id, "user deleted");
    self.list.refresh_after_mutation().await;
    Ok(())
  }

  pub async fn create_professor(&self, user: &NewUser) -> Result<Created> {
    let created = self.list.client().create_professor(user).await?;
    self.list.refresh_after_mutation().await;
    Ok(created)
  }
}

// ─── Templates ────────────────────────────────────────────────────────────────

/// Templates defined for one subject.
#[derive(Debug, Clone)]
pub struct TemplatesResource {
  list:       Resource<Template>,
  subject_id: Uuid,
}

deref_resource!(TemplatesResource, Template);

impl TemplatesResource {
  pub fn new(client: ApiClient, subject_id: Uuid) -> Self {
    Self { list: Resource::new(client, Endpoints::subject_templates(subject_id)), subject_id }
  }

  pub fn subject_id(&self) -> Uuid { self.subject_id }

  pub async fn delete_template(&self, template_id: Uuid) -> Result<()> {
    self.list.client().delete_template(template_id, self.subject_id).await?;
    self.list.refresh_after_mutation().await;
    Ok(())
  }
}

// ─── Instances ────────────────────────────────────────────────────────────────

/// A user's VMs.
#[derive(Debug, Clone)]
pub struct InstancesResource {
  list: Resource<Instance>,
}

deref_resource!(InstancesResource, Instance);

impl InstancesResource {
  pub fn new(client: ApiClient, user_id: Uuid) -> Self {
    Self { list: Resource::new(client, Endpoints::user_instances(user_id)) }
  }

  pub async fn set_user(&self, user_id: Uuid) -> Result<()> {
    self.list.rescope(Endpoints::user_instances(user_id)).await
  }

  /// Instances currently reported as running.
  pub fn running(&self) -> Vec<Instance> {
    self.list.items().into_iter().filter(|i| i.status.is_running()).collect()
  }
}

// ─── Bases ────────────────────────────────────────────────────────────────────

/// Source images available for template creation.
#[derive(Debug, Clone)]
pub struct BasesResource {
  list: Resource<Base>,
}

deref_resource!(BasesResource, Base);

impl BasesResource {
  pub fn new(client: ApiClient) -> Self { Self { list: Resource::new(client, Endpoints::bases()) } }
}
