use std::time::Duration;

use remotelabs_core::{instance::InstanceStatus, wire::NewUser};
use reqwest::Method;

use super::Harness;
use crate::{
  Error, Precondition,
  resources::{
    BasesResource, InstancesResource, SubjectMembers, SubjectsResource, TemplatesResource,
    UsersResource,
  },
};

// ─── Fetch semantics ──────────────────────────────────────────────────────────

#[tokio::test]
async fn repeated_fetch_without_changes_is_idempotent() {
  let h = Harness::start().await;
  h.backend.seed_base("ubuntu-22.04", "Ubuntu 22.04");
  h.backend.seed_base("debian-12", "Debian 12");
  let bases = BasesResource::new(h.client.clone());

  bases.fetch().await.unwrap();
  let first = bases.items();
  bases.fetch().await.unwrap();

  assert_eq!(first.len(), 2);
  assert_eq!(bases.items(), first);
  assert!(!bases.is_loading());
  assert!(bases.error().is_none());
}

#[tokio::test]
async fn failed_fetch_keeps_previous_list_and_sets_error() {
  let h = Harness::start().await;
  h.backend.seed_base("ubuntu-22.04", "Ubuntu 22.04");
  let bases = BasesResource::new(h.client.clone());
  bases.fetch().await.unwrap();

  h.backend.fail(Method::GET, "/bases");
  let err = bases.fetch().await.unwrap_err();

  assert_eq!(err.status(), Some(500));
  assert_eq!(bases.len(), 1);
  assert!(bases.error().unwrap().contains("injected failure"));
  assert!(!bases.is_loading());

  h.backend.clear_faults();
  bases.fetch().await.unwrap();
  assert!(bases.error().is_none());
}

#[tokio::test]
async fn slow_response_for_an_old_scope_is_discarded() {
  let h = Harness::start().await;
  let alice = h.student("alice@uni.cat");
  let bob = h.student("bob@uni.cat");
  let networks = h.backend.seed_subject("Networks", "1", "prof@uni.cat");
  let databases = h.backend.seed_subject("Databases", "2", "prof@uni.cat");
  let members_a = SubjectMembers::new(h.client.clone(), networks.id);
  members_a.add_user(&alice.mail).await.unwrap();
  let members_b = SubjectMembers::new(h.client.clone(), databases.id);
  members_b.add_user(&bob.mail).await.unwrap();

  h.backend.delay(Method::GET, &format!("/users/{}/subjects", alice.id), Duration::from_millis(400));
  let subjects = SubjectsResource::new(h.client.clone(), alice.id);

  let (slow, fast) = tokio::join!(subjects.fetch(), async {
    tokio::time::sleep(Duration::from_millis(50)).await;
    subjects.set_user(bob.id).await
  });

  assert!(slow.is_ok());
  assert!(fast.is_ok());
  let names: Vec<_> = subjects.items().into_iter().map(|s| s.name).collect();
  assert_eq!(names, vec!["Databases".to_string()]);
  assert!(!subjects.is_loading());
}

// ─── Mutating helpers ─────────────────────────────────────────────────────────

#[tokio::test]
async fn add_user_refreshes_members() {
  let h = Harness::start().await;
  let alice = h.student("alice@uni.cat");
  let subject = h.backend.seed_subject("Networks", "1", "prof@uni.cat");
  let members = SubjectMembers::new(h.client.clone(), subject.id);
  members.fetch().await.unwrap();
  assert!(members.is_empty());

  members.add_user("alice@uni.cat").await.unwrap();

  assert_eq!(members.items(), vec![alice]);
}

#[tokio::test]
async fn enrolling_an_unknown_address_returns_error() {
  let h = Harness::start().await;
  let subject = h.backend.seed_subject("Networks", "1", "prof@uni.cat");
  let members = SubjectMembers::new(h.client.clone(), subject.id);

  let err = members.add_user("ghost@uni.cat").await.unwrap_err();
  assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn removing_yourself_issues_no_request() {
  let h = Harness::start().await;
  let prof = h.professor("prof@uni.cat");
  let subject = h.backend.seed_subject("Networks", "1", "prof@uni.cat");
  let members = SubjectMembers::new(h.client.clone(), subject.id);
  members.add_user(&prof.mail).await.unwrap();

  let err = members.remove_user(&prof, "PROF@uni.cat").await.unwrap_err();

  assert!(matches!(err, Error::Precondition(Precondition::SelfRemoval)));
  assert_eq!(h.backend.count(Method::DELETE, "/subjects/"), 0);
  assert_eq!(members.len(), 1);
}

#[tokio::test]
async fn remove_user_unenrolls_and_refreshes() {
  let h = Harness::start().await;
  let prof = h.professor("prof@uni.cat");
  let alice = h.student("alice@uni.cat");
  let subject = h.backend.seed_subject("Networks", "1", "prof@uni.cat");
  let members = SubjectMembers::new(h.client.clone(), subject.id);
  members.add_user(&alice.mail).await.unwrap();

  members.remove_user(&prof, &alice.mail).await.unwrap();

  assert!(members.is_empty());
}

#[tokio::test]
async fn user_with_running_instance_is_not_deleted() {
  let h = Harness::start().await;
  let alice = h.student("alice@uni.cat");
  let subject = h.backend.seed_subject("Networks", "1", "prof@uni.cat");
  h.backend.seed_instance(&alice, subject.id, InstanceStatus::Running);
  let users = UsersResource::new(h.client.clone());

  let err = users.delete_user(alice.id).await.unwrap_err();

  assert!(matches!(err, Error::Precondition(Precondition::UserHasRunningInstance(id)) if id == alice.id));
  assert_eq!(h.backend.count(Method::DELETE, "/users/"), 0);
}

#[tokio::test]
async fn delete_user_refreshes_list() {
  let h = Harness::start().await;
  h.admin("admin@uni.cat");
  let alice = h.student("alice@uni.cat");
  let subject = h.backend.seed_subject("Networks", "1", "prof@uni.cat");
  h.backend.seed_instance(&alice, subject.id, InstanceStatus::ShutOff);
  let users = UsersResource::new(h.client.clone());
  users.fetch().await.unwrap();
  assert_eq!(users.len(), 2);

  users.delete_user(alice.id).await.unwrap();

  assert_eq!(users.len(), 1);
  assert_eq!(h.backend.count(Method::DELETE, &format!("/users/{}", alice.id)), 1);
}

#[tokio::test]
async fn create_professor_appears_in_users() {
  let h = Harness::start().await;
  let users = UsersResource::new(h.client.clone());
  let body = NewUser { name: "Grace".into(), mail: "grace@uni.cat".into(), password: "pw".into() };

  let created = users.create_professor(&body).await.unwrap();

  let listed = users.items();
  assert_eq!(listed.len(), 1);
  assert_eq!(listed[0].id, created.id);
  assert_eq!(listed[0].role, remotelabs_core::role::Role::Professor);
}

#[tokio::test]
async fn delete_subject_refreshes_subjects() {
  let h = Harness::start().await;
  let prof = h.professor("prof@uni.cat");
  let subject = h.backend.seed_subject("Networks", "1", "prof@uni.cat");
  let subjects = SubjectsResource::new(h.client.clone(), prof.id);
  subjects.fetch().await.unwrap();
  assert_eq!(subjects.len(), 1);

  subjects.delete_subject(subject.id).await.unwrap();

  assert!(subjects.is_empty());
}

#[tokio::test]
async fn instances_running_filters_by_status() {
  let h = Harness::start().await;
  let alice = h.student("alice@uni.cat");
  let subject = h.backend.seed_subject("Networks", "1", "prof@uni.cat");
  let running = h.backend.seed_instance(&alice, subject.id, InstanceStatus::Running);
  h.backend.seed_instance(&alice, subject.id, InstanceStatus::ShutOff);
  let instances = InstancesResource::new(h.client.clone(), alice.id);
  instances.fetch().await.unwrap();

  assert_eq!(instances.len(), 2);
  assert_eq!(instances.running().into_iter().map(|i| i.id).collect::<Vec<_>>(), vec![running.id]);
}

#[tokio::test]
async fn templates_for_missing_subject_is_empty_list() {
  let h = Harness::start().await;
  let templates = TemplatesResource::new(h.client.clone(), uuid::Uuid::new_v4());
  templates.fetch().await.unwrap();
  assert!(templates.is_empty());
  let err = templates.delete_template(uuid::Uuid::new_v4()).await.unwrap_err();
  assert_eq!(err.status(), Some(404));
}
