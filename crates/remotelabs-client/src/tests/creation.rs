use std::sync::Arc;

use remotelabs_core::role::Role;
use reqwest::Method;

use super::Harness;
use crate::{
  Error, Precondition,
  creation::{CreationState, SubjectCreation, SubjectForm},
  notify::{Level, RecordingNotifier},
};

fn fundamentals(professors: &[&str]) -> SubjectForm {
  SubjectForm {
    name: "Programming Fundamentals".into(),
    code: "103111".into(),
    professor_emails: professors.iter().map(|m| (*m).to_owned()).collect(),
    base_id: "ubuntu-22.04".into(),
    vm_ram: "4".into(),
    vm_cpu: "4".into(),
    vm_storage: "20".into(),
    ..SubjectForm::default()
  }
}

fn workflow(h: &Harness) -> (SubjectCreation, RecordingNotifier) {
  let notifier = RecordingNotifier::new();
  (SubjectCreation::new(h.client.clone(), Arc::new(notifier.clone())), notifier)
}

// ─── Happy paths ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn creates_subject_and_template_from_base() {
  let h = Harness::start().await;
  let admin = h.admin("admin@tecnocampus.cat");
  h.professor("prof@tecnocampus.cat");
  h.backend.seed_base("ubuntu-22.04", "Ubuntu 22.04");
  let (mut creation, _) = workflow(&h);
  let mut form = fundamentals(&["prof@tecnocampus.cat"]);

  let created = creation.run(&admin, &mut form).await.unwrap();

  assert_eq!(h.backend.count(Method::POST, "/subjects"), 1);
  assert_eq!(h.backend.count(Method::POST, "/templates/define"), 1);
  assert_eq!(h.backend.count(Method::POST, "/instances/create"), 0);
  assert_eq!(h.backend.count(Method::PUT, &format!("/subjects/{}/add/users/", created.subject_id)), 1);
  assert_eq!(created.instance_id, None);
  assert!(created.enrollment_errors.is_empty());

  let templates = h.client.subject_templates(created.subject_id).await.unwrap();
  assert_eq!(templates.len(), 1);
  assert_eq!(templates[0].id, created.template_id);
  assert_eq!(templates[0].resources.vram_mb, 4096);
  assert_eq!(templates[0].resources.vcpu_count, 4);
  assert_eq!(templates[0].resources.size_mb, 20480);
  assert_eq!(templates[0].description, "Programming Fundamentals");

  assert_eq!(creation.state(), CreationState::Done);
  assert_eq!(form, SubjectForm::default());
}

#[tokio::test]
async fn customised_vm_becomes_the_template_source() {
  let h = Harness::start().await;
  let prof = h.professor("prof@tecnocampus.cat");
  h.backend.seed_base("ubuntu-22.04", "Ubuntu 22.04");
  let (mut creation, _) = workflow(&h);
  let mut form = fundamentals(&["prof@tecnocampus.cat"]);
  form.customize_vm = true;

  let created = creation.run(&prof, &mut form).await.unwrap();

  assert_eq!(h.backend.count(Method::POST, "/instances/create"), 1);
  let vm = created.instance_id.expect("customisation vm");
  let mine = h.client.user_instances(prof.id).await.unwrap();
  assert_eq!(mine.len(), 1);
  assert_eq!(mine[0].id, vm);
  assert_eq!(mine[0].subject_id, created.subject_id);
  assert_eq!(mine[0].resources.vram_mb, 4096);
}

#[tokio::test]
async fn admin_keeps_the_customisation_vm() {
  let h = Harness::start().await;
  let admin = h.admin("admin@tecnocampus.cat");
  let prof = h.professor("prof@tecnocampus.cat");
  h.backend.seed_base("ubuntu-22.04", "Ubuntu 22.04");
  let (mut creation, _) = workflow(&h);
  let mut form = fundamentals(&["prof@tecnocampus.cat"]);
  form.customize_vm = true;

  let created = creation.run(&admin, &mut form).await.unwrap();

  let vm = created.instance_id.expect("customisation vm");
  let admins = h.client.user_instances(admin.id).await.unwrap();
  assert_eq!(admins.iter().map(|i| i.id).collect::<Vec<_>>(), vec![vm]);
  assert!(h.client.user_instances(prof.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn customising_without_a_key_sends_nothing() {
  let h = Harness::start().await;
  let prof = h.backend.seed_user("Professor", "prof@tecnocampus.cat", "pw", Role::Professor, &[]);
  let (mut creation, _) = workflow(&h);
  let mut form = fundamentals(&["prof@tecnocampus.cat"]);
  form.customize_vm = true;

  let err = creation.run(&prof, &mut form).await.unwrap_err();

  assert!(matches!(err, Error::Precondition(Precondition::MissingSshKey)));
  assert!(h.backend.requests().is_empty());
}

#[tokio::test]
async fn unknown_enrollee_is_reported_but_not_fatal() {
  let h = Harness::start().await;
  let admin = h.admin("admin@tecnocampus.cat");
  h.professor("prof@tecnocampus.cat");
  h.backend.seed_base("ubuntu-22.04", "Ubuntu 22.04");
  let (mut creation, notifier) = workflow(&h);
  let mut form = fundamentals(&["prof@tecnocampus.cat", "ghost@tecnocampus.cat"]);

  let created = creation.run(&admin, &mut form).await.unwrap();

  assert_eq!(created.enrollment_errors.len(), 1);
  assert_eq!(created.enrollment_errors[0].mail, "ghost@tecnocampus.cat");
  assert_eq!(creation.state(), CreationState::Done);
  let members = h.client.subject_users(created.subject_id).await.unwrap();
  assert_eq!(members.len(), 1);
  assert_eq!(members[0].mail, "prof@tecnocampus.cat");

  let seen = notifier.snapshot();
  assert_eq!(seen.iter().filter(|n| n.level == Level::Warning).count(), 1);
  assert_eq!(seen.last().map(|n| n.level), Some(Level::Success));
}

#[tokio::test]
async fn history_walks_every_step() {
  let h = Harness::start().await;
  let admin = h.admin("admin@tecnocampus.cat");
  h.professor("prof@tecnocampus.cat");
  h.backend.seed_base("ubuntu-22.04", "Ubuntu 22.04");
  let (mut creation, _) = workflow(&h);

  creation.run(&admin, &mut fundamentals(&["prof@tecnocampus.cat"])).await.unwrap();

  assert_eq!(creation.history(), &[
    CreationState::Idle,
    CreationState::CreatingSubject,
    CreationState::EnrollingUsers,
    CreationState::CreatingTemplateOrVm,
    CreationState::Done,
  ]);
}

// ─── Rollback ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn template_failure_deletes_the_subject_once() {
  let h = Harness::start().await;
  let admin = h.admin("admin@tecnocampus.cat");
  let prof = h.professor("prof@tecnocampus.cat");
  h.backend.seed_base("ubuntu-22.04", "Ubuntu 22.04");
  h.backend.fail(Method::POST, "/templates/define");
  let (mut creation, _) = workflow(&h);
  let mut form = fundamentals(&["prof@tecnocampus.cat"]);

  let err = creation.run(&admin, &mut form).await.unwrap_err();

  assert_eq!(err.status(), Some(500));
  assert_eq!(h.backend.count(Method::DELETE, "/subjects/"), 1);
  assert!(h.client.user_subjects(prof.id).await.unwrap().is_empty());
  assert_eq!(creation.state(), CreationState::Failed);
  assert_eq!(creation.history()[4..], [CreationState::RollingBack, CreationState::Failed]);
  assert_eq!(form.code, "103111", "form kept for another attempt");
}

#[tokio::test]
async fn template_failure_is_notified_once() {
  let h = Harness::start().await;
  let admin = h.admin("admin@tecnocampus.cat");
  h.professor("prof@tecnocampus.cat");
  h.backend.seed_base("ubuntu-22.04", "Ubuntu 22.04");
  h.backend.fail(Method::POST, "/templates/define");
  let (mut creation, notifier) = workflow(&h);

  creation.run(&admin, &mut fundamentals(&["prof@tecnocampus.cat"])).await.unwrap_err();

  let seen = notifier.snapshot();
  assert_eq!(seen.iter().filter(|n| n.level == Level::Error).count(), 1);
  assert!(!seen.iter().any(|n| n.level == Level::Success));
}

#[tokio::test]
async fn vm_failure_deletes_the_subject() {
  let h = Harness::start().await;
  let prof = h.professor("prof@tecnocampus.cat");
  h.backend.seed_base("ubuntu-22.04", "Ubuntu 22.04");
  h.backend.fail(Method::POST, "/instances/create");
  let (mut creation, notifier) = workflow(&h);
  let mut form = fundamentals(&["prof@tecnocampus.cat"]);
  form.customize_vm = true;

  let err = creation.run(&prof, &mut form).await.unwrap_err();

  assert_eq!(err.status(), Some(500));
  assert_eq!(h.backend.count(Method::POST, "/templates/define"), 0);
  assert_eq!(h.backend.count(Method::DELETE, "/instances/delete/"), 0);
  assert_eq!(h.backend.count(Method::DELETE, "/subjects/"), 1);
  assert!(h.client.user_subjects(prof.id).await.unwrap().is_empty());
  assert_eq!(creation.state(), CreationState::Failed);
  assert_eq!(notifier.snapshot().iter().filter(|n| n.level == Level::Error).count(), 1);
}

#[tokio::test]
async fn template_failure_deletes_the_customisation_vm() {
  let h = Harness::start().await;
  let prof = h.professor("prof@tecnocampus.cat");
  h.backend.seed_base("ubuntu-22.04", "Ubuntu 22.04");
  h.backend.fail(Method::POST, "/templates/define");
  let (mut creation, _) = workflow(&h);
  let mut form = fundamentals(&["prof@tecnocampus.cat"]);
  form.customize_vm = true;

  let err = creation.run(&prof, &mut form).await.unwrap_err();

  assert_eq!(err.status(), Some(500));
  assert_eq!(h.backend.count(Method::POST, "/instances/create"), 1);
  assert_eq!(h.backend.count(Method::DELETE, "/instances/delete/"), 1);
  assert_eq!(h.backend.count(Method::DELETE, "/subjects/"), 1);
  assert!(h.client.user_instances(prof.id).await.unwrap().is_empty());
  assert!(h.client.user_subjects(prof.id).await.unwrap().is_empty());
  assert_eq!(creation.history()[4..], [CreationState::RollingBack, CreationState::Failed]);
}

#[tokio::test]
async fn subject_is_deleted_even_when_the_vm_cannot_be() {
  let h = Harness::start().await;
  let prof = h.professor("prof@tecnocampus.cat");
  h.backend.seed_base("ubuntu-22.04", "Ubuntu 22.04");
  h.backend.fail(Method::POST, "/templates/define");
  h.backend.fail(Method::DELETE, "/instances/delete/");
  let (mut creation, _) = workflow(&h);
  let mut form = fundamentals(&["prof@tecnocampus.cat"]);
  form.customize_vm = true;

  let err = creation.run(&prof, &mut form).await.unwrap_err();

  assert!(matches!(err, Error::RollbackFailed { .. }), "got {err:?}");
  assert_eq!(h.backend.count(Method::DELETE, "/subjects/"), 1);
  assert!(h.client.user_subjects(prof.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_rollback_carries_both_errors() {
  let h = Harness::start().await;
  let admin = h.admin("admin@tecnocampus.cat");
  h.professor("prof@tecnocampus.cat");
  h.backend.seed_base("ubuntu-22.04", "Ubuntu 22.04");
  h.backend.fail(Method::POST, "/templates/define");
  h.backend.fail(Method::DELETE, "/subjects/");
  let (mut creation, _) = workflow(&h);

  let err = creation
    .run(&admin, &mut fundamentals(&["prof@tecnocampus.cat"]))
    .await
    .unwrap_err();

  let Error::RollbackFailed { cause, rollback, .. } = err else {
    panic!("expected RollbackFailed, got {err:?}");
  };
  assert_eq!(cause.status(), Some(500));
  assert_eq!(rollback.status(), Some(500));
  assert_eq!(h.backend.count(Method::DELETE, "/subjects/"), 1);
  assert_eq!(creation.state(), CreationState::Failed);
}

#[tokio::test]
async fn subject_failure_needs_no_rollback() {
  let h = Harness::start().await;
  let admin = h.admin("admin@tecnocampus.cat");
  h.backend.seed_subject("Existing", "103111", "prof@tecnocampus.cat");
  let (mut creation, _) = workflow(&h);

  let err = creation
    .run(&admin, &mut fundamentals(&["prof@tecnocampus.cat"]))
    .await
    .unwrap_err();

  assert_eq!(err.status(), Some(409));
  assert_eq!(h.backend.count(Method::PUT, "/subjects/"), 0);
  assert_eq!(h.backend.count(Method::DELETE, "/subjects/"), 0);
  assert!(!creation.history().contains(&CreationState::RollingBack));
}

// ─── Preconditions ────────────────────────────────────────────────────────────

#[tokio::test]
async fn invalid_form_sends_nothing() {
  let h = Harness::start().await;
  let admin = h.admin("admin@tecnocampus.cat");
  let (mut creation, _) = workflow(&h);
  let mut form = fundamentals(&["prof@tecnocampus.cat"]);
  form.vm_ram = "lots".into();

  let err = creation.run(&admin, &mut form).await.unwrap_err();
  assert!(matches!(err, Error::Precondition(Precondition::InvalidInput(_))));

  form.vm_ram = "4".into();
  form.professor_emails.clear();
  assert!(creation.run(&admin, &mut form).await.is_err());

  assert!(h.backend.requests().is_empty());
  assert_eq!(creation.state(), CreationState::Failed);
}

#[tokio::test]
async fn students_cannot_create_subjects() {
  let h = Harness::start().await;
  let alice = h.student("alice@tecnocampus.cat");
  let (mut creation, _) = workflow(&h);

  let err = creation
    .run(&alice, &mut fundamentals(&["prof@tecnocampus.cat"]))
    .await
    .unwrap_err();

  assert!(matches!(err, Error::Precondition(Precondition::Forbidden(_))));
  assert_eq!(h.backend.count(Method::POST, "/subjects"), 0);
}
