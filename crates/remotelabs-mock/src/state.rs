//! In-memory backend state, request log and fault injection.

use std::{
  collections::{BTreeMap, BTreeSet, VecDeque},
  time::Duration,
};

use axum::http::Method;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use remotelabs_core::{
  instance::{Instance, InstanceStatus},
  role::Role,
  server::ServerStatus,
  subject::Subject,
  template::{Base, Resources, Template},
  user::User,
};
use sha2::{Digest, Sha256};
use uuid::Uuid;

// ─── Records ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub(crate) struct Account {
  pub user:            User,
  pub password_digest: String,
  pub verified:        bool,
}

impl Account {
  pub fn new(user: User, password: &str, verified: bool) -> Self {
    let password_digest = digest(user.id, password);
    Self { user, password_digest, verified }
  }

  pub fn set_password(&mut self, password: &str) {
    self.password_digest = digest(self.user.id, password);
  }

  pub fn password_matches(&self, password: &str) -> bool {
    self.password_digest == digest(self.user.id, password)
  }
}

/// Salted SHA-256 of a password, hex encoded. The user id is the salt.
fn digest(salt: Uuid, password: &str) -> String {
  let mut hasher = Sha256::new();
  hasher.update(salt.as_bytes());
  hasher.update(password.as_bytes());
  hex::encode(hasher.finalize())
}

#[derive(Debug, Default)]
pub(crate) struct Db {
  pub accounts:      BTreeMap<Uuid, Account>,
  pub verify_tokens: BTreeMap<String, Uuid>,
  pub reset_tokens:  BTreeMap<String, Uuid>,
  pub renew_tokens:  BTreeMap<String, Uuid>,
  pub subjects:      BTreeMap<Uuid, Subject>,
  /// subject id → enrolled user ids
  pub members:       BTreeMap<Uuid, BTreeSet<Uuid>>,
  pub templates:     BTreeMap<Uuid, Template>,
  pub bases:         BTreeMap<String, Base>,
  /// instance id → (owner id, instance)
  pub instances:     BTreeMap<Uuid, (Uuid, Instance)>,
  pub servers:       Vec<ServerStatus>,
}

impl Db {
  pub fn account_by_mail(&self, mail: &str) -> Option<&Account> {
    self.accounts.values().find(|a| a.user.mail.eq_ignore_ascii_case(mail))
  }

  pub fn user_id_by_mail(&self, mail: &str) -> Option<Uuid> {
    self.account_by_mail(mail).map(|a| a.user.id)
  }
}

pub(crate) fn token() -> String { Uuid::new_v4().simple().to_string() }

// ─── Request log & faults ─────────────────────────────────────────────────────

/// Recorded requests kept before the oldest are dropped.
pub const LOG_CAPACITY: usize = 10_000;

/// A request as seen by the router, before any fault is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
  pub method: Method,
  pub path:   String,
}

#[derive(Debug, Clone)]
struct Fault {
  method: Method,
  prefix: String,
}

#[derive(Debug, Clone)]
struct Delay {
  method: Method,
  prefix: String,
  by:     Duration,
}

// ─── Backend ──────────────────────────────────────────────────────────────────

/// The whole mock backend. Share it as `Arc<Backend>`.
#[derive(Debug, Default)]
pub struct Backend {
  pub(crate) db: RwLock<Db>,
  log:           Mutex<VecDeque<RecordedRequest>>,
  faults:        Mutex<Vec<Fault>>,
  delays:        Mutex<Vec<Delay>>,
}

impl Backend {
  pub fn new() -> Self { Self::default() }

  // ── Observation ───────────────────────────────────────────────────────────

  /// The most recent [`LOG_CAPACITY`] requests, oldest first.
  pub fn requests(&self) -> Vec<RecordedRequest> { self.log.lock().iter().cloned().collect() }

  /// Number of recorded requests with `method` whose path starts with `prefix`.
  pub fn count(&self, method: Method, prefix: &str) -> usize {
    self
      .log
      .lock()
      .iter()
      .filter(|r| r.method == method && r.path.starts_with(prefix))
      .count()
  }

  pub fn clear_requests(&self) { self.log.lock().clear(); }

  pub(crate) fn record(&self, method: Method, path: String) {
    let mut log = self.log.lock();
    if log.len() == LOG_CAPACITY {
      log.pop_front();
    }
    log.push_back(RecordedRequest { method, path });
  }

  // ── Fault injection ───────────────────────────────────────────────────────

  /// Answer 500 to every `method` request whose path starts with `prefix`.
  pub fn fail(&self, method: Method, prefix: &str) {
    self.faults.lock().push(Fault { method, prefix: prefix.to_owned() });
  }

  pub fn clear_faults(&self) {
    self.faults.lock().clear();
    self.delays.lock().clear();
  }

  /// Hold every matching request for `by` before answering it.
  pub fn delay(&self, method: Method, prefix: &str, by: Duration) {
    self.delays.lock().push(Delay { method, prefix: prefix.to_owned(), by });
  }

  pub(crate) fn delay_for(&self, method: &Method, path: &str) -> Option<Duration> {
    self
      .delays
      .lock()
      .iter()
      .find(|d| &d.method == method && path.starts_with(&d.prefix))
      .map(|d| d.by)
  }

  pub(crate) fn is_faulted(&self, method: &Method, path: &str) -> bool {
    self
      .faults
      .lock()
      .iter()
      .any(|f| &f.method == method && path.starts_with(&f.prefix))
  }

  // ── Seeding ───────────────────────────────────────────────────────────────

  /// Insert a verified account.
  pub fn seed_user(&self, name: &str, mail: &str, password: &str, role: Role, ssh_keys: &[&str]) -> User {
    let user = User {
      id: Uuid::new_v4(),
      name: name.to_owned(),
      mail: mail.to_owned(),
      role,
      ssh_keys: ssh_keys.iter().map(|k| (*k).to_owned()).collect(),
    };
    self.db.write().accounts.insert(user.id, Account::new(user.clone(), password, true));
    user
  }

  pub fn seed_base(&self, id: &str, description: &str) -> Base {
    let base = Base { id: id.to_owned(), description: description.to_owned() };
    self.db.write().bases.insert(base.id.clone(), base.clone());
    base
  }

  pub fn seed_subject(&self, name: &str, code: &str, professor_mail: &str) -> Subject {
    let subject = Subject {
      id: Uuid::new_v4(),
      name: name.to_owned(),
      code: code.to_owned(),
      professor_name: None,
      professor_mail: professor_mail.to_owned(),
    };
    let mut db = self.db.write();
    db.members.insert(subject.id, BTreeSet::new());
    db.subjects.insert(subject.id, subject.clone());
    subject
  }

  /// Insert an instance owned by `owner` in `subject_id` with `status`.
  pub fn seed_instance(&self, owner: &User, subject_id: Uuid, status: InstanceStatus) -> Instance {
    let instance = Instance {
      id: Uuid::new_v4(),
      status,
      user_mail: owner.mail.clone(),
      subject_id,
      subject_name: None,
      created_at: Utc::now(),
      resources: Resources { vcpu_count: 2, vram_mb: 2048, size_mb: 10240 },
      wireguard_config: None,
    };
    self.db.write().instances.insert(instance.id, (owner.id, instance.clone()));
    instance
  }

  pub fn set_servers(&self, servers: Vec<ServerStatus>) { self.db.write().servers = servers; }

  pub fn servers(&self) -> Vec<ServerStatus> { self.db.read().servers.clone() }

  // ── Out-of-band tokens (what the mail server would deliver) ──────────────

  pub fn verification_token(&self, mail: &str) -> Option<String> {
    let db = self.db.read();
    let id = db.user_id_by_mail(mail)?;
    db.verify_tokens.iter().find(|(_, v)| **v == id).map(|(t, _)| t.clone())
  }

  pub fn reset_token(&self, mail: &str) -> Option<String> {
    let db = self.db.read();
    let id = db.user_id_by_mail(mail)?;
    db.reset_tokens.iter().find(|(_, v)| **v == id).map(|(t, _)| t.clone())
  }

  /// Issue a session renewal token for `user_id`.
  pub fn issue_renewal(&self, user_id: Uuid) -> String {
    let t = token();
    self.db.write().renew_tokens.insert(t.clone(), user_id);
    t
  }

  /// A small fleet and catalogue for local demos.
  pub fn seed_demo(&self) {
    self.seed_user("Admin", "admin@remotelabs.local", "admin", Role::Admin, &[]);
    self.seed_user(
      "Professor",
      "prof@remotelabs.local",
      "prof",
      Role::Professor,
      &["ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIDemoProfessorKey prof@lab"],
    );
    self.seed_base("ubuntu-22.04", "Ubuntu Server 22.04 LTS");
    self.seed_base("debian-12", "Debian 12 (bookworm)");
    self.set_servers(vec![
      ServerStatus { name: "hv-01".into(), online: true, cpu_percent: 34.0, ram_percent: 61.5, disk_percent: 48.0 },
      ServerStatus { name: "hv-02".into(), online: true, cpu_percent: 72.5, ram_percent: 80.0, disk_percent: 55.0 },
    ]);
  }
}
