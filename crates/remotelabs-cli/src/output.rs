//! Table rendering for list commands and notification printing.

use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL};
use remotelabs_client::notify::{Level, Notification};
use remotelabs_core::{
  instance::Instance,
  server::ServerStatus,
  subject::Subject,
  template::{Base, Resources, Template},
  user::User,
};

/// A value that renders as one table row.
pub trait Row {
  fn headers() -> Vec<&'static str>;
  fn row(&self) -> Vec<String>;
}

pub fn print_list<T: Row>(items: &[T]) {
  if items.is_empty() {
    println!("Nothing found.");
    return;
  }
  let mut table = Table::new();
  table
    .load_preset(UTF8_FULL)
    .set_content_arrangement(ContentArrangement::Dynamic)
    .set_header(T::headers());
  for item in items {
    table.add_row(item.row());
  }
  println!("{table}");
}

/// Print collected notifications: successes to stdout, the rest to stderr.
pub fn print_notifications(notifications: Vec<Notification>) {
  for n in notifications {
    match n.level {
      Level::Success => println!("✔ {}", n.message),
      Level::Warning => eprintln!("! {}", n.message),
      Level::Error => eprintln!("✘ {}", n.message),
    }
  }
}

fn gib(mib: u64) -> String {
  if mib % 1024 == 0 { format!("{} GiB", mib / 1024) } else { format!("{mib} MiB") }
}

fn resources(r: &Resources) -> [String; 3] {
  [r.vcpu_count.to_string(), gib(r.vram_mb), gib(r.size_mb)]
}

// ─── Rows ─────────────────────────────────────────────────────────────────────

impl Row for Subject {
  fn headers() -> Vec<&'static str> { vec!["ID", "Code", "Name", "Professor"] }

  fn row(&self) -> Vec<String> {
    let professor = match &self.professor_name {
      Some(name) => format!("{name} <{}>", self.professor_mail),
      None => self.professor_mail.clone(),
    };
    vec![self.id.to_string(), self.code.clone(), self.name.clone(), professor]
  }
}

impl Row for User {
  fn headers() -> Vec<&'static str> { vec!["ID", "Name", "Mail", "Role", "SSH keys"] }

  fn row(&self) -> Vec<String> {
    vec![
      self.id.to_string(),
      self.name.clone(),
      self.mail.clone(),
      self.role.to_string(),
      self.ssh_keys.len().to_string(),
    ]
  }
}

impl Row for Template {
  fn headers() -> Vec<&'static str> { vec!["ID", "Description", "vCPU", "RAM", "Disk"] }

  fn row(&self) -> Vec<String> {
    let mut row = vec![self.id.to_string(), self.description.clone()];
    row.extend(resources(&self.resources));
    row
  }
}

impl Row for Base {
  fn headers() -> Vec<&'static str> { vec!["ID", "Description"] }

  fn row(&self) -> Vec<String> { vec![self.id.clone(), self.description.clone()] }
}

impl Row for Instance {
  fn headers() -> Vec<&'static str> {
    vec!["ID", "Status", "Subject", "vCPU", "RAM", "Disk", "Created"]
  }

  fn row(&self) -> Vec<String> {
    let subject = self.subject_name.clone().unwrap_or_else(|| self.subject_id.to_string());
    let mut row = vec![self.id.to_string(), self.status.to_string(), subject];
    row.extend(resources(&self.resources));
    row.push(self.created_at.format("%Y-%m-%d %H:%M").to_string());
    row
  }
}

impl Row for ServerStatus {
  fn headers() -> Vec<&'static str> { vec!["Server", "Online", "CPU %", "RAM %", "Disk %"] }

  fn row(&self) -> Vec<String> {
    vec![
      self.name.clone(),
      if self.online { "yes" } else { "no" }.to_owned(),
      format!("{:.1}", self.cpu_percent),
      format!("{:.1}", self.ram_percent),
      format!("{:.1}", self.disk_percent),
    ]
  }
}
