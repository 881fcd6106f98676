//! Transient user-facing notifications ("toasts").
//!
//! Action services report each outcome once through a [`Notifier`]; they
//! never own list state.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
  Success,
  Warning,
  Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
  pub level:   Level,
  pub message: String,
}

pub trait Notifier: Send + Sync {
  fn notify(&self, notification: Notification);

  fn success(&self, message: String) { self.notify(Notification { level: Level::Success, message }) }
  fn warning(&self, message: String) { self.notify(Notification { level: Level::Warning, message }) }
  fn error(&self, message: String) { self.notify(Notification { level: Level::Error, message }) }
}

/// Writes notifications to the tracing subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
  fn notify(&self, n: Notification) {
    match n.level {
      Level::Success => info!(target: "remotelabs::notify", "{}", n.message),
      Level::Warning => warn!(target: "remotelabs::notify", "{}", n.message),
      Level::Error => error!(target: "remotelabs::notify", "{}", n.message),
    }
  }
}

/// Keeps every notification so it can be inspected or printed later.
#[derive(Debug, Default, Clone)]
pub struct RecordingNotifier {
  seen: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
  pub fn new() -> Self { Self::default() }

  pub fn take(&self) -> Vec<Notification> { std::mem::take(&mut *self.seen.lock()) }

  pub fn snapshot(&self) -> Vec<Notification> { self.seen.lock().clone() }
}

impl Notifier for RecordingNotifier {
  fn notify(&self, notification: Notification) { self.seen.lock().push(notification) }
}
