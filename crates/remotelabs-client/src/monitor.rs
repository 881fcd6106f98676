//! Fleet health polling with bounded per-server history.

use std::{
  collections::{BTreeMap, VecDeque},
  time::Duration,
};

use remotelabs_core::server::ServerStatus;
use tokio::{sync::watch, task::JoinHandle, time::MissedTickBehavior};
use tracing::debug;

use crate::{ApiClient, Result};

pub const DEFAULT_HISTORY_LEN: usize = 30;

/// One utilisation sample, percentages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
  pub cpu:  f64,
  pub ram:  f64,
  pub disk: f64,
}

/// Fixed-capacity ring of the most recent samples for one server.
#[derive(Debug, Clone, PartialEq)]
pub struct History {
  capacity: usize,
  samples:  VecDeque<Sample>,
}

impl History {
  pub fn new(capacity: usize) -> Self {
    let capacity = capacity.max(1);
    Self { capacity, samples: VecDeque::with_capacity(capacity) }
  }

  pub fn push(&mut self, sample: Sample) {
    if self.samples.len() == self.capacity {
      self.samples.pop_front();
    }
    self.samples.push_back(sample);
  }

  pub fn len(&self) -> usize { self.samples.len() }
  pub fn is_empty(&self) -> bool { self.samples.is_empty() }
  pub fn latest(&self) -> Option<&Sample> { self.samples.back() }
  pub fn iter(&self) -> impl Iterator<Item = &Sample> { self.samples.iter() }

  /// Oldest-first series of one metric, rounded to whole percent.
  pub fn series(&self, metric: impl Fn(&Sample) -> f64) -> Vec<u64> {
    self.samples.iter().map(|s| metric(s).clamp(0.0, 100.0).round() as u64).collect()
  }
}

/// What a dashboard renders: the latest snapshot plus history.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FleetView {
  pub servers: Vec<ServerStatus>,
  pub history: BTreeMap<String, History>,
  /// The most recent poll failed; `servers` and `history` are from before it.
  pub error:   bool,
  pub polls:   u64,
}

/// Polls `GET /servers/status`.
#[derive(Debug)]
pub struct ServerMonitor {
  client:   ApiClient,
  capacity: usize,
  view:     FleetView,
}

impl ServerMonitor {
  pub fn new(client: ApiClient, capacity: usize) -> Self {
    Self { client, capacity, view: FleetView::default() }
  }

  pub fn view(&self) -> &FleetView { &self.view }

  /// Poll once. On failure the error flag is raised and history is kept.
  pub async fn poll(&mut self) -> Result<()> {
    self.view.polls += 1;
    match self.client.servers_status().await {
      Ok(servers) => {
        for s in &servers {
          self
            .view
            .history
            .entry(s.name.clone())
            .or_insert_with(|| History::new(self.capacity))
            .push(Sample { cpu: s.cpu_percent, ram: s.ram_percent, disk: s.disk_percent });
        }
        self.view.servers = servers;
        self.view.error = false;
        Ok(())
      }
      Err(e) => {
        debug!(error = %e, "server status poll failed");
        self.view.error = true;
        Err(e)
      }
    }
  }

  /// Poll every `interval` on a background task, publishing each view.
  pub fn spawn(mut self, interval: Duration) -> MonitorHandle {
    let (tx, rx) = watch::channel(self.view.clone());
    let task = tokio::spawn(async move {
      let mut ticker = tokio::time::interval(interval);
      ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
      loop {
        ticker.tick().await;
        let _ = self.poll().await;
        if tx.send(self.view.clone()).is_err() {
          break;
        }
      }
    });
    MonitorHandle { rx, task }
  }
}

/// A running poller. Dropping it stops polling.
#[derive(Debug)]
pub struct MonitorHandle {
  rx:   watch::Receiver<FleetView>,
  task: JoinHandle<()>,
}

impl MonitorHandle {
  pub fn latest(&self) -> FleetView { self.rx.borrow().clone() }

  pub fn receiver(&self) -> watch::Receiver<FleetView> { self.rx.clone() }
}

impl Drop for MonitorHandle {
  fn drop(&mut self) { self.task.abort(); }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sample(v: f64) -> Sample { Sample { cpu: v, ram: v, disk: v } }

  #[test]
  fn history_evicts_oldest_at_capacity() {
    let mut h = History::new(3);
    for v in [1.0, 2.0, 3.0, 4.0] {
      h.push(sample(v));
    }
    assert_eq!(h.len(), 3);
    assert_eq!(h.series(|s| s.cpu), vec![2, 3, 4]);
  }

  #[test]
  fn series_clamps_to_percent_range() {
    let mut h = History::new(2);
    h.push(sample(-5.0));
    h.push(sample(140.0));
    assert_eq!(h.series(|s| s.ram), vec![0, 100]);
  }
}
