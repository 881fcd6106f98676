use std::time::Duration;

use remotelabs_core::server::ServerStatus;
use reqwest::Method;

use super::Harness;
use crate::monitor::ServerMonitor;

fn server(name: &str, load: f64) -> ServerStatus {
  ServerStatus {
    name:         name.into(),
    online:       true,
    cpu_percent:  load,
    ram_percent:  load / 2.0,
    disk_percent: 40.0,
  }
}

#[tokio::test]
async fn each_poll_appends_one_sample_per_server() {
  let h = Harness::start().await;
  h.backend.set_servers(vec![server("node-1", 10.0), server("node-2", 80.0)]);
  let mut monitor = ServerMonitor::new(h.client.clone(), 5);

  monitor.poll().await.unwrap();
  h.backend.set_servers(vec![server("node-1", 30.0), server("node-2", 60.0)]);
  monitor.poll().await.unwrap();

  let view = monitor.view();
  assert_eq!(view.polls, 2);
  assert!(!view.error);
  assert_eq!(view.servers[0].cpu_percent, 30.0);
  assert_eq!(view.history["node-1"].series(|s| s.cpu), vec![10, 30]);
  assert_eq!(view.history["node-2"].series(|s| s.ram), vec![40, 30]);
}

#[tokio::test]
async fn failed_poll_keeps_history_and_recovers() {
  let h = Harness::start().await;
  h.backend.set_servers(vec![server("node-1", 10.0)]);
  let mut monitor = ServerMonitor::new(h.client.clone(), 5);
  monitor.poll().await.unwrap();

  h.backend.fail(Method::GET, "/servers/status");
  assert!(monitor.poll().await.is_err());
  assert!(monitor.view().error);
  assert_eq!(monitor.view().servers.len(), 1);
  assert_eq!(monitor.view().history["node-1"].len(), 1);

  h.backend.clear_faults();
  monitor.poll().await.unwrap();
  assert!(!monitor.view().error);
  assert_eq!(monitor.view().history["node-1"].len(), 2);
}

#[tokio::test]
async fn history_is_bounded_by_capacity() {
  let h = Harness::start().await;
  let mut monitor = ServerMonitor::new(h.client.clone(), 3);
  for load in [10.0, 20.0, 30.0, 40.0, 50.0] {
    h.backend.set_servers(vec![server("node-1", load)]);
    monitor.poll().await.unwrap();
  }
  assert_eq!(monitor.view().history["node-1"].series(|s| s.cpu), vec![30, 40, 50]);
}

#[tokio::test]
async fn spawned_monitor_publishes_views() {
  let h = Harness::start().await;
  h.backend.set_servers(vec![server("node-1", 25.0)]);
  let handle = ServerMonitor::new(h.client.clone(), 5).spawn(Duration::from_millis(20));
  let mut rx = handle.receiver();

  tokio::time::timeout(Duration::from_secs(5), async {
    while rx.borrow_and_update().polls < 2 {
      rx.changed().await.unwrap();
    }
  })
  .await
  .expect("monitor published two polls");

  let view = handle.latest();
  assert!(view.polls >= 2);
  assert_eq!(view.servers, vec![server("node-1", 25.0)]);
  drop(handle);
  assert!(h.backend.count(Method::GET, "/servers/status") >= 2);
}
