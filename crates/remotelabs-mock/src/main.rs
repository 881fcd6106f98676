//! remotelabs-mock server binary.
//!
//! Serves the in-memory backend over HTTP for local use of the CLI:
//!
//! ```text
//! remotelabs-mock --config mock.toml
//! REMOTELABS_MOCK_PORT=9000 remotelabs-mock
//! ```

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context as _;
use clap::Parser;
use remotelabs_mock::Backend;
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "In-memory RemoteLabs API for local development")]
struct Cli {
  /// Path to an optional TOML configuration file.
  #[arg(short, long, default_value = "mock.toml")]
  config: PathBuf,
}

/// Runtime configuration, deserialised from the file and `REMOTELABS_MOCK_*`.
#[derive(Deserialize)]
struct MockConfig {
  #[serde(default = "default_host")]
  host: String,
  #[serde(default = "default_port")]
  port: u16,
  /// Load demo accounts, base images and servers.
  #[serde(default = "default_seed")]
  seed: bool,
}

fn default_host() -> String { "127.0.0.1".into() }
fn default_port() -> u16 { 8080 }
fn default_seed() -> bool { true }

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("REMOTELABS_MOCK"))
    .build()
    .context("failed to read config file")?;
  let cfg: MockConfig = settings
    .try_deserialize()
    .context("failed to deserialise MockConfig")?;

  let backend = Arc::new(Backend::new());
  if cfg.seed {
    backend.seed_demo();
    tracing::info!("seeded demo data (admin@remotelabs.local / admin, prof@remotelabs.local / prof)");
    tokio::spawn(drift_load(Arc::clone(&backend)));
  }

  let address = format!("{}:{}", cfg.host, cfg.port);
  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, remotelabs_mock::router(backend))
    .await
    .context("server error")?;
  Ok(())
}

/// Move the demo servers' utilisation along slow waves so dashboards have
/// something to draw.
async fn drift_load(backend: Arc<Backend>) {
  let mut ticker = tokio::time::interval(Duration::from_secs(2));
  let mut step: f64 = 0.0;
  loop {
    ticker.tick().await;
    step += 1.0;
    let mut servers = backend.servers();
    for (i, s) in servers.iter_mut().enumerate() {
      let phase = step / 5.0 + i as f64;
      s.cpu_percent = (50.0 + 40.0 * phase.sin()).clamp(0.0, 100.0);
      s.ram_percent = (60.0 + 20.0 * (phase / 2.0).cos()).clamp(0.0, 100.0);
      s.disk_percent = (s.disk_percent + 0.1).min(95.0);
    }
    backend.set_servers(servers);
  }
}
