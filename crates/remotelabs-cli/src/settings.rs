//! Layered CLI settings: defaults, then the TOML file, then `REMOTELABS_*`,
//! then command-line flags.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use anyhow::Context as _;
use serde::Deserialize;

pub const DEFAULT_CONFIG: &str = "~/.config/remotelabs/config.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
  #[serde(default = "default_api_url")]
  pub api_url:            String,
  #[serde(default = "default_session_file")]
  pub session_file:       PathBuf,
  #[serde(default = "default_poll_interval")]
  pub poll_interval_secs: u64,
  #[serde(default = "default_history_len")]
  pub history_len:        usize,
  #[serde(default = "default_timeout")]
  pub timeout_secs:       u64,
}

fn default_api_url() -> String { "http://localhost:8080".into() }
fn default_session_file() -> PathBuf { PathBuf::from("~/.config/remotelabs/session.json") }
fn default_poll_interval() -> u64 { 5 }
fn default_history_len() -> usize { remotelabs_client::monitor::DEFAULT_HISTORY_LEN }
fn default_timeout() -> u64 { 30 }

impl Settings {
  /// Read `file` (absent is fine) and the environment, then apply flag
  /// overrides.
  pub fn load(file: &Path, url: Option<String>, session_file: Option<PathBuf>) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(expand_tilde(file)).required(false))
      .add_source(config::Environment::with_prefix("REMOTELABS"))
      .build()
      .context("failed to read config file")?;
    let mut cfg: Settings = settings
      .try_deserialize()
      .context("failed to deserialise Settings")?;

    if let Some(url) = url {
      cfg.api_url = url;
    }
    if let Some(path) = session_file {
      cfg.session_file = path;
    }
    cfg.session_file = expand_tilde(&cfg.session_file);
    Ok(cfg)
  }

  pub fn poll_interval(&self) -> Duration { Duration::from_secs(self.poll_interval_secs.max(1)) }

  pub fn timeout(&self) -> Duration { Duration::from_secs(self.timeout_secs) }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
