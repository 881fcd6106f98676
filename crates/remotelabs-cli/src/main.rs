//! `remotelabs`: command-line client for the RemoteLabs virtual-lab API.
//!
//! # Usage
//!
//! ```text
//! remotelabs login --mail prof@remotelabs.local
//! remotelabs subjects create --name "Networks" --code 1001 \
//!   --professor prof@remotelabs.local --base ubuntu-22.04 --ram 4 --cpu 2 --storage 20
//! remotelabs vms list
//! remotelabs dashboard
//! ```

mod app;
mod commands;
mod output;
mod settings;
mod ui;

use std::path::PathBuf;

use clap::Parser;
use commands::{Command, Context};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "remotelabs", version, about = "Command-line client for RemoteLabs")]
struct Cli {
  /// Path to a TOML config file.
  #[arg(short, long, value_name = "FILE", default_value = settings::DEFAULT_CONFIG)]
  config: PathBuf,

  /// Base URL of the RemoteLabs API.
  #[arg(long, env = "REMOTELABS_URL")]
  url: Option<String>,

  /// Where the logged-in session is remembered.
  #[arg(long, value_name = "FILE")]
  session_file: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let settings = settings::Settings::load(&cli.config, cli.url, cli.session_file)?;
  tracing::debug!(?settings, "loaded settings");

  let mut ctx = Context::open(settings).await?;
  commands::run(&mut ctx, cli.command).await
}
