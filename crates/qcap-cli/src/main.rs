//! `qcap`: maintenance and review commands for the capture store.
//!
//! Reads `qcap.toml` (or the path given with `--config`); any key can be
//! overridden from the environment, e.g. `QCAP__STORE__PATH=/data/qc.db`.
//!
//! ```text
//! qcap init
//! qcap stats --from 2024-01-01 --to 2024-01-31
//! qcap validate record candidate.json
//! qcap correct 42 --value 17
//! ```

mod commands;
mod config;

use std::{path::PathBuf, process::ExitCode};

use anyhow::Context as _;
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use qcap_store_sqlite::StorageHandle;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::config::CliConfig;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "qcap", version, about = "Quality-control capture store")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "qcap.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Create the store (if missing) and report its schema version.
  Init,
  /// Production totals over a date range, inclusive.
  Stats {
    #[arg(long)]
    from: NaiveDate,
    #[arg(long)]
    to:   NaiveDate,
  },
  /// Check a JSON candidate; exits non-zero when it has errors.
  Validate {
    kind: EntityKind,
    file: PathBuf,
    /// Template to check a recognition event's field against.
    #[arg(long)]
    template: Option<String>,
  },
  /// List images whose blur or glare exceeds a threshold.
  Quality {
    #[arg(long)]
    blur:  Option<f64>,
    #[arg(long)]
    glare: Option<f64>,
    #[arg(long)]
    limit: Option<u32>,
  },
  /// Recognition confidence summary, for one image or all of them.
  Confidence {
    #[arg(long)]
    image:     Option<String>,
    /// Defaults to `low_confidence_threshold` from the config.
    #[arg(long)]
    threshold: Option<f64>,
  },
  /// Mark a record as verified by a human.
  Verify { id: i64 },
  /// Mark a recognition event corrected, optionally replacing its value.
  Correct {
    id: i64,
    #[arg(long)]
    value: Option<String>,
  },
}

#[derive(Clone, Copy, ValueEnum)]
enum EntityKind {
  Record,
  Image,
  Event,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  let cfg = CliConfig::load(&cli.config)?;

  let store = StorageHandle::open(&cfg.store)
    .await
    .with_context(|| format!("failed to open store at {:?}", cfg.store.path))?;

  let outcome = commands::run(&store, &cfg, cli.command).await;

  if let Err(e) = store.close().await {
    tracing::warn!(error = %e, "error closing store");
  }
  outcome
}
