//! Configuration for the `qcap` binary.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use qcap_core::quality::DEFAULT_LOW_CONFIDENCE;
use qcap_store_sqlite::StoreConfig;
use serde::Deserialize;

/// Deserialised from `qcap.toml` and `QCAP__*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct CliConfig {
  #[serde(default = "default_store")]
  pub store:                    StoreConfig,
  /// Confidences strictly below this are flagged for review.
  #[serde(default = "default_low_confidence")]
  pub low_confidence_threshold: f64,
}

fn default_store() -> StoreConfig { StoreConfig::new("qcap.db") }

fn default_low_confidence() -> f64 { DEFAULT_LOW_CONFIDENCE }

impl CliConfig {
  /// Layer the (optional) file at `path` under the environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("QCAP").separator("__"))
      .build()
      .context("failed to read config file")?;

    let mut cfg: CliConfig = settings
      .try_deserialize()
      .context("failed to deserialise CliConfig")?;
    cfg.store.path = expand_tilde(&cfg.store.path);
    Ok(cfg)
  }
}

/// Resolve a leading `~` component against `$HOME`.
fn expand_tilde(path: &Path) -> PathBuf {
  match (path.strip_prefix("~"), std::env::var_os("HOME")) {
    (Ok(rest), Some(home)) => PathBuf::from(home).join(rest),
    _ => path.to_path_buf(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_file_falls_back_to_defaults() {
    let cfg = CliConfig::load(Path::new("/nonexistent/qcap.toml")).unwrap();
    assert_eq!(cfg.low_confidence_threshold, DEFAULT_LOW_CONFIDENCE);
    assert!(cfg.store.journal_wal);
  }

  #[test]
  fn store_table_is_read_from_file() {
    let path = std::env::temp_dir().join(format!("qcap-config-{}.toml", std::process::id()));
    std::fs::write(
      &path,
      "low_confidence_threshold = 0.6\n\n[store]\npath = \"/data/capture.db\"\nbusy_timeout_ms = 250\n",
    )
    .unwrap();

    let cfg = CliConfig::load(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(cfg.low_confidence_threshold, 0.6);
    assert_eq!(cfg.store.path, PathBuf::from("/data/capture.db"));
    assert_eq!(cfg.store.busy_timeout_ms, 250);
    assert!(cfg.store.journal_wal);
  }

  #[test]
  fn tilde_expands_only_as_a_prefix() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(expand_tilde(Path::new("~/q.db")), PathBuf::from(home).join("q.db"));
    assert_eq!(expand_tilde(Path::new("/a/~/q.db")), PathBuf::from("/a/~/q.db"));
    assert_eq!(expand_tilde(Path::new("~user/q.db")), PathBuf::from("~user/q.db"));
  }
}
