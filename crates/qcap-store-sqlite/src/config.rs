//! Connection settings for the capture store.

use std::path::PathBuf;

use serde::Deserialize;

/// Store settings, usually deserialised from the `[store]` table of the
/// binary's configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
  /// Path of the SQLite file; created if missing.
  pub path:            PathBuf,
  /// Use write-ahead logging so readers do not block behind a writer.
  #[serde(default = "default_journal_wal")]
  pub journal_wal:     bool,
  /// How long a write waits for another in-flight write before failing.
  #[serde(default = "default_busy_timeout_ms")]
  pub busy_timeout_ms: u64,
}

fn default_journal_wal() -> bool { true }

fn default_busy_timeout_ms() -> u64 { 5000 }

impl StoreConfig {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self {
      path:            path.into(),
      journal_wal:     default_journal_wal(),
      busy_timeout_ms: default_busy_timeout_ms(),
    }
  }
}
