//! Error types for `qcap-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("matrix is not rectangular: row {row} has {found} columns, expected {expected}")]
  RaggedMatrix {
    row:      usize,
    found:    usize,
    expected: usize,
  },

  #[error("matrix entry at row {row}, column {col} is not a finite number")]
  NonFiniteMatrix { row: usize, col: usize },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
