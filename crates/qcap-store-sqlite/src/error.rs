//! Error types for `qcap-store-sqlite`.

use rusqlite::{ErrorCode, ffi, types::FromSqlError};
use thiserror::Error;

/// Why a storage handle could not be brought to the ready state.
///
/// These are terminal: the handle stays closed until it is explicitly
/// reinitialised.
#[derive(Debug, Error)]
pub enum InitError {
  #[error("failed to open store: {0}")]
  Open(#[source] tokio_rusqlite::Error),

  #[error("foreign key enforcement could not be enabled")]
  ForeignKeysUnavailable,

  #[error("failed to configure connection: {0}")]
  Configure(#[source] tokio_rusqlite::Error),

  #[error("failed to create schema: {0}")]
  Schema(#[source] tokio_rusqlite::Error),
}

#[derive(Debug, Error)]
pub enum Error {
  /// The handle is closed or being reinitialised. Not a backend failure.
  #[error("storage handle is not initialized")]
  NotInitialized,

  #[error("store initialization failed: {0}")]
  Init(#[from] InitError),

  #[error("database error: {0}")]
  Database(#[source] tokio_rusqlite::Error),

  #[error("column {0:?} is not in the result set")]
  MissingColumn(String),

  #[error("cannot decode column {column:?}: {source}")]
  Decode {
    column: String,
    #[source]
    source: FromSqlError,
  },

  #[error("invalid timestamp {value:?}: {source}")]
  Timestamp {
    value:  String,
    #[source]
    source: chrono::ParseError,
  },

  #[error("core error: {0}")]
  Core(#[from] qcap_core::Error),
}

/// A call that raced with `close` sees the worker thread gone; report that
/// as use-before-ready rather than as a backend failure.
impl From<tokio_rusqlite::Error> for Error {
  fn from(e: tokio_rusqlite::Error) -> Self {
    match e {
      tokio_rusqlite::Error::ConnectionClosed => Self::NotInitialized,
      other => Self::Database(other),
    }
  }
}

impl From<rusqlite::Error> for Error {
  fn from(e: rusqlite::Error) -> Self { Self::Database(e.into()) }
}

impl Error {
  fn sqlite_failure(&self) -> Option<&ffi::Error> {
    match self {
      Self::Database(tokio_rusqlite::Error::Rusqlite(
        rusqlite::Error::SqliteFailure(e, _),
      )) => Some(e),
      _ => None,
    }
  }

  /// Any constraint violation: foreign key, NOT NULL, primary key, …
  pub fn is_constraint_violation(&self) -> bool {
    self
      .sqlite_failure()
      .is_some_and(|e| e.code == ErrorCode::ConstraintViolation)
  }

  pub fn is_foreign_key_violation(&self) -> bool {
    self
      .sqlite_failure()
      .is_some_and(|e| e.extended_code == ffi::SQLITE_CONSTRAINT_FOREIGNKEY)
  }

  pub fn is_not_initialized(&self) -> bool { matches!(self, Self::NotInitialized) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
