//! [`StorageHandle`]: owner of the single embedded SQLite connection.
//!
//! Lifecycle is an explicit state machine: a handle is only ever returned
//! from a successful open, so it starts `Ready`. `close` moves it to
//! `Closed` for good; `reinitialize` closes the current connection before
//! opening a fresh one, so two live connections never exist against the
//! same file. Every operation outside `Ready` fails with
//! [`Error::NotInitialized`].

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use rusqlite::{
  params_from_iter,
  types::{FromSql, Value, ValueRef},
};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::{
  Error, InitError, Result,
  config::StoreConfig,
  images::ImageRepo,
  recognition_events::RecognitionEventRepo,
  records::RecordRepo,
  schema::{SCHEMA, SCHEMA_VERSION},
  templates::TemplateRepo,
};

// ─── Results ─────────────────────────────────────────────────────────────────

/// What a write statement did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecOutcome {
  pub rows_affected:  usize,
  /// Rowid of the most recent successful insert on this connection.
  pub last_insert_id: i64,
}

/// One result row, with owned values and typed access by column name.
#[derive(Debug, Clone)]
pub struct SqlRow {
  columns: Arc<[String]>,
  values:  Vec<Value>,
}

impl SqlRow {
  pub fn get<T: FromSql>(&self, column: &str) -> Result<T> {
    let idx = self
      .columns
      .iter()
      .position(|c| c == column)
      .ok_or_else(|| Error::MissingColumn(column.to_owned()))?;
    T::column_result(ValueRef::from(&self.values[idx])).map_err(|source| {
      Error::Decode {
        column: column.to_owned(),
        source,
      }
    })
  }

  pub fn columns(&self) -> &[String] { &self.columns }

  pub fn values(&self) -> &[Value] { &self.values }
}

/// A parameterised statement for [`StorageHandle::transaction`].
#[derive(Debug, Clone)]
pub struct Statement {
  pub sql:    String,
  pub params: Vec<Value>,
}

impl Statement {
  pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
    Self { sql: sql.into(), params }
  }
}

// ─── State ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
  Ready,
  Closed,
}

enum State {
  Ready(tokio_rusqlite::Connection),
  Closed,
}

#[derive(Debug, Clone)]
enum Target {
  File(PathBuf),
  Memory,
}

struct Settings {
  journal_wal:  bool,
  busy_timeout: Duration,
}

struct Inner {
  target:   Target,
  settings: Settings,
  state:    RwLock<State>,
}

// ─── Handle ──────────────────────────────────────────────────────────────────

/// Process-wide handle to the capture store.
///
/// Cloning is cheap and every clone (and every repository obtained from
/// one) observes the same lifecycle state.
#[derive(Clone)]
pub struct StorageHandle {
  inner: Arc<Inner>,
}

impl StorageHandle {
  /// Open (or create) the store described by `config` and ensure the schema.
  pub async fn open(config: &StoreConfig) -> Result<Self> {
    let settings = Settings {
      journal_wal:  config.journal_wal,
      busy_timeout: Duration::from_millis(config.busy_timeout_ms),
    };
    Self::start(Target::File(config.path.clone()), settings).await
  }

  /// Open a file-backed store with default settings.
  pub async fn open_path(path: impl AsRef<Path>) -> Result<Self> {
    Self::open(&StoreConfig::new(path.as_ref())).await
  }

  /// Open a private in-memory store, as used by the tests.
  ///
  /// Reinitialising an in-memory store starts from an empty database.
  pub async fn open_in_memory() -> Result<Self> {
    let settings = Settings {
      journal_wal:  false,
      busy_timeout: Duration::ZERO,
    };
    Self::start(Target::Memory, settings).await
  }

  async fn start(target: Target, settings: Settings) -> Result<Self> {
    let conn = connect(&target, &settings).await?;
    Ok(Self {
      inner: Arc::new(Inner {
        target,
        settings,
        state: RwLock::new(State::Ready(conn)),
      }),
    })
  }

  pub async fn state(&self) -> HandleState {
    match &*self.inner.state.read().await {
      State::Ready(_) => HandleState::Ready,
      State::Closed => HandleState::Closed,
    }
  }

  /// Close the connection. Safe to call repeatedly.
  pub async fn close(&self) -> Result<()> {
    let mut state = self.inner.state.write().await;
    let State::Ready(conn) = std::mem::replace(&mut *state, State::Closed) else {
      return Ok(());
    };
    debug!(store = ?self.inner.target, "closing store");
    close_connection(conn).await
  }

  /// Invalidate the current connection, then open a new one against the
  /// same target. Callers block on the state lock meanwhile; if opening
  /// fails the handle stays closed.
  pub async fn reinitialize(&self) -> Result<()> {
    let mut state = self.inner.state.write().await;
    if let State::Ready(conn) = std::mem::replace(&mut *state, State::Closed)
      && let Err(e) = close_connection(conn).await
    {
      warn!(error = %e, "error closing store before reinitialization");
    }
    let conn = connect(&self.inner.target, &self.inner.settings).await?;
    *state = State::Ready(conn);
    debug!(store = ?self.inner.target, "store reinitialized");
    Ok(())
  }

  /// Fail with [`Error::NotInitialized`] unless the handle is ready. For
  /// calls that may finish without touching the database.
  pub(crate) async fn ensure_ready(&self) -> Result<()> {
    self.connection().await.map(drop)
  }

  async fn connection(&self) -> Result<tokio_rusqlite::Connection> {
    match &*self.inner.state.read().await {
      State::Ready(conn) => Ok(conn.clone()),
      State::Closed => Err(Error::NotInitialized),
    }
  }

  // ── Primitives ────────────────────────────────────────────────────────────

  /// Run a parameterised query and collect every row.
  pub async fn query(
    &self,
    sql: impl Into<String>,
    params: Vec<Value>,
  ) -> Result<Vec<SqlRow>> {
    let conn = self.connection().await?;
    let sql = sql.into();

    let rows = conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let columns: Arc<[String]> =
          stmt.column_names().into_iter().map(str::to_owned).collect();
        let width = columns.len();

        let mut rows = stmt.query(params_from_iter(params.iter()))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
          let values = (0..width)
            .map(|i| row.get::<_, Value>(i))
            .collect::<rusqlite::Result<Vec<_>>>()?;
          out.push(SqlRow {
            columns: Arc::clone(&columns),
            values,
          });
        }
        Ok(out)
      })
      .await?;

    Ok(rows)
  }

  /// Run a parameterised write statement.
  pub async fn execute(
    &self,
    sql: impl Into<String>,
    params: Vec<Value>,
  ) -> Result<ExecOutcome> {
    let conn = self.connection().await?;
    let sql = sql.into();

    let outcome = conn
      .call(move |conn| {
        let rows_affected = conn.execute(&sql, params_from_iter(params.iter()))?;
        Ok(ExecOutcome {
          rows_affected,
          last_insert_id: conn.last_insert_rowid(),
        })
      })
      .await?;

    Ok(outcome)
  }

  /// Run `statements` atomically: all commit or none do.
  pub async fn transaction(&self, statements: Vec<Statement>) -> Result<Vec<ExecOutcome>> {
    let conn = self.connection().await?;

    let outcomes = conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut outcomes = Vec::with_capacity(statements.len());
        for Statement { sql, params } in statements {
          let rows_affected = tx.execute(&sql, params_from_iter(params.iter()))?;
          outcomes.push(ExecOutcome {
            rows_affected,
            last_insert_id: tx.last_insert_rowid(),
          });
        }
        tx.commit()?;
        Ok(outcomes)
      })
      .await?;

    Ok(outcomes)
  }

  /// The schema revision recorded in `PRAGMA user_version`.
  pub async fn schema_version(&self) -> Result<i64> {
    let rows = self.query("PRAGMA user_version", vec![]).await?;
    match rows.first() {
      Some(row) => row.get("user_version"),
      None => Ok(0),
    }
  }

  // ── Repositories ──────────────────────────────────────────────────────────

  pub fn templates(&self) -> TemplateRepo { TemplateRepo::new(self.clone()) }

  pub fn images(&self) -> ImageRepo { ImageRepo::new(self.clone()) }

  pub fn records(&self) -> RecordRepo { RecordRepo::new(self.clone()) }

  pub fn recognition_events(&self) -> RecognitionEventRepo {
    RecognitionEventRepo::new(self.clone())
  }
}

// ─── Connection setup ────────────────────────────────────────────────────────

async fn connect(
  target: &Target,
  settings: &Settings,
) -> Result<tokio_rusqlite::Connection, InitError> {
  let conn = match target {
    Target::File(path) => tokio_rusqlite::Connection::open(path).await,
    Target::Memory => tokio_rusqlite::Connection::open_in_memory().await,
  }
  .map_err(InitError::Open)?;

  // Off by default in SQLite; refuse to run without it.
  let fk_enabled = conn
    .call(|conn| {
      conn.execute_batch("PRAGMA foreign_keys = ON;")?;
      let enabled: bool = conn.pragma_query_value(None, "foreign_keys", |r| r.get(0))?;
      Ok(enabled)
    })
    .await
    .map_err(InitError::Configure)?;
  if !fk_enabled {
    return Err(InitError::ForeignKeysUnavailable);
  }

  let journal_wal = settings.journal_wal;
  let busy_timeout = settings.busy_timeout;
  conn
    .call(move |conn| {
      conn.busy_timeout(busy_timeout)?;
      if journal_wal {
        let mode: String = conn
          .pragma_update_and_check(None, "journal_mode", "WAL", |r| r.get(0))?;
        if !mode.eq_ignore_ascii_case("wal") {
          tracing::warn!(%mode, "store does not support WAL; using fallback journal mode");
        }
      }
      Ok(())
    })
    .await
    .map_err(InitError::Configure)?;

  conn
    .call(|conn| {
      conn.execute_batch(SCHEMA)?;
      conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
      Ok(())
    })
    .await
    .map_err(InitError::Schema)?;

  debug!(store = ?target, "store opened");
  Ok(conn)
}

async fn close_connection(conn: tokio_rusqlite::Connection) -> Result<()> {
  match conn.close().await {
    Ok(()) | Err(tokio_rusqlite::Error::ConnectionClosed) => Ok(()),
    Err(e) => Err(Error::Database(e)),
  }
}
