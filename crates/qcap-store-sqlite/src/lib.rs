//! SQLite backend for the quality-control capture store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated
//! thread without blocking the async runtime. A [`StorageHandle`] owns the
//! connection; the four repositories are thin typed façades obtained from
//! it and share its lifecycle.

mod encode;
mod schema;
mod update;

pub mod config;
pub mod error;
pub mod handle;
pub mod images;
pub mod page;
pub mod recognition_events;
pub mod records;
pub mod templates;

pub use config::StoreConfig;
pub use error::{Error, InitError, Result};
pub use handle::{ExecOutcome, HandleState, SqlRow, Statement, StorageHandle};
pub use images::ImageRepo;
pub use page::Page;
pub use recognition_events::RecognitionEventRepo;
pub use records::RecordRepo;
pub use templates::TemplateRepo;

#[cfg(test)]
mod tests;
