//! Core types for the quality-control capture store.
//!
//! Holds the data model (templates, images, transaction records,
//! recognition events), the validation engine, and the pure helpers for
//! quality scoring and column encodings. This crate has no database
//! dependency; `qcap-store-sqlite` builds on it.

pub mod codec;
pub mod dimensions;
pub mod error;
pub mod image;
pub mod patch;
pub mod quality;
pub mod recognition;
pub mod record;
pub mod template;
pub mod validate;

pub use error::{Error, Result};
pub use patch::Patch;
