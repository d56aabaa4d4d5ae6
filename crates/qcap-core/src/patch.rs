//! Partial-update wrapper.
//!
//! A [`Patch`] distinguishes "leave this column alone" from "write this
//! value". Nullable columns use `Patch<Option<T>>`, so `Patch::Set(None)`
//! clears the column while `Patch::Keep` never touches it.

use serde::{Deserialize, Deserializer};

/// One field of a partial update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch<T> {
  /// Field absent from the update; the stored value is kept.
  Keep,
  /// Field present; the stored value is overwritten.
  Set(T),
}

impl<T> Default for Patch<T> {
  fn default() -> Self { Self::Keep }
}

impl<T> From<T> for Patch<T> {
  fn from(value: T) -> Self { Self::Set(value) }
}

impl<T> Patch<T> {
  pub fn is_set(&self) -> bool { matches!(self, Self::Set(_)) }

  pub fn is_keep(&self) -> bool { matches!(self, Self::Keep) }

  pub fn as_set(&self) -> Option<&T> {
    match self {
      Self::Set(v) => Some(v),
      Self::Keep => None,
    }
  }

  pub fn into_set(self) -> Option<T> {
    match self {
      Self::Set(v) => Some(v),
      Self::Keep => None,
    }
  }

  pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Patch<U> {
    match self {
      Self::Set(v) => Patch::Set(f(v)),
      Self::Keep => Patch::Keep,
    }
  }

  /// Apply a fallible conversion to a set value.
  pub fn try_map<U, E>(
    self,
    f: impl FnOnce(T) -> Result<U, E>,
  ) -> Result<Patch<U>, E> {
    match self {
      Self::Set(v) => f(v).map(Patch::Set),
      Self::Keep => Ok(Patch::Keep),
    }
  }
}

/// A present key always deserializes to `Set`, including an explicit
/// `null` for `Patch<Option<T>>`. Missing keys rely on `#[serde(default)]`
/// at the containing struct to become `Keep`.
impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
  fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
    T::deserialize(d).map(Patch::Set)
  }
}

#[cfg(test)]
mod tests {
  use serde::Deserialize;

  use super::*;

  #[derive(Deserialize, Default)]
  #[serde(default)]
  struct Edit {
    notes: Patch<Option<String>>,
    count: Patch<Option<i64>>,
  }

  #[test]
  fn missing_key_is_keep_and_null_is_set_none() {
    let edit: Edit = serde_json::from_str(r#"{ "notes": null }"#).unwrap();
    assert_eq!(edit.notes, Patch::Set(None));
    assert_eq!(edit.count, Patch::Keep);
  }

  #[test]
  fn zero_is_a_real_value() {
    let edit: Edit = serde_json::from_str(r#"{ "count": 0 }"#).unwrap();
    assert_eq!(edit.count, Patch::Set(Some(0)));
  }

  #[test]
  fn try_map_propagates_errors_only_for_set() {
    let keep: Patch<&str> = Patch::Keep;
    assert_eq!(keep.try_map(|s| s.parse::<i64>()), Ok(Patch::Keep));
    assert!(Patch::Set("x").try_map(|s| s.parse::<i64>()).is_err());
  }
}
