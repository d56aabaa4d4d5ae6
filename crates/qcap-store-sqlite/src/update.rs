//! Builder for partial `UPDATE` statements.

use qcap_core::Patch;
use rusqlite::types::Value;

/// Column assignments collected from a patch. Only `Patch::Set` fields
/// produce an assignment.
#[derive(Default)]
pub struct Assignments {
  columns: Vec<&'static str>,
  values:  Vec<Value>,
}

impl Assignments {
  pub fn set<T: Into<Value>>(&mut self, column: &'static str, patch: Patch<T>) -> &mut Self {
    if let Patch::Set(v) = patch {
      self.columns.push(column);
      self.values.push(v.into());
    }
    self
  }

  pub fn is_empty(&self) -> bool { self.columns.is_empty() }

  /// `UPDATE {table} SET … WHERE {key_column} = ?`, or `None` when nothing
  /// was set.
  pub fn into_statement(
    self,
    table: &str,
    key_column: &str,
    key: Value,
  ) -> Option<(String, Vec<Value>)> {
    if self.is_empty() {
      return None;
    }
    let set_clause = self
      .columns
      .iter()
      .map(|c| format!("{c} = ?"))
      .collect::<Vec<_>>()
      .join(", ");
    let sql = format!("UPDATE {table} SET {set_clause} WHERE {key_column} = ?");
    let mut values = self.values;
    values.push(key);
    Some((sql, values))
  }
}
