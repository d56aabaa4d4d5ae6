//! Pagination for list queries.

use rusqlite::types::Value;

/// Optional `LIMIT` / `OFFSET`. An offset without a limit is ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Page {
  pub limit:  Option<u32>,
  pub offset: Option<u32>,
}

impl Page {
  /// No limit: every matching row.
  pub const ALL: Page = Page { limit: None, offset: None };

  pub fn limit(limit: u32) -> Self { Self { limit: Some(limit), offset: None } }

  pub fn with_offset(self, offset: u32) -> Self { Self { offset: Some(offset), ..self } }

  /// Render the clause and push its parameters.
  pub(crate) fn clause(&self, params: &mut Vec<Value>) -> &'static str {
    match (self.limit, self.offset) {
      (None, _) => "",
      (Some(limit), None) => {
        params.push(limit.into());
        "LIMIT ?"
      }
      (Some(limit), Some(offset)) => {
        params.push(limit.into());
        params.push(offset.into());
        "LIMIT ? OFFSET ?"
      }
    }
  }
}
