//! Transaction records: one digitised production form per row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Patch, dimensions::format_dimensions};

/// The payload of a transaction record, everything except the surrogate
/// key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordData {
  /// `YYYY-MM-DD`.
  pub date:          Option<String>,
  /// `HH` or `HH:MM`.
  pub hour:          Option<String>,
  pub site:          Option<String>,
  pub form_type:     Option<String>,
  /// Product type as exported to the spreadsheet.
  pub model_code:    Option<String>,

  #[serde(rename = "input_L_mm")]
  pub input_l_mm:    Option<i64>,
  #[serde(rename = "input_W_mm")]
  pub input_w_mm:    Option<i64>,
  #[serde(rename = "input_T_mm")]
  pub input_t_mm:    Option<i64>,
  pub input_count:   Option<i64>,

  #[serde(rename = "output_L_mm")]
  pub output_l_mm:   Option<i64>,
  #[serde(rename = "output_W_mm")]
  pub output_w_mm:   Option<i64>,
  #[serde(rename = "output_T_mm")]
  pub output_t_mm:   Option<i64>,
  pub output_count:  Option<i64>,

  /// Units accepted.
  pub qc_ok:         Option<i64>,
  /// Units rejected.
  pub qc_ng:         Option<i64>,

  pub operator_id:   Option<String>,
  pub batch_no:      Option<String>,
  pub line_id:       Option<String>,
  pub notes:         Option<String>,
  pub img_ref:       Option<String>,
  pub source_img_id: Option<String>,
  pub model_version: Option<String>,
  pub verified:      bool,
  pub created_at:    DateTime<Utc>,
}

impl RecordData {
  /// An empty, unverified record stamped `created_at`.
  pub fn new(created_at: DateTime<Utc>) -> Self {
    Self {
      date: None,
      hour: None,
      site: None,
      form_type: None,
      model_code: None,
      input_l_mm: None,
      input_w_mm: None,
      input_t_mm: None,
      input_count: None,
      output_l_mm: None,
      output_w_mm: None,
      output_t_mm: None,
      output_count: None,
      qc_ok: None,
      qc_ng: None,
      operator_id: None,
      batch_no: None,
      line_id: None,
      notes: None,
      img_ref: None,
      source_img_id: None,
      model_version: None,
      verified: false,
      created_at,
    }
  }

  pub fn input_dimensions(&self) -> Option<String> {
    format_dimensions(self.input_l_mm, self.input_w_mm, self.input_t_mm)
  }

  pub fn output_dimensions(&self) -> Option<String> {
    format_dimensions(self.output_l_mm, self.output_w_mm, self.output_t_mm)
  }
}

/// A persisted transaction record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
  pub id:   i64,
  #[serde(flatten)]
  pub data: RecordData,
}

/// Partial update for a record. `created_at` is fixed at creation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RecordPatch {
  pub date:          Patch<Option<String>>,
  pub hour:          Patch<Option<String>>,
  pub site:          Patch<Option<String>>,
  pub form_type:     Patch<Option<String>>,
  pub model_code:    Patch<Option<String>>,
  #[serde(rename = "input_L_mm")]
  pub input_l_mm:    Patch<Option<i64>>,
  #[serde(rename = "input_W_mm")]
  pub input_w_mm:    Patch<Option<i64>>,
  #[serde(rename = "input_T_mm")]
  pub input_t_mm:    Patch<Option<i64>>,
  pub input_count:   Patch<Option<i64>>,
  #[serde(rename = "output_L_mm")]
  pub output_l_mm:   Patch<Option<i64>>,
  #[serde(rename = "output_W_mm")]
  pub output_w_mm:   Patch<Option<i64>>,
  #[serde(rename = "output_T_mm")]
  pub output_t_mm:   Patch<Option<i64>>,
  pub output_count:  Patch<Option<i64>>,
  pub qc_ok:         Patch<Option<i64>>,
  pub qc_ng:         Patch<Option<i64>>,
  pub operator_id:   Patch<Option<String>>,
  pub batch_no:      Patch<Option<String>>,
  pub line_id:       Patch<Option<String>>,
  pub notes:         Patch<Option<String>>,
  pub img_ref:       Patch<Option<String>>,
  pub source_img_id: Patch<Option<String>>,
  pub model_version: Patch<Option<String>>,
  pub verified:      Patch<bool>,
}

/// Totals over a set of records, computed by the store.
///
/// Sums treat NULL as zero; `avg_output_count` covers non-NULL values
/// only and is `None` when there are none.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordStats {
  pub total_records:      u64,
  pub verified_records:   u64,
  pub total_input_count:  i64,
  pub total_output_count: i64,
  pub total_qc_ok:        i64,
  pub total_qc_ng:        i64,
  pub avg_output_count:   Option<f64>,
}
