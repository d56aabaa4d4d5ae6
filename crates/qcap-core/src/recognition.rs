//! Per-field recognition events.
//!
//! The recogniser is a black box that yields [`FieldRecognition`] values;
//! each becomes one recognition event attributed to an image. After
//! creation only the correction workflow touches an event, and it never
//! rewrites `raw_text` or `conf`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Patch;

/// What the recogniser produced for one field of one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRecognition {
  pub field_id: String,
  pub raw_text: Option<String>,
  /// Normalised value, e.g. digits extracted from `raw_text`.
  pub value:    Option<String>,
  /// Recogniser confidence in `[0, 1]`.
  pub conf:     Option<f64>,
}

/// The payload of a recognition event, everything except the surrogate
/// key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionEventData {
  pub img_id:     Option<String>,
  pub field_id:   Option<String>,
  pub raw_text:   Option<String>,
  pub value:      Option<String>,
  pub conf:       Option<f64>,
  pub corrected:  bool,
  pub created_at: Option<DateTime<Utc>>,
}

impl RecognitionEventData {
  /// Attribute a recogniser result to `img_id`.
  pub fn from_recognition(
    img_id: impl Into<String>,
    recognition: FieldRecognition,
    created_at: DateTime<Utc>,
  ) -> Self {
    Self {
      img_id:     Some(img_id.into()),
      field_id:   Some(recognition.field_id),
      raw_text:   recognition.raw_text,
      value:      recognition.value,
      conf:       recognition.conf,
      corrected:  false,
      created_at: Some(created_at),
    }
  }
}

/// A persisted recognition event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionEvent {
  pub id:   i64,
  #[serde(flatten)]
  pub data: RecognitionEventData,
}

/// Partial update for a recognition event: the correction workflow only.
///
/// Attribution (`img_id`, `field_id`) and recogniser output (`raw_text`,
/// `conf`) are fixed at creation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RecognitionEventPatch {
  pub value:     Patch<Option<String>>,
  pub corrected: Patch<bool>,
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn recognition_becomes_uncorrected_event() {
    let at = Utc.with_ymd_and_hms(2024, 3, 4, 5, 6, 7).unwrap();
    let data = RecognitionEventData::from_recognition(
      "img_1",
      FieldRecognition {
        field_id: "qc_ok".into(),
        raw_text: Some("7 pcs".into()),
        value:    Some("7".into()),
        conf:     Some(0.93),
      },
      at,
    );
    assert_eq!(data.img_id.as_deref(), Some("img_1"));
    assert_eq!(data.field_id.as_deref(), Some("qc_ok"));
    assert!(!data.corrected);
    assert_eq!(data.created_at, Some(at));
  }

  #[test]
  fn patch_ignores_recogniser_and_attribution_fields() {
    let patch: RecognitionEventPatch =
      serde_json::from_str(r#"{ "value": "8", "conf": 1.0, "img_id": "img_2" }"#).unwrap();
    assert_eq!(patch.value, Patch::Set(Some("8".into())));
    assert!(patch.corrected.is_keep());
  }
}
