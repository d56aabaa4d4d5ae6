//! Validation of captured rows before (and while) they are edited.
//!
//! Validation never fails: every check produces a [`ValidationIssue`] and
//! the caller decides what to do with the [`ValidationReport`]. Candidates
//! are loosely typed on purpose. Numbers arrive as `f64` so fractional
//! counts can be reported, and flags as `i64` so values other than 0/1 can
//! be reported.
//!
//! Issue order: per-field checks in field declaration order, then
//! cross-field checks.

use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat};
use serde::{Deserialize, Serialize};

use crate::{
  codec::{Matrix, is_homography},
  image::Image,
  quality::{QualityAssessment, assess_quality, quality_score},
  recognition::RecognitionEvent,
  record::Record,
  template::{Template, ValueType},
};

// ─── Issues ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
  Error,
  Warning,
  Info,
}

/// Machine-readable issue code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueCode {
  Required,
  NonNegative,
  IntegerRequired,
  Format,
  Range,
  SumMismatch,
  InconsistentDimensions,
  Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
  pub field:    String,
  pub severity: Severity,
  pub code:     IssueCode,
  pub message:  String,
}

/// The outcome of validating one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
  pub issues:           Vec<ValidationIssue>,
  /// No issue has severity `error`.
  pub is_valid:         bool,
  /// `Some` for records only: whether `qc_ok + qc_ng == output_count` with
  /// all three present.
  pub hard_gate_passed: Option<bool>,
}

impl ValidationReport {
  pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
    self.issues.iter().filter(|i| i.severity == Severity::Error)
  }

  pub fn has_code(&self, code: IssueCode) -> bool {
    self.issues.iter().any(|i| i.code == code)
  }

  /// Issues reported against `field`.
  pub fn for_field<'a>(
    &'a self,
    field: &'a str,
  ) -> impl Iterator<Item = &'a ValidationIssue> + 'a {
    self.issues.iter().filter(move |i| i.field == field)
  }
}

#[derive(Default)]
struct Issues(Vec<ValidationIssue>);

impl Issues {
  fn push(
    &mut self,
    field: &str,
    severity: Severity,
    code: IssueCode,
    message: impl Into<String>,
  ) {
    self.0.push(ValidationIssue {
      field: field.to_owned(),
      severity,
      code,
      message: message.into(),
    });
  }

  fn error(&mut self, field: &str, code: IssueCode, message: impl Into<String>) {
    self.push(field, Severity::Error, code, message);
  }

  fn warning(&mut self, field: &str, code: IssueCode, message: impl Into<String>) {
    self.push(field, Severity::Warning, code, message);
  }

  fn info(&mut self, field: &str, code: IssueCode, message: impl Into<String>) {
    self.push(field, Severity::Info, code, message);
  }

  fn finish(self, hard_gate_passed: Option<bool>) -> ValidationReport {
    let is_valid = !self.0.iter().any(|i| i.severity == Severity::Error);
    ValidationReport { issues: self.0, is_valid, hard_gate_passed }
  }

  // ── Shared field rules ───────────────────────────────────────────────────

  fn created_at(&mut self, value: Option<&str>) {
    match value {
      None => self.error("created_at", IssueCode::Required, "created_at is required"),
      Some(s) if DateTime::parse_from_rfc3339(s).is_err() => self.error(
        "created_at",
        IssueCode::Format,
        format!("created_at {s:?} is not an RFC 3339 timestamp"),
      ),
      Some(_) => {}
    }
  }

  fn required_text(&mut self, field: &str, value: Option<&str>) {
    if value.is_none_or(|s| s.trim().is_empty()) {
      self.error(field, IssueCode::Required, format!("{field} is required"));
    }
  }

  /// Returns the value when it is usable in cross-field checks.
  fn non_negative(&mut self, field: &str, value: Option<f64>) -> Option<f64> {
    let v = value?;
    if !v.is_finite() {
      self.error(field, IssueCode::Format, format!("{field} must be a finite number"));
      return None;
    }
    if v < 0.0 {
      self.error(
        field,
        IssueCode::NonNegative,
        format!("{field} must not be negative (got {v})"),
      );
      return None;
    }
    Some(v)
  }

  fn non_negative_integer(&mut self, field: &str, value: Option<f64>) -> Option<f64> {
    let v = self.non_negative(field, value)?;
    if v.fract() != 0.0 {
      self.error(
        field,
        IssueCode::IntegerRequired,
        format!("{field} must be a whole number (got {v})"),
      );
      return None;
    }
    Some(v)
  }

  fn flag(&mut self, field: &str, value: Option<i64>) {
    if let Some(v) = value
      && v != 0
      && v != 1
    {
      self.error(field, IssueCode::Range, format!("{field} must be 0 or 1 (got {v})"));
    }
  }
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// A record as captured or edited, before it is known to be valid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordCandidate {
  pub date:          Option<String>,
  pub hour:          Option<String>,
  pub site:          Option<String>,
  pub form_type:     Option<String>,
  pub model_code:    Option<String>,
  #[serde(rename = "input_L_mm")]
  pub input_l_mm:    Option<f64>,
  #[serde(rename = "input_W_mm")]
  pub input_w_mm:    Option<f64>,
  #[serde(rename = "input_T_mm")]
  pub input_t_mm:    Option<f64>,
  pub input_count:   Option<f64>,
  #[serde(rename = "output_L_mm")]
  pub output_l_mm:   Option<f64>,
  #[serde(rename = "output_W_mm")]
  pub output_w_mm:   Option<f64>,
  #[serde(rename = "output_T_mm")]
  pub output_t_mm:   Option<f64>,
  pub output_count:  Option<f64>,
  pub qc_ok:         Option<f64>,
  pub qc_ng:         Option<f64>,
  pub operator_id:   Option<String>,
  pub batch_no:      Option<String>,
  pub line_id:       Option<String>,
  pub notes:         Option<String>,
  pub img_ref:       Option<String>,
  pub source_img_id: Option<String>,
  pub model_version: Option<String>,
  pub verified:      Option<i64>,
  pub created_at:    Option<String>,
}

fn int(v: Option<i64>) -> Option<f64> { v.map(|v| v as f64) }

impl From<&Record> for RecordCandidate {
  fn from(record: &Record) -> Self {
    let d = &record.data;
    Self {
      date:          d.date.clone(),
      hour:          d.hour.clone(),
      site:          d.site.clone(),
      form_type:     d.form_type.clone(),
      model_code:    d.model_code.clone(),
      input_l_mm:    int(d.input_l_mm),
      input_w_mm:    int(d.input_w_mm),
      input_t_mm:    int(d.input_t_mm),
      input_count:   int(d.input_count),
      output_l_mm:   int(d.output_l_mm),
      output_w_mm:   int(d.output_w_mm),
      output_t_mm:   int(d.output_t_mm),
      output_count:  int(d.output_count),
      qc_ok:         int(d.qc_ok),
      qc_ng:         int(d.qc_ng),
      operator_id:   d.operator_id.clone(),
      batch_no:      d.batch_no.clone(),
      line_id:       d.line_id.clone(),
      notes:         d.notes.clone(),
      img_ref:       d.img_ref.clone(),
      source_img_id: d.source_img_id.clone(),
      model_version: d.model_version.clone(),
      verified:      Some(i64::from(d.verified)),
      created_at:    Some(d.created_at.to_rfc3339_opts(SecondsFormat::Millis, true)),
    }
  }
}

/// Accepted plus rejected units must equal the output count.
///
/// Fails closed: if any of the three is absent the gate has not passed.
pub fn hard_gate(qc_ok: Option<f64>, qc_ng: Option<f64>, output_count: Option<f64>) -> bool {
  match (qc_ok, qc_ng, output_count) {
    (Some(ok), Some(ng), Some(out)) => ok + ng == out,
    _ => false,
  }
}

fn is_valid_hour(hour: &str) -> bool {
  let hour = hour.trim();
  if hour.contains(':') {
    return NaiveTime::parse_from_str(hour, "%H:%M").is_ok();
  }
  matches!(hour.len(), 1 | 2) && hour.parse::<u8>().is_ok_and(|h| h < 24)
}

pub fn validate_record(record: &RecordCandidate) -> ValidationReport {
  let mut issues = Issues::default();

  if let Some(date) = &record.date
    && NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").is_err()
  {
    issues.error("date", IssueCode::Format, format!("date {date:?} is not YYYY-MM-DD"));
  }
  if let Some(hour) = &record.hour
    && !is_valid_hour(hour)
  {
    issues.error("hour", IssueCode::Format, format!("hour {hour:?} is not HH or HH:MM"));
  }

  let input_l = issues.non_negative_integer("input_L_mm", record.input_l_mm);
  let input_w = issues.non_negative_integer("input_W_mm", record.input_w_mm);
  let input_t = issues.non_negative_integer("input_T_mm", record.input_t_mm);
  let input_count = issues.non_negative_integer("input_count", record.input_count);
  let output_l = issues.non_negative_integer("output_L_mm", record.output_l_mm);
  let output_w = issues.non_negative_integer("output_W_mm", record.output_w_mm);
  let output_t = issues.non_negative_integer("output_T_mm", record.output_t_mm);
  let output_count = issues.non_negative_integer("output_count", record.output_count);
  let qc_ok = issues.non_negative_integer("qc_ok", record.qc_ok);
  let qc_ng = issues.non_negative_integer("qc_ng", record.qc_ng);

  issues.flag("verified", record.verified);
  issues.created_at(record.created_at.as_deref());

  // Output pieces are cut from input stock, so they cannot grow.
  let pairs = [
    ("output_L_mm", output_l, input_l),
    ("output_W_mm", output_w, input_w),
    ("output_T_mm", output_t, input_t),
    ("output_count", output_count, input_count),
  ];
  for (field, output, input) in pairs {
    if let (Some(out), Some(inp)) = (output, input)
      && out > inp
    {
      issues.warning(
        field,
        IssueCode::InconsistentDimensions,
        format!("{field} ({out}) exceeds its input counterpart ({inp})"),
      );
    }
  }

  // Terms that failed their own rule count as absent, so the gate fails.
  let gate = hard_gate(qc_ok, qc_ng, output_count);
  match (qc_ok, qc_ng, output_count) {
    (Some(ok), Some(ng), Some(out)) if !gate => issues.error(
      "qc_ng",
      IssueCode::SumMismatch,
      format!("qc_ok + qc_ng = {} but output_count = {out}", ok + ng),
    ),
    _ => {
      let present = [
        ("qc_ok", record.qc_ok),
        ("qc_ng", record.qc_ng),
        ("output_count", record.output_count),
      ];
      if present.iter().any(|(_, v)| v.is_some()) {
        for (field, _) in present.iter().filter(|(_, v)| v.is_none()) {
          issues.info(
            field,
            IssueCode::Required,
            format!("{field} is needed to check qc_ok + qc_ng = output_count"),
          );
        }
      }
    }
  }

  issues.finish(Some(gate))
}

// ─── Images ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageCandidate {
  pub img_id:        Option<String>,
  pub uri:           Option<String>,
  pub rectified_uri: Option<String>,
  pub template_id:   Option<String>,
  pub homography:    Option<Matrix>,
  pub blur:          Option<f64>,
  pub glare:         Option<f64>,
  pub created_at:    Option<String>,
}

impl From<&Image> for ImageCandidate {
  fn from(image: &Image) -> Self {
    Self {
      img_id:        Some(image.img_id.clone()),
      uri:           Some(image.uri.clone()),
      rectified_uri: image.rectified_uri.clone(),
      template_id:   image.template_id.clone(),
      homography:    image.homography.clone(),
      blur:          image.blur,
      glare:         image.glare,
      created_at:    Some(image.created_at.to_rfc3339_opts(SecondsFormat::Millis, true)),
    }
  }
}

pub fn validate_image(image: &ImageCandidate) -> ValidationReport {
  let mut issues = Issues::default();

  issues.required_text("img_id", image.img_id.as_deref());
  issues.required_text("uri", image.uri.as_deref());
  if let Some(h) = &image.homography
    && !is_homography(h)
  {
    issues.error("homography", IssueCode::Format, "homography must be a finite 3x3 matrix");
  }
  let blur = issues.non_negative("blur", image.blur);
  let glare = issues.non_negative("glare", image.glare);
  issues.created_at(image.created_at.as_deref());

  if blur.is_some() || glare.is_some() {
    let score = quality_score(blur, glare);
    if assess_quality(score) == QualityAssessment::Poor {
      issues.warning(
        "quality",
        IssueCode::Range,
        format!("image quality is poor (score {score:.2}); consider recapturing"),
      );
    }
  }

  issues.finish(None)
}

// ─── Recognition events ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionEventCandidate {
  pub img_id:     Option<String>,
  pub field_id:   Option<String>,
  pub raw_text:   Option<String>,
  pub value:      Option<String>,
  pub conf:       Option<f64>,
  pub corrected:  Option<i64>,
  pub created_at: Option<String>,
}

impl From<&RecognitionEvent> for RecognitionEventCandidate {
  fn from(event: &RecognitionEvent) -> Self {
    let d = &event.data;
    Self {
      img_id:     d.img_id.clone(),
      field_id:   d.field_id.clone(),
      raw_text:   d.raw_text.clone(),
      value:      d.value.clone(),
      conf:       d.conf,
      corrected:  Some(i64::from(d.corrected)),
      created_at: d
        .created_at
        .map(|at| at.to_rfc3339_opts(SecondsFormat::Millis, true)),
    }
  }
}

/// Validate a recognition event, optionally against the template whose
/// regions it should belong to.
///
/// Confidences strictly below `low_confidence` are reported as info so the
/// value can be reviewed.
pub fn validate_recognition_event(
  event: &RecognitionEventCandidate,
  template: Option<&Template>,
  low_confidence: f64,
) -> ValidationReport {
  let mut issues = Issues::default();

  if let Some(field_id) = &event.field_id
    && let Some(template) = template
  {
    match template.roi_map.region(field_id) {
      None => issues.warning(
        "field_id",
        IssueCode::Unknown,
        format!(
          "field {field_id:?} is not a region of template {:?}",
          template.template_id
        ),
      ),
      Some(region) => {
        if let Some(value) = &event.value {
          if region.value_type == ValueType::Select
            && !region.options.is_empty()
            && !region.options.iter().any(|o| o == value)
          {
            issues.warning(
              "value",
              IssueCode::Unknown,
              format!("{value:?} is not one of the options for {field_id:?}"),
            );
          } else if !region.value_type.accepts(value) {
            issues.warning(
              "value",
              IssueCode::Format,
              format!("{value:?} is not a valid {:?} value", region.value_type),
            );
          }
        }
      }
    }
  }

  match event.conf {
    Some(c) if !c.is_finite() => {
      issues.error("conf", IssueCode::Format, "conf must be a finite number");
    }
    Some(c) if !(0.0..=1.0).contains(&c) => {
      issues.error("conf", IssueCode::Range, format!("conf must lie in [0, 1] (got {c})"));
    }
    Some(c) if c < low_confidence => issues.info(
      "conf",
      IssueCode::Range,
      format!("low recognition confidence {c:.2}; review suggested"),
    ),
    _ => {}
  }

  issues.flag("corrected", event.corrected);
  issues.created_at(event.created_at.as_deref());

  issues.finish(None)
}
