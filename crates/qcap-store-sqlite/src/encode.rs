//! Encoding and decoding between domain types and SQLite column values.
//!
//! Timestamps are RFC 3339 UTC strings with millisecond precision and a
//! `Z` suffix, so string order is chronological order. Region maps and
//! homographies are JSON; an unparseable stored value is logged and read
//! back as absent rather than failing the whole read.

use chrono::{DateTime, SecondsFormat, Utc};
use qcap_core::{
  codec::{parse_matrix, parse_roi_map, stringify_matrix, stringify_roi_map, Matrix},
  image::Image,
  recognition::{RecognitionEvent, RecognitionEventData},
  record::{Record, RecordData},
  template::{RoiMap, Template},
};
use rusqlite::types::Value;
use tracing::warn;

use crate::{Error, Result, handle::SqlRow};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|source| Error::Timestamp {
      value: s.to_owned(),
      source,
    })
}

fn dt_column(row: &SqlRow, column: &str) -> Result<DateTime<Utc>> {
  decode_dt(&row.get::<String>(column)?)
}

fn opt_dt_column(row: &SqlRow, column: &str) -> Result<Option<DateTime<Utc>>> {
  row
    .get::<Option<String>>(column)?
    .as_deref()
    .map(decode_dt)
    .transpose()
}

pub fn encode_matrix(m: Option<&Matrix>) -> Result<Value> {
  Ok(match m {
    Some(m) => Value::Text(stringify_matrix(m)?),
    None => Value::Null,
  })
}

pub fn encode_roi_map(map: &RoiMap) -> Result<Value> {
  Ok(Value::Text(stringify_roi_map(map)?))
}

// ─── Templates ───────────────────────────────────────────────────────────────

pub const TEMPLATE_COLUMNS: &str = "template_id, version, roi_map_json";

pub fn template_from_row(row: &SqlRow) -> Result<Template> {
  let template_id: String = row.get("template_id")?;
  let roi_map_json: String = row.get("roi_map_json")?;
  let roi_map = parse_roi_map(&roi_map_json).unwrap_or_else(|| {
    warn!(%template_id, "unparseable region map; reading as empty");
    RoiMap::default()
  });
  Ok(Template {
    version: row.get("version")?,
    template_id,
    roi_map,
  })
}

// ─── Images ──────────────────────────────────────────────────────────────────

pub const IMAGE_COLUMNS: &str =
  "img_id, uri, rectified_uri, template_id, homography, blur, glare, created_at";

pub fn image_params(image: &Image) -> Result<Vec<Value>> {
  Ok(vec![
    image.img_id.clone().into(),
    image.uri.clone().into(),
    image.rectified_uri.clone().into(),
    image.template_id.clone().into(),
    encode_matrix(image.homography.as_ref())?,
    image.blur.into(),
    image.glare.into(),
    encode_dt(image.created_at).into(),
  ])
}

pub fn image_from_row(row: &SqlRow) -> Result<Image> {
  let img_id: String = row.get("img_id")?;
  let homography = row
    .get::<Option<String>>("homography")?
    .and_then(|text| {
      let parsed = parse_matrix(&text);
      if parsed.is_none() {
        warn!(%img_id, "unparseable homography; reading as absent");
      }
      parsed
    });
  Ok(Image {
    uri: row.get("uri")?,
    rectified_uri: row.get("rectified_uri")?,
    template_id: row.get("template_id")?,
    homography,
    blur: row.get("blur")?,
    glare: row.get("glare")?,
    created_at: dt_column(row, "created_at")?,
    img_id,
  })
}

// ─── Records ─────────────────────────────────────────────────────────────────

pub const RECORD_COLUMNS: &str = "id, date, hour, site, form_type, model_code, \
  input_L_mm, input_W_mm, input_T_mm, input_count, \
  output_L_mm, output_W_mm, output_T_mm, output_count, \
  qc_ok, qc_ng, operator_id, batch_no, line_id, notes, img_ref, \
  source_img_id, model_version, verified, created_at";

/// Insert column list; `id` is assigned by SQLite.
pub const RECORD_INSERT_COLUMNS: &str = "date, hour, site, form_type, model_code, \
  input_L_mm, input_W_mm, input_T_mm, input_count, \
  output_L_mm, output_W_mm, output_T_mm, output_count, \
  qc_ok, qc_ng, operator_id, batch_no, line_id, notes, img_ref, \
  source_img_id, model_version, verified, created_at";

pub fn record_params(d: &RecordData) -> Vec<Value> {
  vec![
    d.date.clone().into(),
    d.hour.clone().into(),
    d.site.clone().into(),
    d.form_type.clone().into(),
    d.model_code.clone().into(),
    d.input_l_mm.into(),
    d.input_w_mm.into(),
    d.input_t_mm.into(),
    d.input_count.into(),
    d.output_l_mm.into(),
    d.output_w_mm.into(),
    d.output_t_mm.into(),
    d.output_count.into(),
    d.qc_ok.into(),
    d.qc_ng.into(),
    d.operator_id.clone().into(),
    d.batch_no.clone().into(),
    d.line_id.clone().into(),
    d.notes.clone().into(),
    d.img_ref.clone().into(),
    d.source_img_id.clone().into(),
    d.model_version.clone().into(),
    d.verified.into(),
    encode_dt(d.created_at).into(),
  ]
}

pub fn record_from_row(row: &SqlRow) -> Result<Record> {
  Ok(Record {
    id:   row.get("id")?,
    data: RecordData {
      date:          row.get("date")?,
      hour:          row.get("hour")?,
      site:          row.get("site")?,
      form_type:     row.get("form_type")?,
      model_code:    row.get("model_code")?,
      input_l_mm:    row.get("input_L_mm")?,
      input_w_mm:    row.get("input_W_mm")?,
      input_t_mm:    row.get("input_T_mm")?,
      input_count:   row.get("input_count")?,
      output_l_mm:   row.get("output_L_mm")?,
      output_w_mm:   row.get("output_W_mm")?,
      output_t_mm:   row.get("output_T_mm")?,
      output_count:  row.get("output_count")?,
      qc_ok:         row.get("qc_ok")?,
      qc_ng:         row.get("qc_ng")?,
      operator_id:   row.get("operator_id")?,
      batch_no:      row.get("batch_no")?,
      line_id:       row.get("line_id")?,
      notes:         row.get("notes")?,
      img_ref:       row.get("img_ref")?,
      source_img_id: row.get("source_img_id")?,
      model_version: row.get("model_version")?,
      verified:      row.get::<Option<bool>>("verified")?.unwrap_or(false),
      created_at:    dt_column(row, "created_at")?,
    },
  })
}

// ─── Recognition events ──────────────────────────────────────────────────────

pub const EVENT_COLUMNS: &str =
  "id, img_id, field_id, raw_text, value, conf, corrected, created_at";

pub const EVENT_INSERT_COLUMNS: &str =
  "img_id, field_id, raw_text, value, conf, corrected, created_at";

pub fn event_params(d: &RecognitionEventData) -> Vec<Value> {
  vec![
    d.img_id.clone().into(),
    d.field_id.clone().into(),
    d.raw_text.clone().into(),
    d.value.clone().into(),
    d.conf.into(),
    d.corrected.into(),
    d.created_at.map(encode_dt).into(),
  ]
}

pub fn event_from_row(row: &SqlRow) -> Result<RecognitionEvent> {
  Ok(RecognitionEvent {
    id:   row.get("id")?,
    data: RecognitionEventData {
      img_id:     row.get("img_id")?,
      field_id:   row.get("field_id")?,
      raw_text:   row.get("raw_text")?,
      value:      row.get("value")?,
      conf:       row.get("conf")?,
      corrected:  row.get::<Option<bool>>("corrected")?.unwrap_or(false),
      created_at: opt_dt_column(row, "created_at")?,
    },
  })
}

/// Placeholder list `?, ?, …` for `n` parameters.
pub fn placeholders(n: usize) -> String { vec!["?"; n].join(", ") }
