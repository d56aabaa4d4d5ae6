//! Form templates and their region maps.
//!
//! A template describes one printed form layout: which regions of the
//! rectified page hold which logical fields, and how each region should be
//! read.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::{Patch, dimensions::parse_dimensions};

// ─── Region classification ───────────────────────────────────────────────────

/// How a region is captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
  Ocr,
  Barcode,
  Checkbox,
  Signature,
  Photo,
  Textfield,
}

/// The type of value a region yields once recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
  String,
  Number,
  Integer,
  Date,
  Time,
  Select,
  Dimension,
  Count,
  Boolean,
}

impl ValueType {
  /// Whether `text` is a well-formed value of this type.
  ///
  /// `Select` only checks shape here; membership in a region's options is
  /// checked against the region itself.
  pub fn accepts(self, text: &str) -> bool {
    let text = text.trim();
    match self {
      Self::String | Self::Select => true,
      Self::Number => text.parse::<f64>().is_ok_and(f64::is_finite),
      Self::Integer => text.parse::<i64>().is_ok(),
      Self::Count => text.parse::<u64>().is_ok(),
      Self::Date => NaiveDate::parse_from_str(text, "%Y-%m-%d").is_ok(),
      Self::Time => NaiveTime::parse_from_str(text, "%H:%M").is_ok(),
      Self::Dimension => parse_dimensions(text).is_some(),
      Self::Boolean => matches!(
        text.to_ascii_lowercase().as_str(),
        "true" | "false" | "1" | "0" | "yes" | "no"
      ),
    }
  }
}

// ─── Geometry ────────────────────────────────────────────────────────────────

/// The outline of a region, in rectified-page pixel coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegionShape {
  Rect {
    x:        f64,
    y:        f64,
    w:        f64,
    h:        f64,
    /// Clockwise rotation in degrees about the rectangle's centre.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rotation: Option<f64>,
  },
  Polygon {
    points: Vec<[f64; 2]>,
  },
}

impl RegionShape {
  /// Axis-aligned bounding box as `(x, y, w, h)`, ignoring rotation.
  pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
    match self {
      Self::Rect { x, y, w, h, .. } => Some((*x, *y, *w, *h)),
      Self::Polygon { points } => {
        let (first, rest) = points.split_first()?;
        let (mut min_x, mut min_y) = (first[0], first[1]);
        let (mut max_x, mut max_y) = (first[0], first[1]);
        for [px, py] in rest {
          min_x = min_x.min(*px);
          min_y = min_y.min(*py);
          max_x = max_x.max(*px);
          max_y = max_y.max(*py);
        }
        Some((min_x, min_y, max_x - min_x, max_y - min_y))
      }
    }
  }
}

// ─── Regions ─────────────────────────────────────────────────────────────────

/// One named capture region of a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
  /// Logical field key; recognition events refer to regions by this id.
  pub field_id:   String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub label:      Option<String>,
  pub target:     TargetKind,
  pub value_type: ValueType,
  pub shape:      RegionShape,
  /// Allowed values for `select` regions.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub options:    Vec<String>,
}

/// The ordered list of regions defined for a template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoiMap {
  pub regions: Vec<Region>,
}

impl RoiMap {
  pub fn new(regions: Vec<Region>) -> Self { Self { regions } }

  pub fn is_empty(&self) -> bool { self.regions.is_empty() }

  pub fn len(&self) -> usize { self.regions.len() }

  pub fn region(&self, field_id: &str) -> Option<&Region> {
    self.regions.iter().find(|r| r.field_id == field_id)
  }

  pub fn field_ids(&self) -> impl Iterator<Item = &str> {
    self.regions.iter().map(|r| r.field_id.as_str())
  }
}

// ─── Template ────────────────────────────────────────────────────────────────

/// A registered form layout. Identity is the natural key `template_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
  pub template_id: String,
  pub version:     String,
  pub roi_map:     RoiMap,
}

impl Template {
  pub fn new(
    template_id: impl Into<String>,
    version: impl Into<String>,
    roi_map: RoiMap,
  ) -> Self {
    Self {
      template_id: template_id.into(),
      version: version.into(),
      roi_map,
    }
  }
}

/// Partial update for a template; the region map is replaced wholesale.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TemplatePatch {
  pub version: Patch<String>,
  pub roi_map: Patch<RoiMap>,
}

impl TemplatePatch {
  pub fn is_empty(&self) -> bool {
    self.version.is_keep() && self.roi_map.is_keep()
  }
}
