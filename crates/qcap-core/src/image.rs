//! Captured form images.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Patch, codec::Matrix, quality::quality_score};

/// One captured photograph of a form. Identity is the natural key `img_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
  pub img_id:        String,
  /// Where the original capture lives.
  pub uri:           String,
  /// Where the perspective-corrected page lives, once rectified.
  pub rectified_uri: Option<String>,
  pub template_id:   Option<String>,
  /// 3×3 transform from capture to rectified coordinates.
  pub homography:    Option<Matrix>,
  pub blur:          Option<f64>,
  pub glare:         Option<f64>,
  pub created_at:    DateTime<Utc>,
}

impl Image {
  /// A freshly captured image with no derived data yet.
  pub fn new(
    img_id: impl Into<String>,
    uri: impl Into<String>,
    created_at: DateTime<Utc>,
  ) -> Self {
    Self {
      img_id: img_id.into(),
      uri: uri.into(),
      rectified_uri: None,
      template_id: None,
      homography: None,
      blur: None,
      glare: None,
      created_at,
    }
  }

  /// A new natural key for capture code that has none.
  pub fn generate_id() -> String { format!("img_{}", Uuid::new_v4().simple()) }

  pub fn quality_score(&self) -> f64 { quality_score(self.blur, self.glare) }

  pub fn is_rectified(&self) -> bool { self.rectified_uri.is_some() }
}

/// Partial update for an image, written as rectification and quality
/// analysis complete.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ImagePatch {
  pub uri:           Patch<String>,
  pub rectified_uri: Patch<Option<String>>,
  pub template_id:   Patch<Option<String>>,
  pub homography:    Patch<Option<Matrix>>,
  pub blur:          Patch<Option<f64>>,
  pub glare:         Patch<Option<f64>>,
}

impl ImagePatch {
  pub fn is_empty(&self) -> bool {
    self.uri.is_keep()
      && self.rectified_uri.is_keep()
      && self.template_id.is_keep()
      && self.homography.is_keep()
      && self.blur.is_keep()
      && self.glare.is_keep()
  }
}
