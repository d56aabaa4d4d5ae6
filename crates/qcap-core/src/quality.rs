//! Image quality scoring and recognition-confidence summaries.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Confidence below which a recognised value is flagged for review.
pub const DEFAULT_LOW_CONFIDENCE: f64 = 0.8;

// ─── Image quality ───────────────────────────────────────────────────────────

/// Combine blur and glare into a single score in `[0, 1]`.
///
/// Each present component contributes `max(0, 1 - x)`; an absent component
/// counts as perfect. The score is the worse of the two.
pub fn quality_score(blur: Option<f64>, glare: Option<f64>) -> f64 {
  let component = |v: Option<f64>| v.map_or(1.0, |v| (1.0 - v).max(0.0));
  component(blur).min(component(glare)).min(1.0)
}

/// Coarse bucket for a quality score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityAssessment {
  Poor,
  Fair,
  Good,
  Excellent,
}

impl QualityAssessment {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Poor => "poor",
      Self::Fair => "fair",
      Self::Good => "good",
      Self::Excellent => "excellent",
    }
  }
}

impl fmt::Display for QualityAssessment {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

pub fn assess_quality(score: f64) -> QualityAssessment {
  if score >= 0.9 {
    QualityAssessment::Excellent
  } else if score >= 0.7 {
    QualityAssessment::Good
  } else if score >= 0.5 {
    QualityAssessment::Fair
  } else {
    QualityAssessment::Poor
  }
}

// ─── Confidence ──────────────────────────────────────────────────────────────

/// Aggregate over a set of recognition confidences.
///
/// Averages and extrema cover present values only; `total_events` counts
/// every event including those without a confidence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceStats {
  pub total_events:    u64,
  pub scored_events:   u64,
  pub average:         Option<f64>,
  pub min:             Option<f64>,
  pub max:             Option<f64>,
  pub below_threshold: u64,
}

/// Summarise confidences held in memory.
pub fn summarize_confidences<I>(confidences: I, threshold: f64) -> ConfidenceStats
where
  I: IntoIterator<Item = Option<f64>>,
{
  let mut stats = ConfidenceStats::default();
  let mut sum = 0.0;
  for conf in confidences {
    stats.total_events += 1;
    let Some(c) = conf else { continue };
    stats.scored_events += 1;
    sum += c;
    stats.min = Some(stats.min.map_or(c, |m| m.min(c)));
    stats.max = Some(stats.max.map_or(c, |m| m.max(c)));
    if c < threshold {
      stats.below_threshold += 1;
    }
  }
  if stats.scored_events > 0 {
    stats.average = Some(sum / stats.scored_events as f64);
  }
  stats
}
