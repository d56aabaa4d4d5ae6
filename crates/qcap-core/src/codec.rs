//! Text encodings for structured column values.
//!
//! Homographies and region maps are opaque strings at the storage
//! boundary. Both are stored as compact JSON. Readers never fail hard on a
//! malformed value: the `parse_*` functions return `None` and leave the
//! decision to the caller.

use crate::{Error, Result, template::RoiMap};

/// A row-major numeric matrix. Homographies are 3×3.
pub type Matrix = Vec<Vec<f64>>;

/// Encode a matrix as a JSON array of rows.
///
/// Rejects ragged input and non-finite entries (JSON would write them as
/// `null`) so every stored matrix parses back unchanged.
pub fn stringify_matrix(matrix: &[Vec<f64>]) -> Result<String> {
  check_rectangular(matrix)?;
  check_finite(matrix)?;
  Ok(serde_json::to_string(matrix)?)
}

/// Decode a matrix; `None` when the text is not a rectangular numeric
/// matrix.
pub fn parse_matrix(text: &str) -> Option<Matrix> {
  let matrix: Matrix = serde_json::from_str(text).ok()?;
  check_rectangular(&matrix).ok()?;
  Some(matrix)
}

/// Whether `matrix` is exactly 3×3 with finite entries.
pub fn is_homography(matrix: &[Vec<f64>]) -> bool {
  matrix.len() == 3
    && matrix
      .iter()
      .all(|row| row.len() == 3 && row.iter().all(|v| v.is_finite()))
}

fn check_rectangular(matrix: &[Vec<f64>]) -> Result<()> {
  let Some(expected) = matrix.first().map(Vec::len) else {
    return Ok(());
  };
  match matrix.iter().position(|row| row.len() != expected) {
    Some(row) => Err(Error::RaggedMatrix {
      row,
      found: matrix[row].len(),
      expected,
    }),
    None => Ok(()),
  }
}

fn check_finite(matrix: &[Vec<f64>]) -> Result<()> {
  for (row, values) in matrix.iter().enumerate() {
    if let Some(col) = values.iter().position(|v| !v.is_finite()) {
      return Err(Error::NonFiniteMatrix { row, col });
    }
  }
  Ok(())
}

pub fn stringify_roi_map(roi_map: &RoiMap) -> Result<String> {
  Ok(serde_json::to_string(roi_map)?)
}

/// Decode a region map; `None` when the text is not a valid region list.
pub fn parse_roi_map(text: &str) -> Option<RoiMap> {
  serde_json::from_str(text).ok()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::template::{Region, RegionShape, TargetKind, ValueType};

  #[test]
  fn matrix_survives_a_round_trip() {
    let h = vec![
      vec![1.0234567891234, -0.000012, 13.5],
      vec![0.1, 0.98, -7.25],
      vec![1e-7, -3.3e-6, 1.0],
    ];
    let text = stringify_matrix(&h).unwrap();
    assert_eq!(parse_matrix(&text), Some(h));
  }

  #[test]
  fn non_square_matrices_round_trip_too() {
    let m = vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]];
    assert_eq!(parse_matrix(&stringify_matrix(&m).unwrap()), Some(m));
  }

  #[test]
  fn ragged_matrix_is_rejected_both_ways() {
    let ragged = vec![vec![1.0, 2.0], vec![3.0]];
    assert!(matches!(
      stringify_matrix(&ragged),
      Err(Error::RaggedMatrix { row: 1, found: 1, expected: 2 })
    ));
    assert_eq!(parse_matrix("[[1,2],[3]]"), None);
  }

  #[test]
  fn non_finite_entries_are_rejected() {
    assert!(matches!(
      stringify_matrix(&[vec![f64::INFINITY, 1.0]]),
      Err(Error::NonFiniteMatrix { row: 0, col: 0 })
    ));
    assert!(matches!(
      stringify_matrix(&[vec![1.0, 0.0], vec![0.0, f64::NAN]]),
      Err(Error::NonFiniteMatrix { row: 1, col: 1 })
    ));
  }

  #[test]
  fn malformed_text_parses_to_none() {
    assert_eq!(parse_matrix("not json"), None);
    assert_eq!(parse_matrix(r#"[["a"]]"#), None);
    assert_eq!(parse_roi_map("{"), None);
    assert_eq!(parse_roi_map(r#"[{"field_id": "x"}]"#), None);
  }

  #[test]
  fn homography_shape_check() {
    let identity = vec![
      vec![1.0, 0.0, 0.0],
      vec![0.0, 1.0, 0.0],
      vec![0.0, 0.0, 1.0],
    ];
    assert!(is_homography(&identity));
    assert!(!is_homography(&identity[..2]));
    assert!(!is_homography(&[
      vec![f64::NAN, 0.0, 0.0],
      vec![0.0, 1.0, 0.0],
      vec![0.0, 0.0, 1.0],
    ]));
  }

  #[test]
  fn roi_map_keeps_region_order_and_fields() {
    let map = RoiMap::new(vec![
      Region {
        field_id:   "output_count".into(),
        label:      Some("Output".into()),
        target:     TargetKind::Ocr,
        value_type: ValueType::Count,
        shape:      RegionShape::Rect {
          x:        10.0,
          y:        20.0,
          w:        100.0,
          h:        30.0,
          rotation: Some(1.5),
        },
        options:    vec![],
      },
      Region {
        field_id:   "shift".into(),
        label:      None,
        target:     TargetKind::Checkbox,
        value_type: ValueType::Select,
        shape:      RegionShape::Polygon {
          points: vec![[0.0, 0.0], [5.0, 0.0], [5.0, 5.0]],
        },
        options:    vec!["day".into(), "night".into()],
      },
    ]);

    let text = stringify_roi_map(&map).unwrap();
    let back = parse_roi_map(&text).unwrap();
    assert_eq!(back, map);
    assert_eq!(back.field_ids().collect::<Vec<_>>(), ["output_count", "shift"]);
  }

  #[test]
  fn empty_roi_map_is_an_empty_array() {
    assert_eq!(stringify_roi_map(&RoiMap::default()).unwrap(), "[]");
    assert_eq!(parse_roi_map("[]"), Some(RoiMap::default()));
  }
}
