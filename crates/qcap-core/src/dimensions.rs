//! Canonical text form for `L x W x T` millimetre dimensions.

/// Format three dimensions as `"LxWxT"`.
///
/// Absent components render as `-`. Returns `None` when all three are
/// absent so callers can leave the cell empty.
pub fn format_dimensions(
  l: Option<i64>,
  w: Option<i64>,
  t: Option<i64>,
) -> Option<String> {
  if l.is_none() && w.is_none() && t.is_none() {
    return None;
  }
  let part = |v: Option<i64>| v.map_or_else(|| "-".to_owned(), |v| v.to_string());
  Some(format!("{}x{}x{}", part(l), part(w), part(t)))
}

/// Parse `"1200x600x18"` (also `X`, `×` or `*` separators, optional `mm`
/// suffix, surrounding whitespace) into `(l, w, t)`.
pub fn parse_dimensions(text: &str) -> Option<(i64, i64, i64)> {
  let text = text.trim();
  let text = text
    .strip_suffix("mm")
    .or_else(|| text.strip_suffix("MM"))
    .unwrap_or(text);
  let mut parts = text
    .split(['x', 'X', '×', '*'])
    .map(|p| p.trim().parse::<i64>().ok());
  let l = parts.next()??;
  let w = parts.next()??;
  let t = parts.next()??;
  if parts.next().is_some() {
    return None;
  }
  Some((l, w, t))
}
