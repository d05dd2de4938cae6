//! Client-side filtering of cached collections.
//!
//! Pure function of (data, filter text); the views recompute it on every
//! change to either input, so it must not cache or reorder anything.

use crate::store::types::Record;

/// Filter records by case-insensitive substring match on the `name` field.
///
/// An empty filter returns the input unchanged, order preserved. Records
/// without a textual `name` never match a non-empty filter.
pub fn filter_by_name(records: &[Record], filter: &str) -> Vec<Record> {
  if filter.is_empty() {
    return records.to_vec();
  }

  let needle = filter.to_lowercase();
  records
    .iter()
    .filter(|r| {
      r.field_str("name")
        .map(|name| name.to_lowercase().contains(&needle))
        .unwrap_or(false)
    })
    .cloned()
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn record(id: i64, name: &str) -> Record {
    let fields = json!({ "name": name }).as_object().cloned().unwrap();
    Record::new(id, fields)
  }

  fn names(records: &[Record]) -> Vec<&str> {
    records.iter().filter_map(|r| r.field_str("name")).collect()
  }

  #[test]
  fn matches_case_insensitive_substring() {
    let data = vec![record(1, "Gala"), record(2, "Fair")];

    let filtered = filter_by_name(&data, "ga");
    assert_eq!(names(&filtered), vec!["Gala"]);
  }

  #[test]
  fn empty_filter_returns_data_unchanged() {
    let data = vec![record(2, "Fair"), record(1, "Gala")];

    let filtered = filter_by_name(&data, "");
    assert_eq!(filtered, data);
  }

  #[test]
  fn filtering_is_idempotent() {
    let data = vec![record(1, "Gala"), record(2, "Fair"), record(3, "Galactic")];

    let once = filter_by_name(&data, "a");
    let twice = filter_by_name(&once, "a");
    assert_eq!(once, twice);
  }

  #[test]
  fn preserves_input_order() {
    let data = vec![record(3, "Banquet"), record(1, "Ball"), record(2, "Bash")];

    let filtered = filter_by_name(&data, "ba");
    assert_eq!(names(&filtered), vec!["Banquet", "Ball", "Bash"]);
  }

  #[test]
  fn records_without_name_only_pass_empty_filter() {
    let nameless = Record::new(9, serde_json::Map::new());
    let data = vec![record(1, "Gala"), nameless];

    assert_eq!(filter_by_name(&data, "").len(), 2);
    assert_eq!(names(&filter_by_name(&data, "gala")), vec!["Gala"]);
  }
}
