//! Record and entity types for the remote store.
//!
//! The cache treats records as opaque: the only field it ever inspects is
//! `id`. Typed views (`Event`, `Venue`) are application-level conveniences
//! layered on top via serde.

use std::borrow::Cow;
use std::fmt;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{StoreError, StoreResult};

/// Field map of a record, everything except the id.
pub type Fields = Map<String, Value>;

/// A named category of record, mapped to one remote collection.
///
/// Doubles as the cache's query key: one cached collection per entity type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityType(Cow<'static, str>);

/// The events collection.
pub const EVENTS: EntityType = EntityType(Cow::Borrowed("events"));

/// The venues collection.
pub const VENUES: EntityType = EntityType(Cow::Borrowed("venues"));

impl EntityType {
  pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
    Self(name.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for EntityType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Server-assigned record identifier.
///
/// The store uses integer ids for plain tables and string ids (uuids) for
/// others; both compare and hash by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
  Int(i64),
  Str(String),
}

impl RecordId {
  /// Render the id the way the REST filter syntax expects (`id=eq.{id}`).
  pub fn as_filter_value(&self) -> String {
    match self {
      Self::Int(n) => n.to_string(),
      Self::Str(s) => s.clone(),
    }
  }
}

impl fmt::Display for RecordId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Int(n) => write!(f, "{}", n),
      Self::Str(s) => f.write_str(s),
    }
  }
}

impl From<i64> for RecordId {
  fn from(n: i64) -> Self {
    Self::Int(n)
  }
}

impl From<&str> for RecordId {
  fn from(s: &str) -> Self {
    Self::Str(s.to_string())
  }
}

/// A record as stored in a remote collection: a unique id plus an opaque
/// field map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
  pub id: RecordId,
  #[serde(flatten)]
  pub fields: Fields,
}

impl Record {
  pub fn new(id: impl Into<RecordId>, fields: Fields) -> Self {
    Self {
      id: id.into(),
      fields,
    }
  }

  /// Build a record from a raw response row, pulling out the `id` field.
  pub fn from_row(mut row: Map<String, Value>) -> StoreResult<Self> {
    let id = match row.remove("id") {
      Some(Value::Number(n)) => match n.as_i64() {
        Some(n) => RecordId::Int(n),
        None => return Err(StoreError::schema(format!("non-integer record id: {}", n))),
      },
      Some(Value::String(s)) => RecordId::Str(s),
      Some(other) => {
        return Err(StoreError::schema(format!(
          "unsupported record id type: {}",
          other
        )))
      }
      None => return Err(StoreError::schema("record missing id field")),
    };

    Ok(Self { id, fields: row })
  }

  /// Look up a field value by name.
  pub fn field(&self, name: &str) -> Option<&Value> {
    self.fields.get(name)
  }

  /// Look up a field as a string slice, if present and textual.
  pub fn field_str(&self, name: &str) -> Option<&str> {
    self.fields.get(name).and_then(Value::as_str)
  }

  /// Deserialize this record into a typed model (id included).
  pub fn to_model<T: DeserializeOwned>(&self) -> StoreResult<T> {
    let value =
      serde_json::to_value(self).map_err(|e| StoreError::schema(e.to_string()))?;
    serde_json::from_value(value).map_err(|e| StoreError::schema(e.to_string()))
  }
}

/// Decode a collection response, enforcing id uniqueness.
pub fn decode_rows(rows: Vec<Map<String, Value>>) -> StoreResult<Vec<Record>> {
  let mut records = Vec::with_capacity(rows.len());
  let mut seen = std::collections::HashSet::new();

  for row in rows {
    let record = Record::from_row(row)?;
    if !seen.insert(record.id.clone()) {
      return Err(StoreError::schema(format!(
        "duplicate record id in collection: {}",
        record.id
      )));
    }
    records.push(record);
  }

  Ok(records)
}

/// Authenticated session returned by password sign-in.
#[derive(Debug, Clone, Deserialize)]
pub struct Session {
  pub access_token: String,
  #[serde(default)]
  pub refresh_token: Option<String>,
  #[serde(default)]
  pub expires_in: Option<u64>,
}

// ============================================================================
// Typed application models
// ============================================================================

/// An event as the surrounding app sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
  pub id: RecordId,
  pub name: String,
  pub date: Option<String>,
  pub description: Option<String>,
  pub image_url: Option<String>,
  pub pdf_url: Option<String>,
  /// Read-only nested list; never mutated through this client.
  #[serde(default)]
  pub comments: Vec<Comment>,
}

/// A comment attached to an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
  pub id: RecordId,
  pub content: String,
}

/// A venue as the surrounding app sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Venue {
  pub id: RecordId,
  pub name: String,
  pub location: Option<String>,
  pub description: Option<String>,
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn row(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
  }

  #[test]
  fn from_row_extracts_id() {
    let record = Record::from_row(row(json!({"id": 7, "name": "Gala"}))).unwrap();
    assert_eq!(record.id, RecordId::Int(7));
    assert_eq!(record.field_str("name"), Some("Gala"));
    assert!(record.field("id").is_none());
  }

  #[test]
  fn from_row_accepts_string_ids() {
    let record = Record::from_row(row(json!({"id": "a1b2", "name": "Fair"}))).unwrap();
    assert_eq!(record.id, RecordId::Str("a1b2".to_string()));
  }

  #[test]
  fn from_row_rejects_missing_id() {
    let err = Record::from_row(row(json!({"name": "Gala"}))).unwrap_err();
    assert!(matches!(err, StoreError::Schema { .. }));
  }

  #[test]
  fn decode_rows_rejects_duplicate_ids() {
    let rows = vec![
      row(json!({"id": 1, "name": "Gala"})),
      row(json!({"id": 1, "name": "Fair"})),
    ];
    let err = decode_rows(rows).unwrap_err();
    assert!(matches!(err, StoreError::Schema { .. }));
  }

  #[test]
  fn record_converts_to_typed_event() {
    let record = Record::from_row(row(json!({
      "id": 3,
      "name": "Gala",
      "date": "2024-06-01",
      "description": "Annual fundraiser",
      "image_url": null,
      "pdf_url": null,
      "comments": [{"id": 9, "content": "Great lineup"}]
    })))
    .unwrap();

    let event: Event = record.to_model().unwrap();
    assert_eq!(event.name, "Gala");
    assert_eq!(event.comments.len(), 1);
    assert_eq!(event.comments[0].content, "Great lineup");
  }
}
