//! Records and the path vocabulary used to address values inside them.
//!
//! A [`Record`] is one entity's full known state: an arbitrary JSON tree with
//! no fixed schema. Values inside it are addressed by a [`FieldPath`], a
//! dot-joined list of object keys. Arrays are never traversed by a path.

use serde_json::{Map, Value};

/// One full snapshot of an entity's nested state.
pub type Record = Value;

/// Stable identifier of the logical entity a sequence of records belongs to.
pub type EntityKey = String;

/// Dot-joined sequence of object keys, e.g. `"order.orderStatus"`.
pub type FieldPath = String;

/// An empty JSON object, the implicit predecessor of an entity's first record.
pub fn empty_record() -> Record { Value::Object(Map::new()) }

/// Extend `parent` with `key`; the root has an empty parent.
pub fn join_path(parent: &str, key: &str) -> FieldPath {
  if parent.is_empty() {
    key.to_owned()
  } else {
    format!("{parent}.{key}")
  }
}

/// Look up the value at `path`, descending through objects only.
///
/// Returns `None` when any segment is missing or a non-object is reached
/// before the last segment.
pub fn value_at<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
  path
    .split('.')
    .try_fold(record, |node, segment| node.as_object()?.get(segment))
}

/// Human-readable rendering of an optional value.
///
/// Absent values, `null` and blank strings render as `N/A`. Strings render
/// without quotes; everything else uses compact JSON.
pub fn display_value(value: Option<&Value>) -> String {
  match value {
    None | Some(Value::Null) => "N/A".to_owned(),
    Some(Value::String(s)) if s.trim().is_empty() => "N/A".to_owned(),
    Some(Value::String(s)) => s.trim().to_owned(),
    Some(other) => other.to_string(),
  }
}
