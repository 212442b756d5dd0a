//! Structural diff over JSON records.
//!
//! [`diff`] walks two records in parallel and produces a flat [`Diff`]: one
//! [`DiffEntry`] per leaf [`FieldPath`] whose value differs. Objects are
//! recursed into; arrays and scalars are compared as whole values.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value};

use crate::record::{FieldPath, join_path};

// ─── Types ───────────────────────────────────────────────────────────────────

/// The old and new value at one path.
///
/// `None` means the key was absent on that side, which is distinct from a
/// present `null`. Absent sides are omitted from the serialised form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffEntry {
  #[serde(
    default,
    skip_serializing_if = "Option::is_none",
    deserialize_with = "present"
  )]
  pub old: Option<Value>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none",
    deserialize_with = "present"
  )]
  pub new: Option<Value>,
}

impl DiffEntry {
  pub fn new(old: Option<Value>, new: Option<Value>) -> Self { Self { old, new } }

  /// Convenience for the common case where both sides are present.
  pub fn changed(old: Value, new: Value) -> Self {
    Self { old: Some(old), new: Some(new) }
  }
}

/// A field that is present in the input always deserialises to `Some`, even
/// when its value is `null`; missing fields fall back to `None` via
/// `#[serde(default)]`.
fn present<'de, D>(de: D) -> Result<Option<Value>, D::Error>
where
  D: Deserializer<'de>,
{
  Value::deserialize(de).map(Some)
}

/// All leaf-level changes between two records. Empty means "no change".
///
/// Iteration order is by path and carries no meaning.
pub type Diff = BTreeMap<FieldPath, DiffEntry>;

// ─── Algorithm ───────────────────────────────────────────────────────────────

/// Compute the structural diff from `old` to `new`.
///
/// A root that is not an object is treated as an empty mapping.
pub fn diff(old: &Value, new: &Value) -> Diff {
  let mut out = Diff::new();
  diff_objects(old.as_object(), new.as_object(), "", &mut out);
  out
}

fn diff_objects(
  old: Option<&Map<String, Value>>,
  new: Option<&Map<String, Value>>,
  parent: &str,
  out: &mut Diff,
) {
  let empty = Map::new();
  let old = old.unwrap_or(&empty);
  let new = new.unwrap_or(&empty);

  // Union of keys: everything on the old side, then keys only the new side has.
  let keys = old
    .keys()
    .chain(new.keys().filter(|k| !old.contains_key(k.as_str())));

  for key in keys {
    compare(old.get(key), new.get(key), join_path(parent, key), out);
  }
}

fn compare(
  old: Option<&Value>,
  new: Option<&Value>,
  path: FieldPath,
  out: &mut Diff,
) {
  match (old, new) {
    (Some(Value::Object(a)), Some(Value::Object(b))) => {
      diff_objects(Some(a), Some(b), &path, out);
    }
    (Some(Value::Array(a)), Some(Value::Array(b))) => {
      if !arrays_equal(a, b) {
        out.insert(path, DiffEntry::changed(Value::Array(a.clone()), Value::Array(b.clone())));
      }
    }
    (a, b) if scalars_equal(a, b) => {}
    (a, b) => {
      out.insert(path, DiffEntry::new(a.cloned(), b.cloned()));
    }
  }
}

/// Arrays are equal when their elements are pairwise identical.
fn arrays_equal(a: &[Value], b: &[Value]) -> bool {
  a.len() == b.len() && a.iter().zip(b).all(|(x, y)| identical(x, y))
}

/// Equality of values inside arrays. Numbers follow JSON semantics, but
/// objects must list the same keys in the same order, so two objects that
/// differ only in key order compare unequal.
fn identical(a: &Value, b: &Value) -> bool {
  match (a, b) {
    (Value::Object(x), Value::Object(y)) => {
      x.len() == y.len()
        && x
          .iter()
          .zip(y)
          .all(|((kx, vx), (ky, vy))| kx == ky && identical(vx, vy))
    }
    (Value::Array(x), Value::Array(y)) => arrays_equal(x, y),
    (x, y) => scalars_equal(Some(x), Some(y)),
  }
}

fn scalars_equal(a: Option<&Value>, b: Option<&Value>) -> bool {
  match (a, b) {
    (None, None) => true,
    (Some(Value::Null), Some(Value::Null)) => true,
    (Some(Value::Bool(x)), Some(Value::Bool(y))) => x == y,
    (Some(Value::String(x)), Some(Value::String(y))) => x == y,
    (Some(Value::Number(x)), Some(Value::Number(y))) => numbers_equal(x, y),
    _ => false,
  }
}

/// JSON has a single number type: `1` and `1.0` are the same value.
fn numbers_equal(a: &Number, b: &Number) -> bool {
  if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
    return x == y;
  }
  if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
    return x == y;
  }
  a.as_f64() == b.as_f64()
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn entry(old: Value, new: Value) -> DiffEntry { DiffEntry::changed(old, new) }

  #[test]
  fn empty_records_have_no_diff() {
    assert!(diff(&json!({}), &json!({})).is_empty());
  }

  #[test]
  fn identical_records_have_no_diff() {
    assert!(diff(&json!({ "a": 1 }), &json!({ "a": 1 })).is_empty());
    let r = json!({ "order": { "vin": null, "tags": [1, 2], "ok": true } });
    assert!(diff(&r, &r.clone()).is_empty());
  }

  #[test]
  fn scalar_change_reports_old_and_new() {
    let d = diff(&json!({ "a": 1 }), &json!({ "a": 2 }));
    assert_eq!(d.len(), 1);
    assert_eq!(d["a"], entry(json!(1), json!(2)));
  }

  #[test]
  fn nested_change_uses_dotted_path_only() {
    let d = diff(&json!({ "a": { "b": 1 } }), &json!({ "a": { "b": 2 } }));
    assert_eq!(d.len(), 1);
    assert_eq!(d["a.b"], entry(json!(1), json!(2)));
    assert!(!d.contains_key("a"));
  }

  #[test]
  fn arrays_compare_as_whole_values() {
    let d = diff(&json!({ "a": [1, 2] }), &json!({ "a": [2, 1] }));
    assert_eq!(d.len(), 1);
    assert_eq!(d["a"], entry(json!([1, 2]), json!([2, 1])));
  }

  #[test]
  fn equal_arrays_of_objects_are_unchanged() {
    let r = json!({ "a": [{ "x": 1, "y": [true] }] });
    assert!(diff(&r, &r.clone()).is_empty());
  }

  #[test]
  fn nested_object_key_order_inside_arrays_matters() {
    let old = json!({ "a": [{ "x": 1, "y": 2 }] });
    let new = json!({ "a": [{ "y": 2, "x": 1 }] });
    assert!(diff(&old, &new).contains_key("a"));
  }

  #[test]
  fn numbers_inside_arrays_follow_json_semantics() {
    assert!(diff(&json!({ "a": [1] }), &json!({ "a": [1.0] })).is_empty());
    let old = json!({ "a": [{ "x": 2, "y": [3] }] });
    let new = json!({ "a": [{ "x": 2.0, "y": [3.0] }] });
    assert!(diff(&old, &new).is_empty());
  }

  #[test]
  fn array_elements_still_compare_by_type() {
    let d = diff(&json!({ "a": [1] }), &json!({ "a": ["1"] }));
    assert_eq!(d["a"], entry(json!([1]), json!(["1"])));
  }

  #[test]
  fn top_level_key_order_does_not_matter() {
    let old = json!({ "x": 1, "y": { "p": 1, "q": 2 } });
    let new = json!({ "y": { "q": 2, "p": 1 }, "x": 1 });
    assert!(diff(&old, &new).is_empty());
  }

  #[test]
  fn added_and_removed_keys_have_absent_sides() {
    let d = diff(&json!({ "gone": 1 }), &json!({ "added": "x" }));
    assert_eq!(d["gone"], DiffEntry::new(Some(json!(1)), None));
    assert_eq!(d["added"], DiffEntry::new(None, Some(json!("x"))));
  }

  #[test]
  fn null_is_distinct_from_absent() {
    let d = diff(&json!({ "vin": null }), &json!({}));
    assert_eq!(d["vin"], DiffEntry::new(Some(Value::Null), None));
  }

  #[test]
  fn no_type_coercion() {
    let d = diff(&json!({ "a": "1" }), &json!({ "a": 1 }));
    assert_eq!(d["a"], entry(json!("1"), json!(1)));
  }

  #[test]
  fn integer_and_float_forms_of_a_number_are_equal() {
    assert!(diff(&json!({ "a": 1 }), &json!({ "a": 1.0 })).is_empty());
  }

  #[test]
  fn type_mismatch_emits_single_entry() {
    let d = diff(&json!({ "a": { "b": 1 } }), &json!({ "a": [1] }));
    assert_eq!(d.len(), 1);
    assert_eq!(d["a"], entry(json!({ "b": 1 }), json!([1])));
  }

  #[test]
  fn new_subtree_against_absent_is_one_entry() {
    let d = diff(&json!({}), &json!({ "order": { "status": "BOOKED" } }));
    assert_eq!(d.len(), 1);
    assert_eq!(
      d["order"],
      DiffEntry::new(None, Some(json!({ "status": "BOOKED" })))
    );
  }

  #[test]
  fn non_object_root_is_treated_as_empty() {
    let d = diff(&Value::Null, &json!({ "a": 1 }));
    assert_eq!(d["a"], DiffEntry::new(None, Some(json!(1))));
  }

  #[test]
  fn entry_serialisation_omits_absent_sides() {
    let e = DiffEntry::new(Some(Value::Null), None);
    assert_eq!(serde_json::to_value(&e).unwrap(), json!({ "old": null }));

    let back: DiffEntry = serde_json::from_value(json!({ "old": null })).unwrap();
    assert_eq!(back, e);
  }
}
