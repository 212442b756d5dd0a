//! Labelled, display-ready rendering of projected history.
//!
//! [`timeline`] turns the [`ChangeEvent`]s produced by
//! [`ordertrail_core::history::project`] into entries carrying field labels
//! and formatted values, ready for a history view.

use chrono::{DateTime, Utc};
use ordertrail_core::{
  fields::FieldCatalog,
  history::{ChangeEvent, project},
  record::display_value,
  snapshot::Snapshot,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One changed field inside a [`TimelineEntry`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelledChange {
  pub path:  String,
  pub label: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub old:   Option<Value>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub new:   Option<Value>,
  /// `old` formatted for display (`N/A` when empty).
  pub from:  String,
  /// `new` formatted for display (`N/A` when empty).
  pub to:    String,
}

/// A [`ChangeEvent`] with labels and a calendar timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
  pub timestamp:   i64,
  pub recorded_at: Option<DateTime<Utc>>,
  pub is_initial:  bool,
  /// In catalog order.
  pub changes:     Vec<LabelledChange>,
}

/// Project `history` through `catalog`, most recent first.
pub fn timeline(history: &[Snapshot], catalog: &FieldCatalog) -> Vec<TimelineEntry> {
  project(history, &catalog.paths())
    .into_iter()
    .map(|event| label_event(event, catalog))
    .collect()
}

fn label_event(event: ChangeEvent, catalog: &FieldCatalog) -> TimelineEntry {
  let recorded_at = event.recorded_at();
  let ChangeEvent { timestamp, is_initial, mut changes } = event;

  let labelled = catalog
    .iter()
    .filter_map(|field| {
      let entry = changes.remove(&field.path)?;
      Some(LabelledChange {
        path:  field.path.clone(),
        label: field.label.clone(),
        from:  display_value(entry.old.as_ref()),
        to:    display_value(entry.new.as_ref()),
        old:   entry.old,
        new:   entry.new,
      })
    })
    .collect();

  TimelineEntry {
    timestamp,
    recorded_at,
    is_initial,
    changes: labelled,
  }
}
