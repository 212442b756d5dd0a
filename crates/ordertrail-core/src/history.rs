//! Projection of a stored history into a displayable timeline.
//!
//! Each snapshot is diffed against its chronological predecessor (never the
//! live record), and the result is filtered down to the interesting paths.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  diff::{Diff, diff},
  record::{FieldPath, empty_record},
  snapshot::Snapshot,
};

/// One entry of the history timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
  /// Timestamp of the snapshot this event describes.
  pub timestamp:  i64,
  /// `true` for the oldest snapshot, which records the starting state.
  pub is_initial: bool,
  /// Changes from the previous snapshot, restricted to interesting paths.
  pub changes:    Diff,
}

impl ChangeEvent {
  /// The snapshot timestamp as a calendar instant, if it is in range.
  pub fn recorded_at(&self) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(self.timestamp)
  }
}

/// Build the timeline for `history`, most recent first.
///
/// A snapshot whose changes all fall outside `interesting` is left out. The
/// oldest snapshot is always present, even if its filtered changes are empty.
pub fn project(history: &[Snapshot], interesting: &BTreeSet<FieldPath>) -> Vec<ChangeEvent> {
  let initial = empty_record();

  history
    .iter()
    .enumerate()
    .rev()
    .filter_map(|(i, snapshot)| {
      let previous = i.checked_sub(1).map(|p| &history[p]);
      let base = previous.map_or(&initial, |p| &p.data);

      let mut changes = diff(base, &snapshot.data);
      changes.retain(|path, _| interesting.contains(path));

      if changes.is_empty() && previous.is_some() {
        return None;
      }

      Some(ChangeEvent {
        timestamp: snapshot.timestamp,
        is_initial: previous.is_none(),
        changes,
      })
    })
    .collect()
}
