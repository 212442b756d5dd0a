//! Snapshots and histories — the persisted unit of change tracking.
//!
//! A snapshot is immutable once written. A history is append-only and its
//! insertion order is also its chronological order.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::record::Record;

/// One entity's full record as observed at `timestamp`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
  /// Milliseconds since the Unix epoch.
  pub timestamp: i64,
  pub data:      Record,
}

impl Snapshot {
  pub fn new(timestamp: i64, data: Record) -> Self { Self { timestamp, data } }
}

/// Ordered, append-only sequence of snapshots for one entity.
pub type History = Vec<Snapshot>;

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 { Utc::now().timestamp_millis() }
