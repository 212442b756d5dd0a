//! Reconciliation: latest remote state against last known state.
//!
//! [`Reconciler::reconcile`] diffs a freshly fetched record against the last
//! stored snapshot for its entity and appends a new snapshot only when
//! something changed. [`Reconciler::refresh`] does this for every order an
//! [`OrderSource`] returns.

use std::{collections::BTreeMap, future::Future};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
  Error, Result,
  diff::{Diff, diff},
  kv::KeyValueStore,
  order::OrderView,
  record::{EntityKey, Record},
  snapshot::{Snapshot, now_millis},
  store::SnapshotStore,
};

// ─── Upstream ────────────────────────────────────────────────────────────────

/// Why an [`OrderSource`] could not produce records.
#[derive(Debug, Error)]
pub enum SourceError {
  /// Credentials were rejected. Retrying will not help; end the session.
  #[error("unauthorized")]
  Unauthorized,

  #[error("{0}")]
  Failed(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl SourceError {
  pub fn failed<E>(err: E) -> Self
  where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
  {
    Self::Failed(err.into())
  }
}

impl From<SourceError> for Error {
  fn from(err: SourceError) -> Self {
    match err {
      SourceError::Unauthorized => Error::Unauthorized,
      SourceError::Failed(e) => Error::Upstream(e),
    }
  }
}

/// Supplies the latest full record for every tracked order.
pub trait OrderSource: Send + Sync {
  fn fetch_orders(
    &self,
  ) -> impl Future<Output = Result<Vec<Record>, SourceError>> + Send + '_;
}

// ─── Engine ──────────────────────────────────────────────────────────────────

/// Outcome of one [`Reconciler::refresh`] cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RefreshReport {
  /// Every entity key seen in this cycle, in upstream order.
  pub observed: Vec<EntityKey>,
  /// Non-empty diffs, keyed by entity.
  pub diffs:    BTreeMap<EntityKey, Diff>,
  /// Records dropped because they carried no reference number.
  pub skipped:  usize,
}

impl RefreshReport {
  pub fn has_changes(&self) -> bool { !self.diffs.is_empty() }
}

/// Drives change detection for a set of entities over one [`SnapshotStore`].
///
/// Calls for the same entity key must be serialised by the caller.
#[derive(Debug, Clone)]
pub struct Reconciler<K> {
  store: SnapshotStore<K>,
  clock: fn() -> i64,
}

impl<K: KeyValueStore> Reconciler<K> {
  pub fn new(store: SnapshotStore<K>) -> Self { Self { store, clock: now_millis } }

  /// Replace the wall clock used to stamp snapshots.
  pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
    self.clock = clock;
    self
  }

  pub fn store(&self) -> &SnapshotStore<K> { &self.store }

  /// Compare `latest` with the last snapshot of `entity` and record it if it
  /// differs.
  ///
  /// The first observation of an entity starts its history and reports no
  /// changes. A record identical to the last snapshot leaves the store
  /// untouched.
  pub async fn reconcile(&self, entity: &str, latest: Record) -> Result<Diff> {
    let history = self.store.read(entity).await?;

    let Some(last) = history.last() else {
      self
        .store
        .initialize(entity, Snapshot::new((self.clock)(), latest))
        .await?;
      info!(entity, "first observation recorded");
      return Ok(Diff::new());
    };

    let changes = diff(&last.data, &latest);
    if changes.is_empty() {
      debug!(entity, "no changes");
      return Ok(changes);
    }

    self
      .store
      .append(entity, Snapshot::new((self.clock)(), latest))
      .await?;
    info!(entity, fields = changes.len(), "changes recorded");
    Ok(changes)
  }

  /// Fetch every order from `source` and reconcile each by reference number.
  ///
  /// A fetch failure aborts the cycle before anything is written.
  pub async fn refresh<S: OrderSource>(&self, source: &S) -> Result<RefreshReport> {
    let records = source.fetch_orders().await?;
    let mut report = RefreshReport::default();

    for record in records {
      let Some(entity) = OrderView::new(&record).entity_key() else {
        warn!("skipping order record without a reference number");
        report.skipped += 1;
        continue;
      };

      let changes = self.reconcile(&entity, record).await?;
      if !changes.is_empty() {
        report.diffs.insert(entity.clone(), changes);
      }
      report.observed.push(entity);
    }

    info!(
      orders = report.observed.len(),
      changed = report.diffs.len(),
      "refresh complete"
    );
    Ok(report)
  }
}
