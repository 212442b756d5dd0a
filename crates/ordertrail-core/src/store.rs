//! [`SnapshotStore`] — per-entity snapshot histories over a key-value backend.
//!
//! Each entity's history is one JSON array of `{timestamp, data}` objects
//! stored under a key derived from the entity key by [`HistoryKeys`]. Every
//! read and write path goes through that one derivation.

use tracing::{debug, warn};

use crate::{
  Error, Result,
  kv::KeyValueStore,
  record::EntityKey,
  snapshot::{History, Snapshot},
};

/// Prefix used for history keys unless configured otherwise.
pub const DEFAULT_HISTORY_PREFIX: &str = "order-history-";

// ─── Key derivation ──────────────────────────────────────────────────────────

/// Maps entity keys to storage keys and back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryKeys {
  prefix: String,
}

impl HistoryKeys {
  pub fn new(prefix: impl Into<String>) -> Self { Self { prefix: prefix.into() } }

  pub fn prefix(&self) -> &str { &self.prefix }

  /// The storage key under which `entity`'s history lives.
  pub fn storage_key(&self, entity: &str) -> String {
    format!("{}{entity}", self.prefix)
  }

  /// Inverse of [`storage_key`](Self::storage_key); `None` for foreign keys.
  pub fn entity_key<'a>(&self, storage_key: &'a str) -> Option<&'a str> {
    storage_key.strip_prefix(self.prefix.as_str())
  }
}

impl Default for HistoryKeys {
  fn default() -> Self { Self::new(DEFAULT_HISTORY_PREFIX) }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// Append-only snapshot histories, one per entity key.
///
/// Writes are read-modify-write and not transactional: callers must not
/// write the same entity concurrently.
#[derive(Debug, Clone)]
pub struct SnapshotStore<K> {
  kv:   K,
  keys: HistoryKeys,
}

impl<K: KeyValueStore> SnapshotStore<K> {
  /// Wrap `kv` using the default key prefix.
  pub fn new(kv: K) -> Self { Self::with_keys(kv, HistoryKeys::default()) }

  pub fn with_keys(kv: K, keys: HistoryKeys) -> Self { Self { kv, keys } }

  pub fn backend(&self) -> &K { &self.kv }

  pub fn keys(&self) -> &HistoryKeys { &self.keys }

  /// Return the full history for `entity`, oldest first.
  ///
  /// A missing history is empty. A stored value that cannot be parsed is
  /// logged and also treated as empty; it will be overwritten by the next
  /// write for this entity.
  pub async fn read(&self, entity: &str) -> Result<History> {
    let key = self.keys.storage_key(entity);
    let raw = self.kv.get(&key).await.map_err(Error::store)?;

    let Some(raw) = raw else {
      return Ok(History::new());
    };

    match serde_json::from_str::<History>(&raw) {
      Ok(history) => Ok(history),
      Err(e) => {
        warn!(entity, error = %e, "discarding unreadable stored history");
        Ok(History::new())
      }
    }
  }

  /// Append `snapshot` to `entity`'s history.
  pub async fn append(&self, entity: &str, snapshot: Snapshot) -> Result<()> {
    let mut history = self.read(entity).await?;
    history.push(snapshot);
    self.write(entity, &history).await?;
    debug!(entity, len = history.len(), "appended snapshot");
    Ok(())
  }

  /// Start `entity`'s history with a single snapshot.
  pub async fn initialize(&self, entity: &str, snapshot: Snapshot) -> Result<()> {
    self.write(entity, std::slice::from_ref(&snapshot)).await?;
    debug!(entity, "initialised history");
    Ok(())
  }

  /// Every entity key that has a stored history, in ascending order.
  pub async fn list_keys(&self) -> Result<Vec<EntityKey>> {
    let stored = self
      .kv
      .keys(self.keys.prefix())
      .await
      .map_err(Error::store)?;

    Ok(
      stored
        .iter()
        .filter_map(|k| self.keys.entity_key(k))
        .map(str::to_owned)
        .collect(),
    )
  }

  async fn write(&self, entity: &str, history: &[Snapshot]) -> Result<()> {
    let key = self.keys.storage_key(entity);
    let raw = serde_json::to_string(history)?;
    self.kv.set(&key, raw).await.map_err(Error::store)
  }
}
