//! The `KeyValueStore` trait and an in-memory implementation.
//!
//! Snapshot histories are persisted as opaque strings under string keys. The
//! trait is implemented by storage backends (e.g. `ordertrail-store-sqlite`);
//! higher layers only see [`SnapshotStore`](crate::store::SnapshotStore).

use std::{
  collections::BTreeMap,
  convert::Infallible,
  future::Future,
  sync::{Arc, Mutex, PoisonError},
};

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a string-to-string persistence backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`), and so that a
/// backend with genuinely asynchronous I/O is a drop-in replacement.
pub trait KeyValueStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Return the value stored under `key`, or `None` if there is none.
  fn get<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + 'a;

  /// Store `value` under `key`, replacing any previous value.
  fn set<'a>(
    &'a self,
    key: &'a str,
    value: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// List every key that starts with `prefix`, in ascending order.
  fn keys<'a>(
    &'a self,
    prefix: &'a str,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + 'a;
}

// ─── In-memory backend ───────────────────────────────────────────────────────

/// A process-local store, useful for tests and throwaway sessions.
///
/// Cloning is cheap — clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
  entries: Arc<Mutex<BTreeMap<String, String>>>,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }

  fn with_entries<T>(&self, f: impl FnOnce(&mut BTreeMap<String, String>) -> T) -> T {
    let mut guard = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
    f(&mut guard)
  }
}

impl KeyValueStore for MemoryStore {
  type Error = Infallible;

  async fn get(&self, key: &str) -> Result<Option<String>, Infallible> {
    Ok(self.with_entries(|m| m.get(key).cloned()))
  }

  async fn set(&self, key: &str, value: String) -> Result<(), Infallible> {
    self.with_entries(|m| m.insert(key.to_owned(), value));
    Ok(())
  }

  async fn keys(&self, prefix: &str) -> Result<Vec<String>, Infallible> {
    Ok(self.with_entries(|m| {
      m.keys()
        .filter(|k| k.starts_with(prefix))
        .cloned()
        .collect()
    }))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn get_missing_returns_none() {
    let kv = MemoryStore::new();
    assert_eq!(kv.get("nope").await.unwrap(), None);
  }

  #[tokio::test]
  async fn set_overwrites_and_clones_share_state() {
    let kv = MemoryStore::new();
    let other = kv.clone();
    kv.set("a", "1".into()).await.unwrap();
    kv.set("a", "2".into()).await.unwrap();
    assert_eq!(other.get("a").await.unwrap().as_deref(), Some("2"));
  }

  #[tokio::test]
  async fn keys_filters_by_prefix() {
    let kv = MemoryStore::new();
    kv.set("p-b", String::new()).await.unwrap();
    kv.set("q-a", String::new()).await.unwrap();
    kv.set("p-a", String::new()).await.unwrap();
    assert_eq!(kv.keys("p-").await.unwrap(), vec!["p-a", "p-b"]);
  }
}
