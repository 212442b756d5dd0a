//! Error types for `ordertrail-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The upstream rejected our credentials; the session should end.
  #[error("upstream rejected the access token")]
  Unauthorized,

  #[error("upstream fetch failed: {0}")]
  Upstream(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  /// Wrap a backend error from a [`KeyValueStore`](crate::kv::KeyValueStore).
  pub fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(err))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
