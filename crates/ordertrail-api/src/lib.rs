//! JSON REST API for ordertrail.
//!
//! Exposes an axum [`Router`] over any
//! [`KeyValueStore`](ordertrail_core::kv::KeyValueStore). Auth, TLS, and
//! transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", ordertrail_api::api_router(state))
//! ```

pub mod error;
pub mod orders;
pub mod timeline;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use ordertrail_core::{fields::FieldCatalog, kv::KeyValueStore, reconcile::Reconciler};
use tokio::sync::Mutex;

pub use error::ApiError;

/// Shared state threaded through all handlers.
pub struct ApiState<K> {
  pub engine:  Arc<Reconciler<K>>,
  pub catalog: Arc<FieldCatalog>,
  /// Serialises reconciliation; the engine assumes one writer per entity.
  writes:      Arc<Mutex<()>>,
}

impl<K> ApiState<K> {
  pub fn new(engine: Reconciler<K>, catalog: FieldCatalog) -> Self {
    Self {
      engine:  Arc::new(engine),
      catalog: Arc::new(catalog),
      writes:  Arc::new(Mutex::new(())),
    }
  }
}

impl<K> Clone for ApiState<K> {
  fn clone(&self) -> Self {
    Self {
      engine:  Arc::clone(&self.engine),
      catalog: Arc::clone(&self.catalog),
      writes:  Arc::clone(&self.writes),
    }
  }
}

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<K>(state: ApiState<K>) -> Router<()>
where
  K: KeyValueStore + 'static,
{
  Router::new()
    .route("/fields", get(orders::fields::<K>))
    .route("/orders", get(orders::list::<K>))
    .route("/orders/{key}/history", get(orders::history::<K>))
    .route("/orders/{key}/snapshots", get(orders::snapshots::<K>))
    .route("/orders/{key}/reconcile", post(orders::reconcile::<K>))
    .with_state(state)
}
