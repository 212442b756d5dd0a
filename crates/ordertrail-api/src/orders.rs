//! Handlers for `/orders` and `/fields` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/fields` | The interesting-field catalog |
//! | `GET`  | `/orders` | Entity keys with a stored history |
//! | `GET`  | `/orders/:key/history` | Labelled timeline, most recent first; 404 if none |
//! | `GET`  | `/orders/:key/snapshots` | Raw snapshots, oldest first; 404 if none |
//! | `POST` | `/orders/:key/reconcile` | Body: the latest record; returns the diff |

use axum::{
  Json,
  extract::{Path, State},
};
use ordertrail_core::{
  diff::Diff,
  fields::FieldCatalog,
  kv::KeyValueStore,
  record::{EntityKey, Record},
  snapshot::History,
};

use crate::{
  ApiState,
  error::ApiError,
  timeline::{TimelineEntry, timeline},
};

/// `GET /fields`
pub async fn fields<K>(State(state): State<ApiState<K>>) -> Json<FieldCatalog>
where
  K: KeyValueStore,
{
  Json(FieldCatalog::clone(&state.catalog))
}

/// `GET /orders`
pub async fn list<K>(
  State(state): State<ApiState<K>>,
) -> Result<Json<Vec<EntityKey>>, ApiError>
where
  K: KeyValueStore,
{
  let keys = state.engine.store().list_keys().await?;
  Ok(Json(keys))
}

async fn stored_history<K>(state: &ApiState<K>, key: &str) -> Result<History, ApiError>
where
  K: KeyValueStore,
{
  let history = state.engine.store().read(key).await?;
  if history.is_empty() {
    return Err(ApiError::NotFound(format!("no history recorded for {key}")));
  }
  Ok(history)
}

/// `GET /orders/:key/history`
pub async fn history<K>(
  State(state): State<ApiState<K>>,
  Path(key): Path<EntityKey>,
) -> Result<Json<Vec<TimelineEntry>>, ApiError>
where
  K: KeyValueStore,
{
  let history = stored_history(&state, &key).await?;
  Ok(Json(timeline(&history, &state.catalog)))
}

/// `GET /orders/:key/snapshots`
pub async fn snapshots<K>(
  State(state): State<ApiState<K>>,
  Path(key): Path<EntityKey>,
) -> Result<Json<History>, ApiError>
where
  K: KeyValueStore,
{
  Ok(Json(stored_history(&state, &key).await?))
}

/// `POST /orders/:key/reconcile` — body: the latest full record.
pub async fn reconcile<K>(
  State(state): State<ApiState<K>>,
  Path(key): Path<EntityKey>,
  Json(record): Json<Record>,
) -> Result<Json<Diff>, ApiError>
where
  K: KeyValueStore,
{
  if !record.is_object() {
    return Err(ApiError::BadRequest("record must be a JSON object".into()));
  }

  let _guard = state.writes.lock().await;
  let diff = state.engine.reconcile(&key, record).await?;
  Ok(Json(diff))
}
