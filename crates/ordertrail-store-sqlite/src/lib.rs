//! SQLite backend for ordertrail snapshot histories.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Each history is one row of a plain
//! key-value table; the layout of the value is owned by `ordertrail-core`.

mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
