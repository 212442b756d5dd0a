//! Core types and algorithms for the ordertrail change tracker.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Records are plain JSON trees; storage is reached through the
//! [`kv::KeyValueStore`] trait and upstream data through
//! [`reconcile::OrderSource`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod diff;
pub mod error;
pub mod fields;
pub mod history;
pub mod kv;
pub mod order;
pub mod reconcile;
pub mod record;
pub mod snapshot;
pub mod store;

pub use error::{Error, Result};
