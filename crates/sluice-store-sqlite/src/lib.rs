//! SQLite backend for the Sluice reconciliation engine.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! pool without blocking the async runtime. One store holds both sides: the
//! read-only legacy extract tables and the target relations the reconciler
//! writes.

mod encode;
mod legacy;
mod schema;
mod store;

pub mod error;
pub mod seed;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
