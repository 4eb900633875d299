//! Core types and algorithms for the Sluice return-log reconciliation engine.
//!
//! This crate is deliberately free of database and runtime dependencies. It
//! holds the legacy-extract input model, the pure cycle/due-date/replication
//! algorithms, and the `LegacySource` / `ReturnStore` trait seams implemented
//! by storage backends.

pub mod cycle;
pub mod error;
pub mod legacy;
pub mod packet;
pub mod replicate;
pub mod returns;
pub mod store;

pub use error::{Error, Result};
