//! The Sluice batch engine.
//!
//! Orchestrates the per-licence pipeline — build the returns packet,
//! reconcile it against persisted state, void what disappeared, replicate
//! missing submissions — over any [`sluice_core::store::LegacySource`] /
//! [`sluice_core::store::ReturnStore`] pair, with a bounded worker pool for
//! batch runs.

pub mod batch;
pub mod config;
pub mod error;
pub mod pipeline;

pub use batch::BatchSummary;
pub use config::EngineConfig;
pub use error::{Error, Result};
pub use pipeline::{Engine, ReconcileOutcome};
