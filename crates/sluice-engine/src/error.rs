//! Error type for `sluice-engine`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The extract has no current version for a licence the pipeline was
  /// asked to reconcile. Fails the licence, not the batch.
  #[error("licence {0} has no current version")]
  MissingCurrentVersion(String),

  #[error("core error: {0}")]
  Core(#[from] sluice_core::Error),

  #[error("legacy source error: {0}")]
  Legacy(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("return store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
