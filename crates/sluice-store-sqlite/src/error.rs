//! Error type for `sluice-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] sluice_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date parse error: {0}")]
  DateParse(String),

  /// A format referenced a licence row the extract does not contain.
  #[error("licence not found in extract: {0}")]
  LicenceNotFound(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
