//! Error types for `sluice-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The extract carries a reporting frequency the target model cannot
  /// express (e.g. fortnightly). The format is skipped, not mis-cycled.
  #[error("unsupported returns frequency: {0}")]
  UnsupportedFrequency(String),

  #[error("unknown returns frequency code: {0:?}")]
  UnknownFrequency(String),

  #[error("unknown production month code: {0}")]
  UnknownProductionMonth(u32),

  #[error("unknown reading type code: {0:?}")]
  UnknownReadingType(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
