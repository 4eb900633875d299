//! Engine configuration.

use std::path::PathBuf;

use serde::Deserialize;

use crate::batch::DEFAULT_CONCURRENCY;

/// Deserialised from `config.toml` plus `SLUICE_`-prefixed environment
/// overrides.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
  /// Path to the SQLite store holding the loaded extract and the target
  /// relations.
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,

  /// Worker-pool size for batch runs.
  #[serde(default = "default_concurrency")]
  pub concurrency: usize,
}

fn default_store_path() -> PathBuf {
  PathBuf::from("sluice.sqlite")
}

fn default_concurrency() -> usize {
  DEFAULT_CONCURRENCY
}
