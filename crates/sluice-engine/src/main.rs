//! Sluice engine binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite store, and reconciles either the licences named on the command
//! line or every licence present in the loaded extract. Invoked once per
//! day by an external scheduler; single-flighting is the scheduler's job.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use sluice_core::store::LegacySource as _;
use sluice_engine::{Engine, EngineConfig};
use sluice_store_sqlite::SqliteStore;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Sluice return-log reconciliation engine")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Reconcile only these licence references; defaults to every licence in
  /// the extract.
  #[arg(short, long = "licence")]
  licences: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("SLUICE"))
    .build()
    .context("failed to read config file")?;

  let engine_cfg: EngineConfig = settings
    .try_deserialize()
    .context("failed to deserialise EngineConfig")?;

  // An unreachable store is batch-fatal; everything past this point fails
  // per licence only.
  let store = SqliteStore::open(&engine_cfg.store_path)
    .await
    .with_context(|| {
      format!("failed to open store at {:?}", engine_cfg.store_path)
    })?;
  let store = Arc::new(store);

  let licence_refs = if cli.licences.is_empty() {
    store.licence_refs().await.context("failed to enumerate licences")?
  } else {
    cli.licences
  };
  tracing::info!(
    licences = licence_refs.len(),
    concurrency = engine_cfg.concurrency,
    "starting reconciliation batch"
  );

  let engine = Engine::new(Arc::clone(&store), store);
  engine.run_batch(licence_refs, engine_cfg.concurrency).await;

  Ok(())
}
