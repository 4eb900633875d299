//! Batch fan-out over licences with a bounded worker pool.
//!
//! Concurrency is capped to respect the shared store's connection budget;
//! each licence's pipeline runs sequentially inside its own worker. A failed
//! licence is logged and skipped — failures are per-licence, never
//! per-batch.

use std::sync::Arc;

use serde::Serialize;
use tokio::{sync::Semaphore, task::JoinSet};

use sluice_core::store::{LegacySource, ReturnStore};

use crate::pipeline::{Engine, ReconcileOutcome};

/// Default worker-pool size.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// What one batch run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
  pub succeeded: u64,
  pub failed:    u64,
  pub totals:    ReconcileOutcome,
}

impl<L, S> Engine<L, S>
where
  L: LegacySource + 'static,
  S: ReturnStore + 'static,
{
  /// Reconcile every licence in `licence_refs`, at most `concurrency` at a
  /// time.
  pub async fn run_batch(
    &self,
    licence_refs: Vec<String>,
    concurrency: usize,
  ) -> BatchSummary {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut workers = JoinSet::new();

    for licence_ref in licence_refs {
      let engine = self.clone();
      let semaphore = Arc::clone(&semaphore);
      workers.spawn(async move {
        // The semaphore is never closed; a failed acquire would only mean
        // the pool is shutting down, in which case running unthrottled is
        // still correct.
        let _permit = semaphore.acquire_owned().await.ok();
        let result = engine.reconcile_licence(&licence_ref).await;
        (licence_ref, result)
      });
    }

    let mut summary = BatchSummary::default();
    while let Some(joined) = workers.join_next().await {
      match joined {
        Ok((licence_ref, Ok(outcome))) => {
          summary.succeeded += 1;
          summary.totals += outcome;
          tracing::debug!(%licence_ref, "licence ok");
        }
        Ok((licence_ref, Err(e))) => {
          summary.failed += 1;
          tracing::error!(%licence_ref, error = %e, "licence failed; continuing batch");
        }
        Err(e) => {
          summary.failed += 1;
          tracing::error!(error = %e, "worker panicked; continuing batch");
        }
      }
    }

    tracing::info!(
      succeeded = summary.succeeded,
      failed = summary.failed,
      created = summary.totals.created,
      updated = summary.totals.updated,
      voided = summary.totals.voided,
      replicated = summary.totals.replicated,
      "batch complete"
    );
    summary
  }
}
