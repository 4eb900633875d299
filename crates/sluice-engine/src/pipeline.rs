//! The per-licence reconciliation pipeline.
//!
//! `build → reconcile → void → replicate`, in that order. The void pass must
//! follow reconciliation, or it would void rows about to be recreated. Each
//! licence runs sequentially inside one worker; no concurrent writers ever
//! target the same return log.

use std::{collections::HashSet, sync::Arc};

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use sluice_core::{
  cycle::natural_window,
  packet::{ReturnLogCandidate, build_packet},
  replicate::{archive_cutover, replicate_lines},
  returns::{ReturnStatus, wrls_cutover},
  store::{
    InsertOutcome, LegacySource, NewReturnLog, NewSubmission, ReturnLogPatch,
    ReturnStore,
  },
};

use crate::{Error, Result};

/// Source tag stamped on every imported return log.
pub const SOURCE_NALD: &str = "nald";

// ─── Outcome ─────────────────────────────────────────────────────────────────

/// Counts reported back to the scheduler for one licence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileOutcome {
  pub created:    u64,
  pub updated:    u64,
  pub voided:     u64,
  pub replicated: u64,
}

impl std::ops::AddAssign for ReconcileOutcome {
  fn add_assign(&mut self, other: Self) {
    self.created += other.created;
    self.updated += other.updated;
    self.voided += other.voided;
    self.replicated += other.replicated;
  }
}

// ─── Engine ──────────────────────────────────────────────────────────────────

/// The reconciliation engine, generic over its two store seams.
///
/// Cloning is cheap — both stores are reference-counted.
pub struct Engine<L, S> {
  legacy: Arc<L>,
  store:  Arc<S>,
}

impl<L, S> Clone for Engine<L, S> {
  fn clone(&self) -> Self {
    Self { legacy: Arc::clone(&self.legacy), store: Arc::clone(&self.store) }
  }
}

impl<L, S> Engine<L, S>
where
  L: LegacySource,
  S: ReturnStore,
{
  pub fn new(legacy: Arc<L>, store: Arc<S>) -> Self {
    Self { legacy, store }
  }

  /// Reconcile one licence against today's clock. This is the engine's sole
  /// trigger surface.
  pub async fn reconcile_licence(
    &self,
    licence_ref: &str,
  ) -> Result<ReconcileOutcome> {
    self
      .reconcile_licence_at(licence_ref, Utc::now().date_naive())
      .await
  }

  /// Reconcile one licence against a fixed clock — the deterministic entry
  /// point backing the public one (and the tests).
  pub async fn reconcile_licence_at(
    &self,
    licence_ref: &str,
    today: NaiveDate,
  ) -> Result<ReconcileOutcome> {
    let candidates = self.build_candidates(licence_ref, today).await?;
    let mut outcome = ReconcileOutcome::default();

    self.reconcile(&candidates, &mut outcome).await?;
    self.void_stale(licence_ref, &candidates, &mut outcome).await?;
    self.replicate(&candidates, &mut outcome).await?;

    tracing::info!(
      licence_ref,
      created = outcome.created,
      updated = outcome.updated,
      voided = outcome.voided,
      replicated = outcome.replicated,
      "licence reconciled"
    );
    Ok(outcome)
  }

  // ── Build ─────────────────────────────────────────────────────────────────

  async fn build_candidates(
    &self,
    licence_ref: &str,
    today: NaiveDate,
  ) -> Result<Vec<ReturnLogCandidate>> {
    let split_date = self
      .legacy
      .current_version_start(licence_ref)
      .await
      .map_err(legacy_err)?
      .ok_or_else(|| Error::MissingCurrentVersion(licence_ref.to_owned()))?;

    let formats = self
      .legacy
      .formats_for_licence(licence_ref)
      .await
      .map_err(legacy_err)?;

    let mut candidates = Vec::new();
    for format in &formats {
      // Logs are fetched once per format; the packet builder filters them
      // per cycle.
      let logs = self
        .legacy
        .submission_logs(&format.region_code, format.format_id)
        .await
        .map_err(legacy_err)?;

      match build_packet(format, Some(split_date), today, &logs) {
        Ok(mut built) => candidates.append(&mut built),
        Err(e @ sluice_core::Error::UnsupportedFrequency(_)) => {
          tracing::warn!(
            licence_ref,
            format_id = format.format_id,
            error = %e,
            "skipping unsupported format"
          );
        }
        Err(e) => return Err(e.into()),
      }
    }
    Ok(candidates)
  }

  // ── Reconcile (create/update) ─────────────────────────────────────────────

  async fn reconcile(
    &self,
    candidates: &[ReturnLogCandidate],
    outcome: &mut ReconcileOutcome,
  ) -> Result<()> {
    for candidate in candidates {
      let window = natural_window(candidate.end_date, candidate.is_summer);
      let cycle_id = self
        .store
        .find_or_create_cycle(window)
        .await
        .map_err(store_err)?;

      let exists = self
        .store
        .return_log_exists(&candidate.return_id)
        .await
        .map_err(store_err)?;

      let updated = if exists {
        self.update(candidate).await?
      } else {
        match self
          .store
          .insert_return_log(new_row(candidate, cycle_id))
          .await
          .map_err(store_err)?
        {
          InsertOutcome::Inserted => {
            outcome.created += 1;
            false
          }
          // The row appeared between the existence check and the insert —
          // a concurrent worker got there first. Fall back to the update
          // path once.
          InsertOutcome::Conflict => self.update(candidate).await?,
        }
      };
      if updated {
        outcome.updated += 1;
      }
    }
    Ok(())
  }

  async fn update(&self, candidate: &ReturnLogCandidate) -> Result<bool> {
    self
      .store
      .update_return_log(&candidate.return_id, patch_for(candidate))
      .await
      .map_err(store_err)
  }

  // ── Void ──────────────────────────────────────────────────────────────────

  async fn void_stale(
    &self,
    licence_ref: &str,
    candidates: &[ReturnLogCandidate],
    outcome: &mut ReconcileOutcome,
  ) -> Result<()> {
    let persisted = self
      .store
      .active_return_log_ids(licence_ref)
      .await
      .map_err(store_err)?;

    let candidate_ids: HashSet<&str> =
      candidates.iter().map(|c| c.return_id.as_str()).collect();
    let stale: Vec<String> = persisted
      .into_iter()
      .filter(|id| !candidate_ids.contains(id.as_str()))
      .collect();

    if !stale.is_empty() {
      outcome.voided =
        self.store.void_return_logs(stale).await.map_err(store_err)?;
    }
    Ok(())
  }

  // ── Replicate ─────────────────────────────────────────────────────────────

  async fn replicate(
    &self,
    candidates: &[ReturnLogCandidate],
    outcome: &mut ReconcileOutcome,
  ) -> Result<()> {
    for candidate in candidates {
      if candidate.status != ReturnStatus::Completed {
        continue;
      }
      // Strictly fill-missing: an existing version is never overwritten.
      if self
        .store
        .has_submission(&candidate.return_id)
        .await
        .map_err(store_err)?
      {
        continue;
      }

      let mut lines = self
        .legacy
        .lines_for_window(
          &candidate.region_code,
          candidate.format_id,
          candidate.start_date,
          candidate.end_date,
        )
        .await
        .map_err(legacy_err)?;
      if candidate.start_date < archive_cutover() {
        let archive = self
          .legacy
          .archive_lines_for_window(
            &candidate.region_code,
            candidate.format_id,
            candidate.start_date,
            candidate.end_date,
          )
          .await
          .map_err(legacy_err)?;
        lines.extend(archive);
      }

      let replication = replicate_lines(
        candidate.start_date,
        candidate.end_date,
        candidate.frequency,
        &lines,
      )?;
      self
        .store
        .create_submission(NewSubmission {
          return_id:  candidate.return_id.clone(),
          nil_return: replication.nil_return,
          lines:      replication.lines,
        })
        .await
        .map_err(store_err)?;
      outcome.replicated += 1;
    }
    Ok(())
  }
}

// ─── Row assembly ────────────────────────────────────────────────────────────

fn new_row(candidate: &ReturnLogCandidate, cycle_id: Uuid) -> NewReturnLog {
  NewReturnLog {
    return_id:       candidate.return_id.clone(),
    licence_ref:     candidate.licence_ref.clone(),
    start_date:      candidate.start_date,
    end_date:        candidate.end_date,
    due_date:        candidate.due_date,
    received_date:   candidate.received_date,
    status:          candidate.status,
    source:          SOURCE_NALD.to_owned(),
    frequency:       candidate.frequency,
    return_cycle_id: cycle_id,
    metadata:        candidate.metadata.clone(),
  }
}

/// Due date and metadata are always rewritten; status and received date only
/// while the import still owns the cycle. Post-cutover status belongs to the
/// online service.
fn patch_for(candidate: &ReturnLogCandidate) -> ReturnLogPatch {
  ReturnLogPatch {
    due_date:            candidate.due_date,
    metadata:            candidate.metadata.clone(),
    status_and_received: (candidate.end_date < wrls_cutover())
      .then(|| (candidate.status, candidate.received_date)),
  }
}

fn legacy_err<E>(e: E) -> Error
where
  E: std::error::Error + Send + Sync + 'static,
{
  Error::Legacy(Box::new(e))
}

fn store_err<E>(e: E) -> Error
where
  E: std::error::Error + Send + Sync + 'static,
{
  Error::Store(Box::new(e))
}
