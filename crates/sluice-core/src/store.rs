//! The `LegacySource` and `ReturnStore` traits and supporting row types.
//!
//! The traits are implemented by storage backends (e.g.
//! `sluice-store-sqlite`). The engine depends on these abstractions, not on
//! any concrete backend. `LegacySource` is strictly read-only; all mutation
//! of target state goes through `ReturnStore`.

use std::future::Future;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
  cycle::CycleWindow,
  legacy::{LegacyFormat, LegacyLine, ReturnsFrequency, SubmissionLog},
  replicate::ReplicatedLine,
  returns::ReturnStatus,
};

// ─── Write types ─────────────────────────────────────────────────────────────

/// A full return-log row for first-time insertion.
#[derive(Debug, Clone)]
pub struct NewReturnLog {
  pub return_id:       String,
  pub licence_ref:     String,
  pub start_date:      NaiveDate,
  pub end_date:        NaiveDate,
  pub due_date:        NaiveDate,
  pub received_date:   Option<NaiveDate>,
  pub status:          ReturnStatus,
  pub source:          String,
  pub frequency:       ReturnsFrequency,
  pub return_cycle_id: Uuid,
  pub metadata:        serde_json::Value,
}

/// The narrow field set the reconciler may touch on an existing row.
///
/// Due date and metadata are always rewritten. Status and received date are
/// rewritten only for cycles the import still owns; `status_and_received` is
/// `None` once ownership has passed to the online service.
#[derive(Debug, Clone)]
pub struct ReturnLogPatch {
  pub due_date:            NaiveDate,
  pub metadata:            serde_json::Value,
  pub status_and_received: Option<(ReturnStatus, Option<NaiveDate>)>,
}

/// Result of attempting a first-time insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
  Inserted,
  /// The row already existed — typically created by a concurrent worker
  /// between the existence check and the insert.
  Conflict,
}

/// A backfilled submission: one version plus its lines, persisted in that
/// order. A nil return carries no lines.
#[derive(Debug, Clone)]
pub struct NewSubmission {
  pub return_id:  String,
  pub nil_return: bool,
  pub lines:      Vec<ReplicatedLine>,
}

// ─── LegacySource ────────────────────────────────────────────────────────────

/// Read-only access to the legacy extract.
///
/// All methods return `Send` futures so the trait can be used from the
/// engine's multi-threaded worker pool.
pub trait LegacySource: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Every licence reference with at least one return format, for batch
  /// enumeration.
  fn licence_refs(
    &self,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + '_;

  /// Effective start date of the licence's current version, or `None` when
  /// the extract has no current version for the licence.
  fn current_version_start<'a>(
    &'a self,
    licence_ref: &'a str,
  ) -> impl Future<Output = Result<Option<NaiveDate>, Self::Error>> + Send + 'a;

  /// All return formats configured for a licence, flattened to their
  /// effective windows.
  fn formats_for_licence<'a>(
    &'a self,
    licence_ref: &'a str,
  ) -> impl Future<Output = Result<Vec<LegacyFormat>, Self::Error>> + Send + 'a;

  /// All submission logs for one format. Fetched once per format; the
  /// packet builder filters per cycle.
  fn submission_logs<'a>(
    &'a self,
    region_code: &'a str,
    format_id: i64,
  ) -> impl Future<Output = Result<Vec<SubmissionLog>, Self::Error>> + Send + 'a;

  /// Granular lines whose windows fall inside `[start, end]`.
  fn lines_for_window<'a>(
    &'a self,
    region_code: &'a str,
    format_id: i64,
    start: NaiveDate,
    end: NaiveDate,
  ) -> impl Future<Output = Result<Vec<LegacyLine>, Self::Error>> + Send + 'a;

  /// Same as [`lines_for_window`](Self::lines_for_window) against the
  /// archive table used for windows predating the archive cutover.
  fn archive_lines_for_window<'a>(
    &'a self,
    region_code: &'a str,
    format_id: i64,
    start: NaiveDate,
    end: NaiveDate,
  ) -> impl Future<Output = Result<Vec<LegacyLine>, Self::Error>> + Send + 'a;
}

// ─── ReturnStore ─────────────────────────────────────────────────────────────

/// Mutable access to the target relations.
pub trait ReturnStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Find or create the return cycle for `window`.
  ///
  /// A conflicting concurrent create resolves by updating only the
  /// modification timestamp; `is_submitted_in_wrls` is derived once at
  /// creation and never recomputed.
  fn find_or_create_cycle(
    &self,
    window: CycleWindow,
  ) -> impl Future<Output = Result<Uuid, Self::Error>> + Send + '_;

  fn return_log_exists<'a>(
    &'a self,
    return_id: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Insert a new return log; reports [`InsertOutcome::Conflict`] instead
  /// of failing when the identifier is already taken.
  fn insert_return_log(
    &self,
    row: NewReturnLog,
  ) -> impl Future<Output = Result<InsertOutcome, Self::Error>> + Send + '_;

  /// Apply `patch` to an existing return log. Returns `true` only when a
  /// field actually changed, so repeat runs report zero updates.
  fn update_return_log<'a>(
    &'a self,
    return_id: &'a str,
    patch: ReturnLogPatch,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Identifiers of all non-void imported return logs for a licence.
  fn active_return_log_ids<'a>(
    &'a self,
    licence_ref: &'a str,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + 'a;

  /// Mark the given return logs void in one bulk update, touching no other
  /// field. Returns the number of rows voided.
  fn void_return_logs(
    &self,
    return_ids: Vec<String>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Whether a submission version already exists for the return log.
  fn has_submission<'a>(
    &'a self,
    return_id: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Persist a submission: the version row first, then its lines.
  fn create_submission(
    &self,
    submission: NewSubmission,
  ) -> impl Future<Output = Result<Uuid, Self::Error>> + Send + '_;
}
