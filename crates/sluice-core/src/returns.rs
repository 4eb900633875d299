//! Return-log identity, status, and due-date resolution.
//!
//! Identifiers are content-addressed: the same region, licence, format, and
//! window always produce the same id, which is what makes the reconciler's
//! upsert idempotent. Nothing here is random.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{
  cycle::{Cycle, natural_cycle_end},
  legacy::{LegacyFormat, SubmissionLog},
};

// ─── Constants ───────────────────────────────────────────────────────────────

/// Days after the reference date on which a return falls due.
pub const DUE_DAYS: u64 = 28;

/// Change-reason codes that mark a version change as a variation; a cycle
/// truncated by one of these keeps the due date of its un-truncated window.
pub const VARIATION_REASONS: [&str; 8] =
  ["VARF", "VARM", "AMND", "NAME", "REDS", "SPAC", "SPAN", "XCORR"];

/// Cycles ending on or after this date have their submissions owned by the
/// online service; the import must not overwrite their status.
pub fn wrls_cutover() -> NaiveDate {
  ymd(2018, 10, 31)
}

/// Returns whose window ended on this date had their due date extended by
/// regulation during the COVID-19 disruption.
pub fn covid_reference() -> NaiveDate {
  ymd(2020, 3, 31)
}

pub fn covid_due() -> NaiveDate {
  ymd(2020, 10, 16)
}

// ─── Status ──────────────────────────────────────────────────────────────────

/// Lifecycle status of a persisted return log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnStatus {
  Due,
  Completed,
  Void,
}

impl ReturnStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Due => "due",
      Self::Completed => "completed",
      Self::Void => "void",
    }
  }
}

// ─── Identity ────────────────────────────────────────────────────────────────

/// Derive the deterministic return-log identifier.
pub fn return_log_id(
  region_code: &str,
  licence_ref: &str,
  format_id: i64,
  start_date: NaiveDate,
  end_date: NaiveDate,
) -> String {
  format!("v1:{region_code}:{licence_ref}:{format_id}:{start_date}:{end_date}")
}

// ─── Status & received date ──────────────────────────────────────────────────

/// Whether two closed date windows intersect.
pub fn windows_intersect(
  a_start: NaiveDate,
  a_end: NaiveDate,
  b_start: NaiveDate,
  b_end: NaiveDate,
) -> bool {
  a_start <= b_end && b_start <= a_end
}

/// `Completed` if any log window intersecting the cycle carries a received
/// marker, else `Due`.
pub fn resolve_status(cycle: &Cycle, logs: &[SubmissionLog]) -> ReturnStatus {
  let received = logs.iter().any(|log| {
    log.received.is_some()
      && windows_intersect(
        log.start_date,
        log.end_date,
        cycle.start_date,
        cycle.end_date,
      )
  });
  if received { ReturnStatus::Completed } else { ReturnStatus::Due }
}

/// Latest received marker among the logs intersecting the cycle.
pub fn latest_received(
  cycle: &Cycle,
  logs: &[SubmissionLog],
) -> Option<NaiveDate> {
  logs
    .iter()
    .filter(|log| {
      windows_intersect(
        log.start_date,
        log.end_date,
        cycle.start_date,
        cycle.end_date,
      )
    })
    .filter_map(|log| log.received)
    .max()
}

// ─── Due date ────────────────────────────────────────────────────────────────

/// Resolve the due date for a cycle ending on `cycle_end`.
///
/// Default is 28 days after the cycle end. Two exceptions, evaluated in
/// order: a cycle truncated by a variation keeps the due date of its
/// un-truncated window, and a reference date of 2020-03-31 resolves to the
/// regulatory extension regardless of the 28-day rule.
pub fn resolve_due_date(cycle_end: NaiveDate, format: &LegacyFormat) -> NaiveDate {
  let mut reference = cycle_end;

  let truncated_by_variation = format.end_date == Some(cycle_end)
    && format
      .next_version_reason
      .as_deref()
      .is_some_and(|reason| VARIATION_REASONS.contains(&reason));
  if truncated_by_variation {
    reference = natural_cycle_end(cycle_end, format.production_month.is_summer);
  }

  if reference == covid_reference() {
    return covid_due();
  }

  reference
    .checked_add_days(Days::new(DUE_DAYS))
    .expect("date arithmetic within supported range")
}

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
  NaiveDate::from_ymd_opt(year, month, day).expect("valid calendar anchor")
}
