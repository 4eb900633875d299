//! Submission replication: expanding legacy granular readings into
//! target-model lines.
//!
//! The return-log window is partitioned into sub-periods at the log's own
//! granularity; legacy lines are then swept forward in end-date order, each
//! consumed by exactly one sub-period. Quarterly and yearly formats are
//! expanded to monthly sub-periods — a conversion, not a 1:1 mapping — so a
//! single legacy line lands on the month containing its end date and the
//! remaining months stay unreported.

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  legacy::{LegacyLine, ReadingType, ReturnsFrequency},
};

// ─── Constants ───────────────────────────────────────────────────────────────

/// Windows starting before this date also read the archive line table, whose
/// rows use the older date encoding.
pub fn archive_cutover() -> NaiveDate {
  NaiveDate::from_ymd_opt(2013, 4, 1).expect("valid calendar anchor")
}

// ─── Sub-periods ─────────────────────────────────────────────────────────────

/// Granularity label carried on each target line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinePeriod {
  Day,
  Week,
  Month,
}

impl LinePeriod {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Day => "day",
      Self::Week => "week",
      Self::Month => "month",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubPeriod {
  pub start_date: NaiveDate,
  pub end_date:   NaiveDate,
}

/// The target granularity for a reporting frequency.
pub fn line_period(frequency: ReturnsFrequency) -> Result<LinePeriod> {
  match frequency {
    ReturnsFrequency::Day => Ok(LinePeriod::Day),
    ReturnsFrequency::Week => Ok(LinePeriod::Week),
    ReturnsFrequency::Month | ReturnsFrequency::Quarter
    | ReturnsFrequency::Year => Ok(LinePeriod::Month),
    ReturnsFrequency::Fortnight => Err(Error::UnsupportedFrequency(
      frequency.as_str().to_owned(),
    )),
  }
}

/// Partition `[start, end]` into sub-periods at the target granularity.
/// The result tiles the window: no gaps, no overlaps, first sub-period
/// starts on `start`, last ends on `end`.
pub fn sub_periods(
  start: NaiveDate,
  end: NaiveDate,
  frequency: ReturnsFrequency,
) -> Result<Vec<SubPeriod>> {
  let period = line_period(frequency)?;
  let mut periods = Vec::new();
  let mut cursor = start;
  while cursor <= end {
    let sub_end = match period {
      LinePeriod::Day => cursor,
      LinePeriod::Week => add_days(cursor, 6).min(end),
      LinePeriod::Month => month_end(cursor).min(end),
    };
    periods.push(SubPeriod { start_date: cursor, end_date: sub_end });
    cursor = add_days(sub_end, 1);
  }
  Ok(periods)
}

// ─── Replication ─────────────────────────────────────────────────────────────

/// One target-model line produced by the sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplicatedLine {
  pub start_date:   NaiveDate,
  pub end_date:     NaiveDate,
  /// `None` means the sub-period had nothing reported — absence, not zero.
  pub quantity:     Option<f64>,
  pub time_period:  LinePeriod,
  pub reading_type: ReadingType,
  pub unit:         String,
}

/// The replication result for one return log.
#[derive(Debug, Clone, PartialEq)]
pub struct Replication {
  /// No legacy lines existed at all: the submission is recorded as a nil
  /// return and carries no lines.
  pub nil_return: bool,
  pub lines:      Vec<ReplicatedLine>,
}

/// Expand `legacy` lines for the window `[start, end]` into target lines.
///
/// Lines are sorted by end date and swept forward; each legacy line is
/// consumed by the first sub-period whose bounds contain its end date, so a
/// line can never satisfy two expanded sub-periods. The sweep never mutates
/// its input.
pub fn replicate_lines(
  start: NaiveDate,
  end: NaiveDate,
  frequency: ReturnsFrequency,
  legacy: &[LegacyLine],
) -> Result<Replication> {
  if legacy.is_empty() {
    return Ok(Replication { nil_return: true, lines: Vec::new() });
  }

  let period = line_period(frequency)?;
  let periods = sub_periods(start, end, frequency)?;

  let mut ordered: Vec<&LegacyLine> = legacy.iter().collect();
  ordered.sort_by_key(|line| (line.end_date, line.start_date));

  let mut lines = Vec::with_capacity(periods.len());
  let mut next = 0;
  for sub in &periods {
    let mut quantity: Option<f64> = None;
    let mut reading_type = None;
    let mut unit = None;

    // Sub-periods are ordered, so every line ending on or before this
    // sub-period's end either matches it or fell in an earlier gap.
    while next < ordered.len() && ordered[next].end_date <= sub.end_date {
      let line = &ordered[next];
      next += 1;
      if line.end_date < sub.start_date {
        continue;
      }
      if let Some(q) = line.quantity {
        quantity = Some(quantity.unwrap_or(0.0) + q);
      }
      reading_type.get_or_insert(line.reading_type);
      unit.get_or_insert_with(|| line.unit.clone());
    }

    lines.push(ReplicatedLine {
      start_date: sub.start_date,
      end_date: sub.end_date,
      quantity,
      time_period: period,
      reading_type: reading_type.unwrap_or(ReadingType::Measured),
      unit: unit.unwrap_or_else(|| "m³".to_owned()),
    });
  }

  Ok(Replication { nil_return: false, lines })
}

// ─── Date helpers ────────────────────────────────────────────────────────────

fn add_days(date: NaiveDate, days: u64) -> NaiveDate {
  date
    .checked_add_days(Days::new(days))
    .expect("date arithmetic within supported range")
}

/// Last day of the month containing `date`.
fn month_end(date: NaiveDate) -> NaiveDate {
  let first = NaiveDate::from_ymd_opt(date.year(), date.month(), 1)
    .expect("valid calendar anchor");
  first
    .checked_add_months(Months::new(1))
    .and_then(|d| d.checked_sub_days(Days::new(1)))
    .expect("date arithmetic within supported range")
}
