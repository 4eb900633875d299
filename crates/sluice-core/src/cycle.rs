//! The cycle calculator.
//!
//! Turns one legacy format into an ordered, non-overlapping list of date
//! cycles covering its effective window. Cycles are ephemeral values — they
//! exist only as an intermediate between the format and the returns packet,
//! and are never persisted directly.
//!
//! Two mutually exclusive year-boundary schemes exist: "summer" cycles start
//! on 1 November, "financial-year" (winter) cycles on 1 April. Which applies
//! is encoded in the format's production month.

use std::collections::BTreeSet;

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  legacy::{LegacyFormat, ReturnsFrequency},
};

// ─── Types ───────────────────────────────────────────────────────────────────

/// One computed obligation period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cycle {
  pub start_date: NaiveDate,
  pub end_date:   NaiveDate,
  /// Whether the cycle starts on or after the licence's current-version
  /// effective date — a live obligation rather than a historical one.
  pub is_current: bool,
}

/// The natural scheme window (1 Nov–31 Oct or 1 Apr–31 Mar) that groups
/// return logs across licences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleWindow {
  pub start_date: NaiveDate,
  pub end_date:   NaiveDate,
  pub is_summer:  bool,
}

// ─── Calculator ──────────────────────────────────────────────────────────────

/// Compute the cycles for `format`, splitting additionally at `split_date`
/// (the licence's current-version effective date) when supplied.
///
/// The returned cycles exactly tile `[start, end]`: the first starts on the
/// format's start date, each boundary begins a new cycle, and the last ends
/// on the format's effective end. An open-ended format is closed off one
/// full year ahead of `today`, minus a day.
pub fn cycles_for_format(
  format: &LegacyFormat,
  split_date: Option<NaiveDate>,
  today: NaiveDate,
) -> Result<Vec<Cycle>> {
  if format.frequency == ReturnsFrequency::Fortnight {
    return Err(Error::UnsupportedFrequency(
      format.frequency.as_str().to_owned(),
    ));
  }

  let start = format.start_date;
  let end = format.end_date.unwrap_or_else(|| open_ended_end(today));
  if end < start {
    // A licence revoked before its obligations began leaves a degenerate
    // window in the extract.
    return Ok(Vec::new());
  }

  // Collect boundary dates strictly inside (start, end); a boundary equal
  // to either endpoint would produce an empty cycle and is discarded.
  let is_summer = format.production_month.is_summer;
  let (month, day) = if is_summer { (11, 1) } else { (4, 1) };

  let mut boundaries = BTreeSet::new();
  for year in start.year()..=end.year() {
    let boundary = ymd(year, month, day);
    if start < boundary && boundary < end {
      boundaries.insert(boundary);
    }
  }
  if let Some(split) = split_date {
    if start < split && split < end {
      boundaries.insert(split);
    }
  }

  // Pair consecutive boundaries into cycles.
  let mut cycles = Vec::with_capacity(boundaries.len() + 1);
  let mut cursor = start;
  for boundary in boundaries {
    cycles.push(Cycle {
      start_date: cursor,
      end_date:   prev_day(boundary),
      is_current: false,
    });
    cursor = boundary;
  }
  cycles.push(Cycle { start_date: cursor, end_date: end, is_current: false });

  for cycle in &mut cycles {
    cycle.is_current = split_date.is_none_or(|s| cycle.start_date >= s);
  }

  Ok(cycles)
}

// ─── Natural windows ─────────────────────────────────────────────────────────

/// The next scheme end date (31 Oct / 31 Mar) on or after `date`. This is
/// the un-truncated end a cycle would have had without a version change.
pub fn natural_cycle_end(date: NaiveDate, is_summer: bool) -> NaiveDate {
  let (month, day) = if is_summer { (10, 31) } else { (3, 31) };
  let candidate = ymd(date.year(), month, day);
  if date <= candidate { candidate } else { ymd(date.year() + 1, month, day) }
}

/// The full scheme window containing `date`.
pub fn natural_window(date: NaiveDate, is_summer: bool) -> CycleWindow {
  let end_date = natural_cycle_end(date, is_summer);
  let start_date = if is_summer {
    ymd(end_date.year() - 1, 11, 1)
  } else {
    ymd(end_date.year() - 1, 4, 1)
  };
  CycleWindow { start_date, end_date, is_summer }
}

// ─── Date helpers ────────────────────────────────────────────────────────────

fn open_ended_end(today: NaiveDate) -> NaiveDate {
  prev_day(next_year(today))
}

fn next_year(date: NaiveDate) -> NaiveDate {
  date
    .checked_add_months(Months::new(12))
    .expect("date arithmetic within supported range")
}

fn prev_day(date: NaiveDate) -> NaiveDate {
  date
    .checked_sub_days(Days::new(1))
    .expect("date arithmetic within supported range")
}

/// Calendar anchors (1 Nov, 1 Apr, 31 Oct, 31 Mar) are valid in every year
/// chrono can represent.
fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
  NaiveDate::from_ymd_opt(year, month, day).expect("valid calendar anchor")
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::legacy::{AbstractionPeriod, ProductionMonth};

  fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  fn format(
    is_summer: bool,
    start: NaiveDate,
    end: Option<NaiveDate>,
  ) -> LegacyFormat {
    LegacyFormat {
      format_id: 10021668,
      region_code: "1".into(),
      licence_ref: "03/28/60/0032".into(),
      frequency: ReturnsFrequency::Month,
      production_month: ProductionMonth { is_summer, is_upload: false },
      abstraction_period: AbstractionPeriod::default(),
      start_date: start,
      end_date: end,
      next_version_reason: None,
      site_description: None,
      purposes: vec![],
    }
  }

  #[test]
  fn summer_format_with_split_boundary() {
    let f = format(true, date(2016, 5, 23), Some(date(2018, 3, 30)));
    let cycles =
      cycles_for_format(&f, Some(date(2017, 6, 1)), date(2018, 1, 1)).unwrap();

    let expected = [
      (date(2016, 5, 23), date(2016, 10, 31), false),
      (date(2016, 11, 1), date(2017, 5, 31), false),
      (date(2017, 6, 1), date(2017, 10, 31), true),
      (date(2017, 11, 1), date(2018, 3, 30), true),
    ];
    assert_eq!(cycles.len(), expected.len());
    for (cycle, (start, end, current)) in cycles.iter().zip(expected) {
      assert_eq!(cycle.start_date, start);
      assert_eq!(cycle.end_date, end);
      assert_eq!(cycle.is_current, current);
    }

    // No boundary coincides with the format's own endpoints.
    assert_eq!(cycles.first().unwrap().start_date, f.start_date);
    assert_eq!(cycles.last().unwrap().end_date, f.end_date.unwrap());
  }

  #[test]
  fn winter_boundaries_fall_on_first_of_april() {
    let f = format(false, date(2019, 1, 15), Some(date(2021, 2, 1)));
    let cycles = cycles_for_format(&f, None, date(2020, 1, 1)).unwrap();

    assert_eq!(cycles.len(), 3);
    assert_eq!(cycles[0].end_date, date(2019, 3, 31));
    assert_eq!(cycles[1].start_date, date(2019, 4, 1));
    assert_eq!(cycles[1].end_date, date(2020, 3, 31));
    assert_eq!(cycles[2].start_date, date(2020, 4, 1));
    assert_eq!(cycles[2].end_date, date(2021, 2, 1));
    // Without a split date every cycle counts as current.
    assert!(cycles.iter().all(|c| c.is_current));
  }

  #[test]
  fn cycles_tile_the_window() {
    let f = format(true, date(2014, 7, 9), Some(date(2019, 2, 11)));
    let cycles =
      cycles_for_format(&f, Some(date(2016, 2, 1)), date(2018, 1, 1)).unwrap();

    assert_eq!(cycles.first().unwrap().start_date, f.start_date);
    assert_eq!(cycles.last().unwrap().end_date, f.end_date.unwrap());
    for pair in cycles.windows(2) {
      assert_eq!(
        pair[1].start_date,
        pair[0].end_date.checked_add_days(Days::new(1)).unwrap(),
      );
    }
  }

  #[test]
  fn boundary_equal_to_endpoint_is_discarded() {
    // Format starting exactly on 1 Nov: no boundary at the start.
    let f = format(true, date(2016, 11, 1), Some(date(2017, 11, 1)));
    let cycles = cycles_for_format(&f, None, date(2017, 1, 1)).unwrap();
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].start_date, date(2016, 11, 1));
    assert_eq!(cycles[0].end_date, date(2017, 11, 1));
  }

  #[test]
  fn split_outside_window_is_ignored() {
    let f = format(true, date(2016, 5, 23), Some(date(2016, 9, 1)));
    let cycles =
      cycles_for_format(&f, Some(date(2020, 1, 1)), date(2016, 6, 1)).unwrap();
    assert_eq!(cycles.len(), 1);
    assert!(!cycles[0].is_current);
  }

  #[test]
  fn open_ended_format_is_projected_a_year_ahead() {
    let f = format(false, date(2023, 6, 1), None);
    let cycles = cycles_for_format(&f, None, date(2024, 2, 10)).unwrap();
    assert_eq!(cycles.last().unwrap().end_date, date(2025, 2, 9));
  }

  #[test]
  fn fortnightly_frequency_is_rejected() {
    let mut f = format(true, date(2016, 5, 23), Some(date(2018, 3, 30)));
    f.frequency = ReturnsFrequency::Fortnight;
    let err = cycles_for_format(&f, None, date(2017, 1, 1)).unwrap_err();
    assert!(matches!(err, Error::UnsupportedFrequency(_)));
  }

  #[test]
  fn degenerate_window_yields_no_cycles() {
    let f = format(true, date(2018, 5, 1), Some(date(2018, 4, 1)));
    assert!(cycles_for_format(&f, None, date(2019, 1, 1)).unwrap().is_empty());
  }

  #[test]
  fn natural_window_contains_date() {
    let w = natural_window(date(2017, 3, 15), true);
    assert_eq!(w.start_date, date(2016, 11, 1));
    assert_eq!(w.end_date, date(2017, 10, 31));

    let w = natural_window(date(2017, 3, 31), false);
    assert_eq!(w.start_date, date(2016, 4, 1));
    assert_eq!(w.end_date, date(2017, 3, 31));

    let w = natural_window(date(2017, 4, 1), false);
    assert_eq!(w.start_date, date(2017, 4, 1));
    assert_eq!(w.end_date, date(2018, 3, 31));
  }

  #[test]
  fn natural_cycle_end_rolls_forward() {
    assert_eq!(natural_cycle_end(date(2017, 10, 31), true), date(2017, 10, 31));
    assert_eq!(natural_cycle_end(date(2017, 11, 1), true), date(2018, 10, 31));
    assert_eq!(natural_cycle_end(date(2020, 2, 1), false), date(2020, 3, 31));
  }
}
