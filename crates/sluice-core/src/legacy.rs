//! The legacy-extract input model.
//!
//! Rows arrive here fully converted: the extract's `DD/MM/YYYY`-with-`'null'`
//! sentinel encoding is resolved to `Option<NaiveDate>` at the store boundary
//! (`sluice-store-sqlite::encode`), so nothing in this crate ever sees a
//! string sentinel. Everything in this module is read-only input; the engine
//! never mutates legacy state.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Reporting frequency ─────────────────────────────────────────────────────

/// How often the licence holder must report readings.
///
/// `Fortnight` exists in the extract but has no counterpart in the target
/// model; the cycle calculator rejects it with a typed error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnsFrequency {
  Day,
  Week,
  Fortnight,
  Month,
  Quarter,
  Year,
}

impl ReturnsFrequency {
  /// The string stored in the target `returns_frequency` column.
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Day => "day",
      Self::Week => "week",
      Self::Fortnight => "fortnight",
      Self::Month => "month",
      Self::Quarter => "quarter",
      Self::Year => "year",
    }
  }

  /// Decode the single-letter code used by the extract.
  pub fn from_nald_code(code: &str) -> Result<Self> {
    match code {
      "D" => Ok(Self::Day),
      "W" => Ok(Self::Week),
      "F" => Ok(Self::Fortnight),
      "M" => Ok(Self::Month),
      "Q" => Ok(Self::Quarter),
      "A" => Ok(Self::Year),
      other => Err(Error::UnknownFrequency(other.to_owned())),
    }
  }

  pub fn parse(s: &str) -> Result<Self> {
    match s {
      "day" => Ok(Self::Day),
      "week" => Ok(Self::Week),
      "fortnight" => Ok(Self::Fortnight),
      "month" => Ok(Self::Month),
      "quarter" => Ok(Self::Quarter),
      "year" => Ok(Self::Year),
      other => Err(Error::UnknownFrequency(other.to_owned())),
    }
  }
}

// ─── Production month ────────────────────────────────────────────────────────

/// The two axes packed into the extract's `FORM_PRODN_MONTH` code: which
/// year-boundary scheme the format follows, and whether submissions arrive
/// through the bulk-upload channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionMonth {
  pub is_summer: bool,
  pub is_upload: bool,
}

impl ProductionMonth {
  pub fn from_code(code: u32) -> Result<Self> {
    let is_summer = match code {
      45 | 65 | 70 => true,
      46 | 66 | 80 => false,
      other => return Err(Error::UnknownProductionMonth(other)),
    };
    let is_upload = matches!(code, 65 | 66 | 70 | 80);
    Ok(Self { is_summer, is_upload })
  }
}

// ─── Abstraction period ──────────────────────────────────────────────────────

/// Day/month bounds of the licensed abstraction period. Carried through to
/// the return-log metadata; not used by any cycle computation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbstractionPeriod {
  pub start_day:   Option<u32>,
  pub start_month: Option<u32>,
  pub end_day:     Option<u32>,
  pub end_month:   Option<u32>,
}

// ─── Format ──────────────────────────────────────────────────────────────────

/// One legacy return format/version pairing, flattened by the store adapter.
///
/// `start_date` / `end_date` are the *effective* window: the later of the
/// version start and any time-limited start, and the earliest of the version
/// end, time-limited end, and the licence's expiry/lapse/revocation dates.
/// `end_date` is `None` for an open-ended obligation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyFormat {
  pub format_id:           i64,
  pub region_code:         String,
  pub licence_ref:         String,
  pub frequency:           ReturnsFrequency,
  pub production_month:    ProductionMonth,
  pub abstraction_period:  AbstractionPeriod,
  pub start_date:          NaiveDate,
  pub end_date:            Option<NaiveDate>,
  /// Change-reason code of the version that follows this one, when the
  /// format was truncated by a version change. Drives the split-cycle
  /// due-date exception.
  pub next_version_reason: Option<String>,
  pub site_description:    Option<String>,
  pub purposes:            Vec<String>,
}

// ─── Submission logs ─────────────────────────────────────────────────────────

/// One legacy form log: the record that a return form was issued (and
/// possibly received) for a window. A cycle with no intersecting log was
/// configuration that never activated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionLog {
  pub start_date: NaiveDate,
  pub end_date:   NaiveDate,
  /// `None` means the form was never received, not "received on an unknown
  /// date".
  pub received:   Option<NaiveDate>,
}

// ─── Granular lines ──────────────────────────────────────────────────────────

/// How a legacy reading was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadingType {
  Measured,
  Derived,
}

impl ReadingType {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Measured => "measured",
      Self::Derived => "derived",
    }
  }

  /// Decode the single-letter code used by the extract.
  pub fn from_nald_code(code: &str) -> Result<Self> {
    match code {
      "M" => Ok(Self::Measured),
      "D" => Ok(Self::Derived),
      other => Err(Error::UnknownReadingType(other.to_owned())),
    }
  }
}

/// One granular legacy reading. `quantity: None` means "not reported",
/// which is distinct from a reported zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyLine {
  pub start_date:   NaiveDate,
  pub end_date:     NaiveDate,
  pub quantity:     Option<f64>,
  pub reading_type: ReadingType,
  pub unit:         String,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn frequency_codes_round_trip() {
    for (code, freq) in [
      ("D", ReturnsFrequency::Day),
      ("W", ReturnsFrequency::Week),
      ("F", ReturnsFrequency::Fortnight),
      ("M", ReturnsFrequency::Month),
      ("Q", ReturnsFrequency::Quarter),
      ("A", ReturnsFrequency::Year),
    ] {
      assert_eq!(ReturnsFrequency::from_nald_code(code).unwrap(), freq);
      assert_eq!(ReturnsFrequency::parse(freq.as_str()).unwrap(), freq);
    }
    assert!(matches!(
      ReturnsFrequency::from_nald_code("X"),
      Err(Error::UnknownFrequency(_))
    ));
  }

  #[test]
  fn production_month_axes() {
    let pm = ProductionMonth::from_code(45).unwrap();
    assert!(pm.is_summer);
    assert!(!pm.is_upload);

    let pm = ProductionMonth::from_code(66).unwrap();
    assert!(!pm.is_summer);
    assert!(pm.is_upload);

    assert!(matches!(
      ProductionMonth::from_code(12),
      Err(Error::UnknownProductionMonth(12))
    ));
  }
}
