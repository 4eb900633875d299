//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Target columns use ISO 8601 dates, RFC 3339 timestamps, and real NULLs.
//! The legacy extract instead stores `DD/MM/YYYY` text with the literal
//! string `null` for absent values (`YYYYMMDD` in the archive line table);
//! that sentinel encoding is confined to this module — nothing above the
//! store boundary ever sees it.

use chrono::{DateTime, NaiveDate, Utc};
use sluice_core::{
  legacy::{
    AbstractionPeriod, LegacyFormat, LegacyLine, ProductionMonth, ReadingType,
    ReturnsFrequency, SubmissionLog,
  },
  returns::ReturnStatus,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Target-side codecs ──────────────────────────────────────────────────────

pub fn encode_date(date: NaiveDate) -> String {
  date.format("%Y-%m-%d").to_string()
}

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339()
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

pub fn encode_uuid(id: Uuid) -> String {
  id.hyphenated().to_string()
}

pub fn decode_uuid(s: &str) -> Result<Uuid> {
  Ok(Uuid::parse_str(s)?)
}

pub fn decode_status(s: &str) -> Result<ReturnStatus> {
  match s {
    "due" => Ok(ReturnStatus::Due),
    "completed" => Ok(ReturnStatus::Completed),
    "void" => Ok(ReturnStatus::Void),
    other => Err(Error::DateParse(format!("unknown status: {other:?}"))),
  }
}

// ─── Legacy-side codecs ──────────────────────────────────────────────────────

/// Decode a `DD/MM/YYYY` extract date; the literal `null` means absent.
pub fn decode_nald_date(s: &str) -> Result<Option<NaiveDate>> {
  if s == "null" {
    return Ok(None);
  }
  NaiveDate::parse_from_str(s, "%d/%m/%Y")
    .map(Some)
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

/// Decode a `YYYYMMDD` archive date; the literal `null` means absent.
pub fn decode_archive_date(s: &str) -> Result<Option<NaiveDate>> {
  if s == "null" {
    return Ok(None);
  }
  NaiveDate::parse_from_str(s, "%Y%m%d")
    .map(Some)
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

pub fn decode_nald_number(s: &str) -> Result<Option<f64>> {
  if s == "null" {
    return Ok(None);
  }
  s.parse::<f64>()
    .map(Some)
    .map_err(|e| Error::DateParse(format!("bad number {s:?}: {e}")))
}

pub fn decode_nald_int(s: &str) -> Result<Option<u32>> {
  if s == "null" {
    return Ok(None);
  }
  s.parse::<u32>()
    .map(Some)
    .map_err(|e| Error::DateParse(format!("bad integer {s:?}: {e}")))
}

pub fn decode_nald_text(s: String) -> Option<String> {
  if s == "null" { None } else { Some(s) }
}

/// Map an extract unit code to the target unit label.
pub fn decode_nald_unit(code: &str) -> String {
  match code {
    "M" => "m³".to_owned(),
    "L" => "l".to_owned(),
    "GAL" => "gal".to_owned(),
    other => other.to_ascii_lowercase(),
  }
}

// ─── Raw legacy rows ─────────────────────────────────────────────────────────

/// Raw strings read directly from a `nald_licences` row.
pub struct RawLicence {
  pub licence_ref:          String,
  pub region_code:          String,
  pub expiry_date:          String,
  pub lapsed_date:          String,
  pub revoked_date:         String,
  pub curr_version_st_date: String,
}

impl RawLicence {
  pub fn current_version_start(&self) -> Result<Option<NaiveDate>> {
    decode_nald_date(&self.curr_version_st_date)
  }
}

/// Raw strings read directly from a `nald_return_formats` row.
pub struct RawFormat {
  pub format_id:            i64,
  pub region_code:          String,
  pub licence_ref:          String,
  pub returns_freq:         String,
  pub form_prodn_month:     i64,
  pub abs_period_st_day:    String,
  pub abs_period_st_month:  String,
  pub abs_period_end_day:   String,
  pub abs_period_end_month: String,
  pub eff_st_date:          String,
  pub eff_end_date:         String,
  pub timeltd_st_date:      String,
  pub timeltd_end_date:     String,
  pub next_mod_reason:      String,
  pub site_descr:           String,
}

impl RawFormat {
  /// Flatten the raw format plus its licence row into the effective window
  /// the calculator works with: the later of version and time-limited
  /// starts, and the earliest of version end, time-limited end, and the
  /// licence's expiry/lapse/revocation dates.
  pub fn into_format(
    self,
    licence: &RawLicence,
    purposes: Vec<String>,
  ) -> Result<LegacyFormat> {
    let eff_start = decode_nald_date(&self.eff_st_date)?.ok_or_else(|| {
      Error::DateParse(format!(
        "format {} has no effective start date",
        self.format_id
      ))
    })?;
    let start_date = match decode_nald_date(&self.timeltd_st_date)? {
      Some(tl) if tl > eff_start => tl,
      _ => eff_start,
    };

    let end_date = [
      decode_nald_date(&self.eff_end_date)?,
      decode_nald_date(&self.timeltd_end_date)?,
      decode_nald_date(&licence.expiry_date)?,
      decode_nald_date(&licence.lapsed_date)?,
      decode_nald_date(&licence.revoked_date)?,
    ]
    .into_iter()
    .flatten()
    .min();

    Ok(LegacyFormat {
      format_id: self.format_id,
      region_code: self.region_code,
      licence_ref: self.licence_ref,
      frequency: ReturnsFrequency::from_nald_code(&self.returns_freq)
        .map_err(Error::Core)?,
      production_month: ProductionMonth::from_code(self.form_prodn_month as u32)
        .map_err(Error::Core)?,
      abstraction_period: AbstractionPeriod {
        start_day:   decode_nald_int(&self.abs_period_st_day)?,
        start_month: decode_nald_int(&self.abs_period_st_month)?,
        end_day:     decode_nald_int(&self.abs_period_end_day)?,
        end_month:   decode_nald_int(&self.abs_period_end_month)?,
      },
      start_date,
      end_date,
      next_version_reason: decode_nald_text(self.next_mod_reason),
      site_description: decode_nald_text(self.site_descr),
      purposes,
    })
  }
}

/// Raw strings read directly from a `nald_form_logs` row.
pub struct RawFormLog {
  pub date_from:     String,
  pub date_to:       String,
  pub received_date: String,
}

impl RawFormLog {
  pub fn into_log(self) -> Result<SubmissionLog> {
    let start_date = decode_nald_date(&self.date_from)?
      .ok_or_else(|| Error::DateParse("form log has no start date".into()))?;
    let end_date = decode_nald_date(&self.date_to)?
      .ok_or_else(|| Error::DateParse("form log has no end date".into()))?;
    Ok(SubmissionLog {
      start_date,
      end_date,
      received: decode_nald_date(&self.received_date)?,
    })
  }
}

/// Raw strings read from `nald_return_lines` or `nald_line_archive`.
pub struct RawLine {
  pub start_date:      String,
  pub end_date:        String,
  pub quantity:        String,
  pub reading_type:    String,
  pub unit_of_measure: String,
}

impl RawLine {
  pub fn into_line(self, archive: bool) -> Result<LegacyLine> {
    let decode = if archive { decode_archive_date } else { decode_nald_date };
    let start_date = decode(&self.start_date)?
      .ok_or_else(|| Error::DateParse("line has no start date".into()))?;
    let end_date = decode(&self.end_date)?
      .ok_or_else(|| Error::DateParse("line has no end date".into()))?;
    Ok(LegacyLine {
      start_date,
      end_date,
      quantity: decode_nald_number(&self.quantity)?,
      reading_type: ReadingType::from_nald_code(&self.reading_type)
        .map_err(Error::Core)?,
      unit: decode_nald_unit(&self.unit_of_measure),
    })
  }
}
