//! [`LegacySource`] implementation — read-only queries over the extract.
//!
//! Access patterns are exact-match on region code + internal identifiers;
//! window filtering happens in Rust after the sentinel dates are decoded,
//! because the extract's `DD/MM/YYYY` text does not collate chronologically.

use chrono::NaiveDate;
use rusqlite::OptionalExtension as _;
use sluice_core::{
  legacy::{LegacyFormat, LegacyLine, SubmissionLog},
  store::LegacySource,
};

use crate::{
  Error, Result, SqliteStore,
  encode::{RawFormLog, RawFormat, RawLicence, RawLine},
};

impl SqliteStore {
  async fn raw_licence(&self, licence_ref: &str) -> Result<Option<RawLicence>> {
    let licence_ref = licence_ref.to_owned();
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT licence_ref, region_code, expiry_date, lapsed_date,
                      revoked_date, curr_version_st_date
               FROM nald_licences
               WHERE licence_ref = ?1",
              rusqlite::params![licence_ref],
              |row| {
                Ok(RawLicence {
                  licence_ref:          row.get(0)?,
                  region_code:          row.get(1)?,
                  expiry_date:          row.get(2)?,
                  lapsed_date:          row.get(3)?,
                  revoked_date:         row.get(4)?,
                  curr_version_st_date: row.get(5)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;
    Ok(raw)
  }

  async fn raw_lines(
    &self,
    table: &'static str,
    region_code: &str,
    format_id: i64,
  ) -> Result<Vec<RawLine>> {
    let region_code = region_code.to_owned();
    let raws = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT start_date, end_date, quantity, reading_type,
                  unit_of_measure
           FROM {table}
           WHERE region_code = ?1 AND format_id = ?2"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![region_code, format_id], |row| {
            Ok(RawLine {
              start_date:      row.get(0)?,
              end_date:        row.get(1)?,
              quantity:        row.get(2)?,
              reading_type:    row.get(3)?,
              unit_of_measure: row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(raws)
  }

  fn window_lines(
    raws: Vec<RawLine>,
    archive: bool,
    start: NaiveDate,
    end: NaiveDate,
  ) -> Result<Vec<LegacyLine>> {
    let mut lines = Vec::with_capacity(raws.len());
    for raw in raws {
      let line = raw.into_line(archive)?;
      // The sweep attributes a line by its end date, so the window filter
      // matches on that too.
      if line.end_date >= start && line.end_date <= end {
        lines.push(line);
      }
    }
    Ok(lines)
  }
}

impl LegacySource for SqliteStore {
  type Error = Error;

  async fn licence_refs(&self) -> Result<Vec<String>> {
    let refs = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT DISTINCT licence_ref FROM nald_return_formats
           ORDER BY licence_ref",
        )?;
        let rows = stmt
          .query_map([], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(refs)
  }

  async fn current_version_start(
    &self,
    licence_ref: &str,
  ) -> Result<Option<NaiveDate>> {
    match self.raw_licence(licence_ref).await? {
      Some(licence) => licence.current_version_start(),
      None => Ok(None),
    }
  }

  async fn formats_for_licence(
    &self,
    licence_ref: &str,
  ) -> Result<Vec<LegacyFormat>> {
    let licence = self
      .raw_licence(licence_ref)
      .await?
      .ok_or_else(|| Error::LicenceNotFound(licence_ref.to_owned()))?;

    let licence_ref = licence_ref.to_owned();
    let raws: Vec<(RawFormat, Vec<String>)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT format_id, region_code, licence_ref, returns_freq,
                  form_prodn_month, abs_period_st_day, abs_period_st_month,
                  abs_period_end_day, abs_period_end_month, eff_st_date,
                  eff_end_date, timeltd_st_date, timeltd_end_date,
                  next_mod_reason, site_descr
           FROM nald_return_formats
           WHERE licence_ref = ?1
           ORDER BY format_id",
        )?;
        let formats = stmt
          .query_map(rusqlite::params![licence_ref], |row| {
            Ok(RawFormat {
              format_id:            row.get(0)?,
              region_code:          row.get(1)?,
              licence_ref:          row.get(2)?,
              returns_freq:         row.get(3)?,
              form_prodn_month:     row.get(4)?,
              abs_period_st_day:    row.get(5)?,
              abs_period_st_month:  row.get(6)?,
              abs_period_end_day:   row.get(7)?,
              abs_period_end_month: row.get(8)?,
              eff_st_date:          row.get(9)?,
              eff_end_date:         row.get(10)?,
              timeltd_st_date:      row.get(11)?,
              timeltd_end_date:     row.get(12)?,
              next_mod_reason:      row.get(13)?,
              site_descr:           row.get(14)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut purpose_stmt = conn.prepare(
          "SELECT purpose_descr FROM nald_return_purposes
           WHERE region_code = ?1 AND format_id = ?2
           ORDER BY purpose_descr",
        )?;
        let mut out = Vec::with_capacity(formats.len());
        for format in formats {
          let purposes = purpose_stmt
            .query_map(
              rusqlite::params![format.region_code, format.format_id],
              |row| row.get(0),
            )?
            .collect::<rusqlite::Result<Vec<String>>>()?;
          out.push((format, purposes));
        }
        Ok(out)
      })
      .await?;

    raws
      .into_iter()
      .map(|(format, purposes)| format.into_format(&licence, purposes))
      .collect()
  }

  async fn submission_logs(
    &self,
    region_code: &str,
    format_id: i64,
  ) -> Result<Vec<SubmissionLog>> {
    let region_code = region_code.to_owned();
    let raws: Vec<RawFormLog> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT date_from, date_to, received_date
           FROM nald_form_logs
           WHERE region_code = ?1 AND format_id = ?2",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![region_code, format_id], |row| {
            Ok(RawFormLog {
              date_from:     row.get(0)?,
              date_to:       row.get(1)?,
              received_date: row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let mut logs = raws
      .into_iter()
      .map(RawFormLog::into_log)
      .collect::<Result<Vec<_>>>()?;
    logs.sort_by_key(|log| (log.start_date, log.end_date));
    Ok(logs)
  }

  async fn lines_for_window(
    &self,
    region_code: &str,
    format_id: i64,
    start: NaiveDate,
    end: NaiveDate,
  ) -> Result<Vec<LegacyLine>> {
    let raws = self.raw_lines("nald_return_lines", region_code, format_id).await?;
    Self::window_lines(raws, false, start, end)
  }

  async fn archive_lines_for_window(
    &self,
    region_code: &str,
    format_id: i64,
    start: NaiveDate,
    end: NaiveDate,
  ) -> Result<Vec<LegacyLine>> {
    let raws = self.raw_lines("nald_line_archive", region_code, format_id).await?;
    Self::window_lines(raws, true, start, end)
  }
}
