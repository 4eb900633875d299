//! Row-level loaders for the legacy extract tables.
//!
//! The production loader is a bulk CSV import that lives upstream of this
//! engine; these single-row inserts exist so integration tests (and local
//! debugging) can stage extract state without it. Values are written exactly
//! as the extract encodes them — `DD/MM/YYYY` text with the literal `null`
//! for absent fields (`YYYYMMDD` in the archive table).

use crate::{Result, SqliteStore};

// ─── Seed rows ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct LicenceSeed {
  pub licence_ref:          String,
  pub region_code:          String,
  pub expiry_date:          String,
  pub lapsed_date:          String,
  pub revoked_date:         String,
  pub curr_version_st_date: String,
}

impl Default for LicenceSeed {
  fn default() -> Self {
    Self {
      licence_ref:          String::new(),
      region_code:          "1".into(),
      expiry_date:          "null".into(),
      lapsed_date:          "null".into(),
      revoked_date:         "null".into(),
      curr_version_st_date: "null".into(),
    }
  }
}

#[derive(Debug, Clone)]
pub struct FormatSeed {
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

impl Default for FormatSeed {
  fn default() -> Self {
    Self {
      format_id:            0,
      region_code:          "1".into(),
      licence_ref:          String::new(),
      returns_freq:         "M".into(),
      form_prodn_month:     45,
      abs_period_st_day:    "null".into(),
      abs_period_st_month:  "null".into(),
      abs_period_end_day:   "null".into(),
      abs_period_end_month: "null".into(),
      eff_st_date:          "null".into(),
      eff_end_date:         "null".into(),
      timeltd_st_date:      "null".into(),
      timeltd_end_date:     "null".into(),
      next_mod_reason:      "null".into(),
      site_descr:           "null".into(),
    }
  }
}

#[derive(Debug, Clone)]
pub struct FormLogSeed {
  pub region_code:   String,
  pub format_id:     i64,
  pub date_from:     String,
  pub date_to:       String,
  pub received_date: String,
}

impl Default for FormLogSeed {
  fn default() -> Self {
    Self {
      region_code:   "1".into(),
      format_id:     0,
      date_from:     "null".into(),
      date_to:       "null".into(),
      received_date: "null".into(),
    }
  }
}

#[derive(Debug, Clone)]
pub struct LineSeed {
  pub region_code:     String,
  pub format_id:       i64,
  pub start_date:      String,
  pub end_date:        String,
  pub quantity:        String,
  pub reading_type:    String,
  pub unit_of_measure: String,
}

impl Default for LineSeed {
  fn default() -> Self {
    Self {
      region_code:     "1".into(),
      format_id:       0,
      start_date:      "null".into(),
      end_date:        "null".into(),
      quantity:        "null".into(),
      reading_type:    "M".into(),
      unit_of_measure: "M".into(),
    }
  }
}

// ─── Loaders ─────────────────────────────────────────────────────────────────

impl SqliteStore {
  pub async fn seed_licence(&self, row: LicenceSeed) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO nald_licences (
             licence_ref, region_code, expiry_date, lapsed_date,
             revoked_date, curr_version_st_date
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            row.licence_ref,
            row.region_code,
            row.expiry_date,
            row.lapsed_date,
            row.revoked_date,
            row.curr_version_st_date,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  pub async fn seed_format(&self, row: FormatSeed) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO nald_return_formats (
             format_id, region_code, licence_ref, returns_freq,
             form_prodn_month, abs_period_st_day, abs_period_st_month,
             abs_period_end_day, abs_period_end_month, eff_st_date,
             eff_end_date, timeltd_st_date, timeltd_end_date,
             next_mod_reason, site_descr
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                     ?14, ?15)",
          rusqlite::params![
            row.format_id,
            row.region_code,
            row.licence_ref,
            row.returns_freq,
            row.form_prodn_month,
            row.abs_period_st_day,
            row.abs_period_st_month,
            row.abs_period_end_day,
            row.abs_period_end_month,
            row.eff_st_date,
            row.eff_end_date,
            row.timeltd_st_date,
            row.timeltd_end_date,
            row.next_mod_reason,
            row.site_descr,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  pub async fn seed_purpose(
    &self,
    region_code: &str,
    format_id: i64,
    purpose_descr: &str,
  ) -> Result<()> {
    let region_code = region_code.to_owned();
    let purpose_descr = purpose_descr.to_owned();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO nald_return_purposes (
             region_code, format_id, purpose_descr
           ) VALUES (?1, ?2, ?3)",
          rusqlite::params![region_code, format_id, purpose_descr],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  pub async fn seed_form_log(&self, row: FormLogSeed) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO nald_form_logs (
             region_code, format_id, date_from, date_to, received_date
           ) VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![
            row.region_code,
            row.format_id,
            row.date_from,
            row.date_to,
            row.received_date,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  pub async fn seed_line(&self, row: LineSeed) -> Result<()> {
    self.seed_line_into("nald_return_lines", row).await
  }

  pub async fn seed_archive_line(&self, row: LineSeed) -> Result<()> {
    self.seed_line_into("nald_line_archive", row).await
  }

  async fn seed_line_into(
    &self,
    table: &'static str,
    row: LineSeed,
  ) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        let sql = format!(
          "INSERT INTO {table} (
             region_code, format_id, start_date, end_date, quantity,
             reading_type, unit_of_measure
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
        );
        conn.execute(
          &sql,
          rusqlite::params![
            row.region_code,
            row.format_id,
            row.start_date,
            row.end_date,
            row.quantity,
            row.reading_type,
            row.unit_of_measure,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Drop a format and its dependent extract rows — mirrors an upstream
  /// extract reload that no longer carries the configuration.
  pub async fn purge_format(
    &self,
    region_code: &str,
    format_id: i64,
  ) -> Result<()> {
    let region_code = region_code.to_owned();
    self
      .conn
      .call(move |conn| {
        for table in [
          "nald_return_formats",
          "nald_return_purposes",
          "nald_form_logs",
          "nald_return_lines",
          "nald_line_archive",
        ] {
          let sql = format!(
            "DELETE FROM {table} WHERE region_code = ?1 AND format_id = ?2"
          );
          conn.execute(&sql, rusqlite::params![region_code, format_id])?;
        }
        Ok(())
      })
      .await?;
    Ok(())
  }
}
