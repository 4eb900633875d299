//! [`SqliteStore`] — the SQLite implementation of [`ReturnStore`].

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use sluice_core::{
  cycle::CycleWindow,
  returns::{ReturnStatus, wrls_cutover},
  store::{InsertOutcome, NewReturnLog, NewSubmission, ReturnLogPatch, ReturnStore},
};

use crate::{
  Error, Result,
  encode::{
    decode_date, decode_dt, decode_status, decode_uuid, encode_date, encode_dt,
    encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Sluice store backed by a single SQLite file holding both the loaded
/// legacy extract and the target relations.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Read-back rows ──────────────────────────────────────────────────────────

/// A fully-decoded `return_logs` row, used by operational tooling and the
/// integration tests.
#[derive(Debug, Clone)]
pub struct ReturnLogRow {
  pub return_id:       String,
  pub licence_ref:     String,
  pub start_date:      NaiveDate,
  pub end_date:        NaiveDate,
  pub due_date:        NaiveDate,
  pub received_date:   Option<NaiveDate>,
  pub status:          ReturnStatus,
  pub source:          String,
  pub frequency:       String,
  pub return_cycle_id: Uuid,
  pub metadata:        serde_json::Value,
  pub created_at:      DateTime<Utc>,
  pub updated_at:      DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ReturnCycleRow {
  pub return_cycle_id:      Uuid,
  pub start_date:           NaiveDate,
  pub end_date:             NaiveDate,
  pub is_summer:            bool,
  pub is_submitted_in_wrls: bool,
  pub created_at:           DateTime<Utc>,
  pub updated_at:           DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct VersionRow {
  pub version_id:     Uuid,
  pub return_id:      String,
  pub version_number: i64,
  pub nil_return:     bool,
}

#[derive(Debug, Clone)]
pub struct LineRow {
  pub line_id:      Uuid,
  pub start_date:   NaiveDate,
  pub end_date:     NaiveDate,
  pub quantity:     Option<f64>,
  pub time_period:  String,
  pub reading_type: String,
  pub unit:         String,
}

struct RawReturnLog {
  return_id:       String,
  licence_ref:     String,
  start_date:      String,
  end_date:        String,
  due_date:        String,
  received_date:   Option<String>,
  status:          String,
  source:          String,
  frequency:       String,
  return_cycle_id: String,
  metadata:        String,
  created_at:      String,
  updated_at:      String,
}

impl RawReturnLog {
  fn into_row(self) -> Result<ReturnLogRow> {
    Ok(ReturnLogRow {
      return_id:       self.return_id,
      licence_ref:     self.licence_ref,
      start_date:      decode_date(&self.start_date)?,
      end_date:        decode_date(&self.end_date)?,
      due_date:        decode_date(&self.due_date)?,
      received_date:   self
        .received_date
        .as_deref()
        .map(decode_date)
        .transpose()?,
      status:          decode_status(&self.status)?,
      source:          self.source,
      frequency:       self.frequency,
      return_cycle_id: decode_uuid(&self.return_cycle_id)?,
      metadata:        serde_json::from_str(&self.metadata)?,
      created_at:      decode_dt(&self.created_at)?,
      updated_at:      decode_dt(&self.updated_at)?,
    })
  }
}

impl SqliteStore {
  pub async fn get_return_log(
    &self,
    return_id: &str,
  ) -> Result<Option<ReturnLogRow>> {
    let return_id = return_id.to_owned();
    let raw: Option<RawReturnLog> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT return_id, licence_ref, start_date, end_date, due_date,
                      received_date, status, source, returns_frequency,
                      return_cycle_id, metadata, created_at, updated_at
               FROM return_logs
               WHERE return_id = ?1",
              rusqlite::params![return_id],
              |row| {
                Ok(RawReturnLog {
                  return_id:       row.get(0)?,
                  licence_ref:     row.get(1)?,
                  start_date:      row.get(2)?,
                  end_date:        row.get(3)?,
                  due_date:        row.get(4)?,
                  received_date:   row.get(5)?,
                  status:          row.get(6)?,
                  source:          row.get(7)?,
                  frequency:       row.get(8)?,
                  return_cycle_id: row.get(9)?,
                  metadata:        row.get(10)?,
                  created_at:      row.get(11)?,
                  updated_at:      row.get(12)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawReturnLog::into_row).transpose()
  }

  pub async fn get_return_cycle(
    &self,
    return_cycle_id: Uuid,
  ) -> Result<Option<ReturnCycleRow>> {
    let id_str = encode_uuid(return_cycle_id);
    let raw: Option<(String, String, String, bool, bool, String, String)> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT return_cycle_id, start_date, end_date, is_summer,
                      is_submitted_in_wrls, created_at, updated_at
               FROM return_cycles
               WHERE return_cycle_id = ?1",
              rusqlite::params![id_str],
              |row| {
                Ok((
                  row.get(0)?,
                  row.get(1)?,
                  row.get(2)?,
                  row.get(3)?,
                  row.get(4)?,
                  row.get(5)?,
                  row.get(6)?,
                ))
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw
      .map(|(id, start, end, is_summer, submitted, created, updated)| {
        Ok(ReturnCycleRow {
          return_cycle_id:      decode_uuid(&id)?,
          start_date:           decode_date(&start)?,
          end_date:             decode_date(&end)?,
          is_summer,
          is_submitted_in_wrls: submitted,
          created_at:           decode_dt(&created)?,
          updated_at:           decode_dt(&updated)?,
        })
      })
      .transpose()
  }

  pub async fn get_submission(
    &self,
    return_id: &str,
  ) -> Result<Option<(VersionRow, Vec<LineRow>)>> {
    let return_id = return_id.to_owned();
    let raw: Option<(String, String, i64, bool, Vec<RawLineRow>)> = self
      .conn
      .call(move |conn| {
        let version = conn
          .query_row(
            "SELECT version_id, return_id, version_number, nil_return
             FROM return_versions
             WHERE return_id = ?1
             ORDER BY version_number DESC
             LIMIT 1",
            rusqlite::params![return_id],
            |row| {
              Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            },
          )
          .optional()?;

        let Some((version_id, return_id, number, nil_return)) = version else {
          return Ok(None);
        };

        let mut stmt = conn.prepare(
          "SELECT line_id, start_date, end_date, quantity, time_period,
                  reading_type, unit
           FROM return_lines
           WHERE version_id = ?1
           ORDER BY start_date",
        )?;
        let lines = stmt
          .query_map(rusqlite::params![version_id], |row| {
            Ok(RawLineRow {
              line_id:      row.get(0)?,
              start_date:   row.get(1)?,
              end_date:     row.get(2)?,
              quantity:     row.get(3)?,
              time_period:  row.get(4)?,
              reading_type: row.get(5)?,
              unit:         row.get(6)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Some((version_id, return_id, number, nil_return, lines)))
      })
      .await?;

    let Some((version_id, return_id, version_number, nil_return, raw_lines)) =
      raw
    else {
      return Ok(None);
    };

    let version = VersionRow {
      version_id: decode_uuid(&version_id)?,
      return_id,
      version_number,
      nil_return,
    };
    let lines = raw_lines
      .into_iter()
      .map(RawLineRow::into_row)
      .collect::<Result<Vec<_>>>()?;
    Ok(Some((version, lines)))
  }
}

struct RawLineRow {
  line_id:      String,
  start_date:   String,
  end_date:     String,
  quantity:     Option<f64>,
  time_period:  String,
  reading_type: String,
  unit:         String,
}

impl RawLineRow {
  fn into_row(self) -> Result<LineRow> {
    Ok(LineRow {
      line_id:      decode_uuid(&self.line_id)?,
      start_date:   decode_date(&self.start_date)?,
      end_date:     decode_date(&self.end_date)?,
      quantity:     self.quantity,
      time_period:  self.time_period,
      reading_type: self.reading_type,
      unit:         self.unit,
    })
  }
}

// ─── ReturnStore impl ────────────────────────────────────────────────────────

impl ReturnStore for SqliteStore {
  type Error = Error;

  async fn find_or_create_cycle(&self, window: CycleWindow) -> Result<Uuid> {
    let id_str = encode_uuid(Uuid::new_v4());
    let start = encode_date(window.start_date);
    let end = encode_date(window.end_date);
    let is_summer = window.is_summer;
    let submitted_in_wrls = window.end_date >= wrls_cutover();
    let now = encode_dt(Utc::now());

    let found: String = self
      .conn
      .call(move |conn| {
        let id = conn.query_row(
          "INSERT INTO return_cycles (
             return_cycle_id, start_date, end_date, is_summer,
             is_submitted_in_wrls, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
           ON CONFLICT (start_date, end_date, is_summer)
           DO UPDATE SET updated_at = excluded.updated_at
           RETURNING return_cycle_id",
          rusqlite::params![id_str, start, end, is_summer, submitted_in_wrls, now],
          |row| row.get(0),
        )?;
        Ok(id)
      })
      .await?;

    decode_uuid(&found)
  }

  async fn return_log_exists(&self, return_id: &str) -> Result<bool> {
    let return_id = return_id.to_owned();
    let exists = self
      .conn
      .call(move |conn| {
        let hit: Option<i64> = conn
          .query_row(
            "SELECT 1 FROM return_logs WHERE return_id = ?1",
            rusqlite::params![return_id],
            |row| row.get(0),
          )
          .optional()?;
        Ok(hit.is_some())
      })
      .await?;
    Ok(exists)
  }

  async fn insert_return_log(&self, row: NewReturnLog) -> Result<InsertOutcome> {
    let received = row.received_date.map(encode_date);
    let metadata = row.metadata.to_string();
    let now = encode_dt(Utc::now());
    let start = encode_date(row.start_date);
    let end = encode_date(row.end_date);
    let due = encode_date(row.due_date);
    let cycle_id = encode_uuid(row.return_cycle_id);

    let outcome = self
      .conn
      .call(move |conn| {
        let inserted = conn.execute(
          "INSERT INTO return_logs (
             return_id, licence_ref, start_date, end_date, due_date,
             received_date, status, source, returns_frequency,
             return_cycle_id, metadata, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)",
          rusqlite::params![
            row.return_id,
            row.licence_ref,
            start,
            end,
            due,
            received,
            row.status.as_str(),
            row.source,
            row.frequency.as_str(),
            cycle_id,
            metadata,
            now,
          ],
        );
        match inserted {
          Ok(_) => Ok(InsertOutcome::Inserted),
          Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
          {
            Ok(InsertOutcome::Conflict)
          }
          Err(e) => Err(e.into()),
        }
      })
      .await?;
    Ok(outcome)
  }

  async fn update_return_log(
    &self,
    return_id: &str,
    patch: ReturnLogPatch,
  ) -> Result<bool> {
    let return_id = return_id.to_owned();
    let due = encode_date(patch.due_date);
    let metadata = patch.metadata.to_string();
    let now = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        // The WHERE clause skips no-op writes so repeat runs report zero
        // updates.
        let n = match patch.status_and_received {
          Some((status, received)) => {
            let received = received.map(encode_date);
            conn.execute(
              "UPDATE return_logs
               SET due_date = ?2, metadata = ?3, status = ?4,
                   received_date = ?5, updated_at = ?6
               WHERE return_id = ?1
                 AND (due_date != ?2 OR metadata != ?3 OR status != ?4
                      OR received_date IS NOT ?5)",
              rusqlite::params![
                return_id,
                due,
                metadata,
                status.as_str(),
                received,
                now
              ],
            )?
          }
          None => conn.execute(
            "UPDATE return_logs
             SET due_date = ?2, metadata = ?3, updated_at = ?4
             WHERE return_id = ?1 AND (due_date != ?2 OR metadata != ?3)",
            rusqlite::params![return_id, due, metadata, now],
          )?,
        };
        Ok(n > 0)
      })
      .await?;
    Ok(changed)
  }

  async fn active_return_log_ids(
    &self,
    licence_ref: &str,
  ) -> Result<Vec<String>> {
    let licence_ref = licence_ref.to_owned();
    let ids = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT return_id FROM return_logs
           WHERE licence_ref = ?1 AND source = 'nald' AND status != 'void'",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![licence_ref], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(ids)
  }

  async fn void_return_logs(&self, return_ids: Vec<String>) -> Result<u64> {
    if return_ids.is_empty() {
      return Ok(0);
    }
    let now = encode_dt(Utc::now());
    let voided = self
      .conn
      .call(move |conn| {
        let placeholders = vec!["?"; return_ids.len()].join(", ");
        let sql = format!(
          "UPDATE return_logs SET status = 'void', updated_at = ?
           WHERE return_id IN ({placeholders})"
        );
        let mut bind = Vec::with_capacity(return_ids.len() + 1);
        bind.push(now);
        bind.extend(return_ids);
        let n = conn.execute(&sql, rusqlite::params_from_iter(bind.iter()))?;
        Ok(n as u64)
      })
      .await?;
    Ok(voided)
  }

  async fn has_submission(&self, return_id: &str) -> Result<bool> {
    let return_id = return_id.to_owned();
    let exists = self
      .conn
      .call(move |conn| {
        let hit: Option<i64> = conn
          .query_row(
            "SELECT 1 FROM return_versions WHERE return_id = ?1 LIMIT 1",
            rusqlite::params![return_id],
            |row| row.get(0),
          )
          .optional()?;
        Ok(hit.is_some())
      })
      .await?;
    Ok(exists)
  }

  async fn create_submission(&self, submission: NewSubmission) -> Result<Uuid> {
    let version_id = Uuid::new_v4();
    let version_id_str = encode_uuid(version_id);
    let now = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        // The version row is written before its lines; a line can never
        // reference a version that does not exist yet.
        conn.execute(
          "INSERT INTO return_versions (
             version_id, return_id, version_number, nil_return, created_at
           ) VALUES (?1, ?2, 1, ?3, ?4)",
          rusqlite::params![
            version_id_str,
            submission.return_id,
            submission.nil_return,
            now
          ],
        )?;

        let mut stmt = conn.prepare(
          "INSERT INTO return_lines (
             line_id, version_id, start_date, end_date, quantity,
             time_period, reading_type, unit
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )?;
        for line in &submission.lines {
          stmt.execute(rusqlite::params![
            encode_uuid(Uuid::new_v4()),
            version_id_str,
            encode_date(line.start_date),
            encode_date(line.end_date),
            line.quantity,
            line.time_period.as_str(),
            line.reading_type.as_str(),
            line.unit,
          ])?;
        }
        Ok(())
      })
      .await?;

    Ok(version_id)
  }
}
