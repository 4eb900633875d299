//! The returns packet builder.
//!
//! Combines the cycle calculator with a format's submission logs to produce
//! the canonical set of return-log candidates for one format. Cycles with no
//! intersecting log represent configuration that was never activated and are
//! not materialized.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
  Result,
  cycle::cycles_for_format,
  legacy::{LegacyFormat, ReturnsFrequency, SubmissionLog},
  returns::{
    ReturnStatus, latest_received, resolve_due_date, resolve_status,
    return_log_id, windows_intersect,
  },
};

// ─── Candidate ───────────────────────────────────────────────────────────────

/// One computed return-log row, ready for the reconciler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnLogCandidate {
  pub return_id:     String,
  pub licence_ref:   String,
  pub region_code:   String,
  pub format_id:     i64,
  pub start_date:    NaiveDate,
  pub end_date:      NaiveDate,
  pub due_date:      NaiveDate,
  pub received_date: Option<NaiveDate>,
  pub status:        ReturnStatus,
  pub frequency:     ReturnsFrequency,
  pub is_summer:     bool,
  pub is_current:    bool,
  /// The cycle ends on the format's true end date — metadata, never a
  /// status driver.
  pub is_final:      bool,
  pub metadata:      serde_json::Value,
}

// ─── Builder ─────────────────────────────────────────────────────────────────

/// Build the return-log candidates for one format.
///
/// `logs` must be the format's full submission-log list — fetched once per
/// format, never once per cycle — and is filtered here per cycle by window
/// intersection.
pub fn build_packet(
  format: &LegacyFormat,
  split_date: Option<NaiveDate>,
  today: NaiveDate,
  logs: &[SubmissionLog],
) -> Result<Vec<ReturnLogCandidate>> {
  let cycles = cycles_for_format(format, split_date, today)?;
  let mut candidates = Vec::with_capacity(cycles.len());

  for cycle in cycles {
    let intersecting: Vec<SubmissionLog> = logs
      .iter()
      .copied()
      .filter(|log| {
        windows_intersect(
          log.start_date,
          log.end_date,
          cycle.start_date,
          cycle.end_date,
        )
      })
      .collect();
    if intersecting.is_empty() {
      continue;
    }

    let is_final = format.end_date == Some(cycle.end_date);
    candidates.push(ReturnLogCandidate {
      return_id: return_log_id(
        &format.region_code,
        &format.licence_ref,
        format.format_id,
        cycle.start_date,
        cycle.end_date,
      ),
      licence_ref: format.licence_ref.clone(),
      region_code: format.region_code.clone(),
      format_id: format.format_id,
      start_date: cycle.start_date,
      end_date: cycle.end_date,
      due_date: resolve_due_date(cycle.end_date, format),
      received_date: latest_received(&cycle, &intersecting),
      status: resolve_status(&cycle, &intersecting),
      frequency: format.frequency,
      is_summer: format.production_month.is_summer,
      is_current: cycle.is_current,
      is_final,
      metadata: metadata_blob(format, cycle.is_current, is_final),
    });
  }

  Ok(candidates)
}

fn metadata_blob(
  format: &LegacyFormat,
  is_current: bool,
  is_final: bool,
) -> serde_json::Value {
  serde_json::json!({
    "description": format.site_description,
    "purposes": format.purposes,
    "isCurrent": is_current,
    "isFinal": is_final,
    "isUpload": format.production_month.is_upload,
    "isSummer": format.production_month.is_summer,
    "nald": {
      "regionCode": format.region_code,
      "formatId": format.format_id,
      "periodStartDay": format.abstraction_period.start_day,
      "periodStartMonth": format.abstraction_period.start_month,
      "periodEndDay": format.abstraction_period.end_day,
      "periodEndMonth": format.abstraction_period.end_month,
    },
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::legacy::{AbstractionPeriod, ProductionMonth};

  fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  fn format() -> LegacyFormat {
    LegacyFormat {
      format_id: 10021668,
      region_code: "1".into(),
      licence_ref: "03/28/60/0032".into(),
      frequency: ReturnsFrequency::Month,
      production_month: ProductionMonth { is_summer: true, is_upload: false },
      abstraction_period: AbstractionPeriod {
        start_day:   Some(1),
        start_month: Some(4),
        end_day:     Some(31),
        end_month:   Some(10),
      },
      start_date: date(2016, 5, 23),
      end_date: Some(date(2018, 3, 30)),
      next_version_reason: None,
      site_description: Some("Borehole at Mill Farm".into()),
      purposes: vec!["Spray irrigation".into()],
    }
  }

  fn log(
    start: NaiveDate,
    end: NaiveDate,
    received: Option<NaiveDate>,
  ) -> SubmissionLog {
    SubmissionLog { start_date: start, end_date: end, received }
  }

  #[test]
  fn cycles_without_logs_are_not_materialized() {
    // Logs only cover the first cycle.
    let logs =
      [log(date(2016, 6, 1), date(2016, 6, 30), Some(date(2016, 7, 4)))];
    let candidates =
      build_packet(&format(), Some(date(2017, 6, 1)), date(2018, 1, 1), &logs)
        .unwrap();

    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].start_date, date(2016, 5, 23));
    assert_eq!(candidates[0].end_date, date(2016, 10, 31));
    assert_eq!(candidates[0].status, ReturnStatus::Completed);
    assert_eq!(candidates[0].received_date, Some(date(2016, 7, 4)));
  }

  #[test]
  fn candidate_identity_and_flags() {
    // One log spanning the whole window activates every cycle.
    let logs = [log(date(2016, 5, 23), date(2018, 3, 30), None)];
    let candidates =
      build_packet(&format(), Some(date(2017, 6, 1)), date(2018, 1, 1), &logs)
        .unwrap();

    assert_eq!(candidates.len(), 4);
    assert_eq!(
      candidates[0].return_id,
      "v1:1:03/28/60/0032:10021668:2016-05-23:2016-10-31"
    );
    assert!(candidates.iter().all(|c| c.status == ReturnStatus::Due));

    // Only the last cycle ends on the format's true end date.
    assert!(candidates[..3].iter().all(|c| !c.is_final));
    let last = candidates.last().unwrap();
    assert!(last.is_final);
    assert_eq!(last.metadata["isFinal"], serde_json::json!(true));
    assert_eq!(last.metadata["nald"]["formatId"], serde_json::json!(10021668));
  }

  #[test]
  fn fortnightly_format_propagates_typed_error() {
    let mut f = format();
    f.frequency = ReturnsFrequency::Fortnight;
    let err = build_packet(&f, None, date(2018, 1, 1), &[]).unwrap_err();
    assert!(matches!(err, crate::Error::UnsupportedFrequency(_)));
  }
}
