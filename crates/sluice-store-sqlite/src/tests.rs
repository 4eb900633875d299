//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{Datelike as _, NaiveDate};
use sluice_core::{
  cycle::CycleWindow,
  legacy::{ReadingType, ReturnsFrequency},
  replicate::{LinePeriod, ReplicatedLine},
  returns::ReturnStatus,
  store::{
    InsertOutcome, LegacySource, NewReturnLog, NewSubmission, ReturnLogPatch,
    ReturnStore,
  },
};

use crate::{
  SqliteStore,
  seed::{FormLogSeed, FormatSeed, LicenceSeed, LineSeed},
};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory().await.expect("in-memory store")
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
  NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn summer_window(start_year: i32) -> CycleWindow {
  CycleWindow {
    start_date: date(start_year, 11, 1),
    end_date:   date(start_year + 1, 10, 31),
    is_summer:  true,
  }
}

async fn new_return_log(
  s: &SqliteStore,
  return_id: &str,
  licence_ref: &str,
  end: NaiveDate,
) -> NewReturnLog {
  let cycle_id = s
    .find_or_create_cycle(summer_window(end.year() - 1))
    .await
    .unwrap();
  NewReturnLog {
    return_id: return_id.into(),
    licence_ref: licence_ref.into(),
    start_date: date(end.year() - 1, 11, 1),
    end_date: end,
    due_date: date(end.year(), 11, 28),
    received_date: None,
    status: ReturnStatus::Due,
    source: "nald".into(),
    frequency: ReturnsFrequency::Month,
    return_cycle_id: cycle_id,
    metadata: serde_json::json!({ "isCurrent": true }),
  }
}

// ─── Return cycles ───────────────────────────────────────────────────────────

#[tokio::test]
async fn find_or_create_cycle_is_stable() {
  let s = store().await;

  let first = s.find_or_create_cycle(summer_window(2016)).await.unwrap();
  let second = s.find_or_create_cycle(summer_window(2016)).await.unwrap();
  assert_eq!(first, second);

  // A different seasonality is a different cycle even for the same dates.
  let winter = s
    .find_or_create_cycle(CycleWindow {
      start_date: date(2016, 11, 1),
      end_date:   date(2017, 10, 31),
      is_summer:  false,
    })
    .await
    .unwrap();
  assert_ne!(first, winter);
}

#[tokio::test]
async fn submitted_in_wrls_is_derived_once_at_creation() {
  let s = store().await;

  let pre = s.find_or_create_cycle(summer_window(2016)).await.unwrap();
  let row = s.get_return_cycle(pre).await.unwrap().unwrap();
  assert!(!row.is_submitted_in_wrls);

  // Ends exactly on the cutover date: owned by the online service.
  let post = s
    .find_or_create_cycle(CycleWindow {
      start_date: date(2017, 11, 1),
      end_date:   date(2018, 10, 31),
      is_summer:  true,
    })
    .await
    .unwrap();
  let row = s.get_return_cycle(post).await.unwrap().unwrap();
  assert!(row.is_submitted_in_wrls);

  // A conflicting create only bumps the modification timestamp.
  let again = s.find_or_create_cycle(summer_window(2016)).await.unwrap();
  assert_eq!(again, pre);
  let row = s.get_return_cycle(pre).await.unwrap().unwrap();
  assert!(!row.is_submitted_in_wrls);
}

// ─── Return logs ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn insert_and_read_back_return_log() {
  let s = store().await;
  let row =
    new_return_log(&s, "v1:1:L1:10:2016-11-01:2017-10-31", "L1", date(2017, 10, 31))
      .await;

  let outcome = s.insert_return_log(row.clone()).await.unwrap();
  assert_eq!(outcome, InsertOutcome::Inserted);
  assert!(s.return_log_exists(&row.return_id).await.unwrap());

  let fetched = s.get_return_log(&row.return_id).await.unwrap().unwrap();
  assert_eq!(fetched.licence_ref, "L1");
  assert_eq!(fetched.start_date, date(2016, 11, 1));
  assert_eq!(fetched.end_date, date(2017, 10, 31));
  assert_eq!(fetched.status, ReturnStatus::Due);
  assert_eq!(fetched.source, "nald");
  assert_eq!(fetched.frequency, "month");
  assert_eq!(fetched.return_cycle_id, row.return_cycle_id);
  assert_eq!(fetched.metadata["isCurrent"], serde_json::json!(true));
}

#[tokio::test]
async fn duplicate_insert_reports_conflict() {
  let s = store().await;
  let row =
    new_return_log(&s, "v1:1:L1:10:2016-11-01:2017-10-31", "L1", date(2017, 10, 31))
      .await;

  s.insert_return_log(row.clone()).await.unwrap();
  let outcome = s.insert_return_log(row).await.unwrap();
  assert_eq!(outcome, InsertOutcome::Conflict);
}

#[tokio::test]
async fn update_reports_unchanged_rows() {
  let s = store().await;
  let row =
    new_return_log(&s, "v1:1:L1:10:2016-11-01:2017-10-31", "L1", date(2017, 10, 31))
      .await;
  s.insert_return_log(row.clone()).await.unwrap();

  // Identical patch: nothing changed.
  let patch = ReturnLogPatch {
    due_date:            row.due_date,
    metadata:            row.metadata.clone(),
    status_and_received: None,
  };
  assert!(!s.update_return_log(&row.return_id, patch).await.unwrap());

  // New due date: one real change.
  let patch = ReturnLogPatch {
    due_date:            date(2017, 12, 24),
    metadata:            row.metadata.clone(),
    status_and_received: None,
  };
  assert!(s.update_return_log(&row.return_id, patch).await.unwrap());
  let fetched = s.get_return_log(&row.return_id).await.unwrap().unwrap();
  assert_eq!(fetched.due_date, date(2017, 12, 24));
}

#[tokio::test]
async fn patch_without_ownership_leaves_status_alone() {
  let s = store().await;
  let row =
    new_return_log(&s, "v1:1:L1:10:2018-11-01:2019-10-31", "L1", date(2019, 10, 31))
      .await;
  s.insert_return_log(row.clone()).await.unwrap();

  let patch = ReturnLogPatch {
    due_date:            date(2019, 12, 1),
    metadata:            row.metadata.clone(),
    status_and_received: None,
  };
  s.update_return_log(&row.return_id, patch).await.unwrap();

  let fetched = s.get_return_log(&row.return_id).await.unwrap().unwrap();
  assert_eq!(fetched.status, ReturnStatus::Due);
  assert_eq!(fetched.received_date, None);
}

#[tokio::test]
async fn patch_with_ownership_updates_status_and_received() {
  let s = store().await;
  let row =
    new_return_log(&s, "v1:1:L1:10:2016-11-01:2017-10-31", "L1", date(2017, 10, 31))
      .await;
  s.insert_return_log(row.clone()).await.unwrap();

  let patch = ReturnLogPatch {
    due_date:            row.due_date,
    metadata:            row.metadata.clone(),
    status_and_received: Some((
      ReturnStatus::Completed,
      Some(date(2017, 11, 12)),
    )),
  };
  assert!(s.update_return_log(&row.return_id, patch).await.unwrap());

  let fetched = s.get_return_log(&row.return_id).await.unwrap().unwrap();
  assert_eq!(fetched.status, ReturnStatus::Completed);
  assert_eq!(fetched.received_date, Some(date(2017, 11, 12)));
}

#[tokio::test]
async fn void_is_bulk_and_touches_nothing_else() {
  let s = store().await;
  let keep =
    new_return_log(&s, "v1:1:L1:10:2015-11-01:2016-10-31", "L1", date(2016, 10, 31))
      .await;
  let stale_a =
    new_return_log(&s, "v1:1:L1:10:2016-11-01:2017-10-31", "L1", date(2017, 10, 31))
      .await;
  let stale_b =
    new_return_log(&s, "v1:1:L1:11:2016-11-01:2017-10-31", "L1", date(2017, 10, 31))
      .await;
  for row in [&keep, &stale_a, &stale_b] {
    s.insert_return_log(row.clone()).await.unwrap();
  }

  let voided = s
    .void_return_logs(vec![
      stale_a.return_id.clone(),
      stale_b.return_id.clone(),
    ])
    .await
    .unwrap();
  assert_eq!(voided, 2);

  let fetched = s.get_return_log(&stale_a.return_id).await.unwrap().unwrap();
  assert_eq!(fetched.status, ReturnStatus::Void);
  // Every other field is untouched.
  assert_eq!(fetched.due_date, stale_a.due_date);
  assert_eq!(fetched.received_date, stale_a.received_date);
  assert_eq!(fetched.metadata, stale_a.metadata);

  let ids = s.active_return_log_ids("L1").await.unwrap();
  assert_eq!(ids, vec![keep.return_id.clone()]);

  // Voiding nothing is a no-op, not an error.
  assert_eq!(s.void_return_logs(vec![]).await.unwrap(), 0);
}

// ─── Submissions ─────────────────────────────────────────────────────────────

fn replicated_line(
  start: NaiveDate,
  end: NaiveDate,
  quantity: Option<f64>,
) -> ReplicatedLine {
  ReplicatedLine {
    start_date: start,
    end_date: end,
    quantity,
    time_period: LinePeriod::Month,
    reading_type: ReadingType::Measured,
    unit: "m³".into(),
  }
}

#[tokio::test]
async fn create_submission_persists_version_then_lines() {
  let s = store().await;
  let row =
    new_return_log(&s, "v1:1:L1:10:2016-11-01:2017-10-31", "L1", date(2017, 10, 31))
      .await;
  s.insert_return_log(row.clone()).await.unwrap();

  assert!(!s.has_submission(&row.return_id).await.unwrap());

  let version_id = s
    .create_submission(NewSubmission {
      return_id:  row.return_id.clone(),
      nil_return: false,
      lines:      vec![
        replicated_line(date(2016, 11, 1), date(2016, 11, 30), Some(12.0)),
        replicated_line(date(2016, 12, 1), date(2016, 12, 31), None),
      ],
    })
    .await
    .unwrap();

  assert!(s.has_submission(&row.return_id).await.unwrap());
  let (version, lines) =
    s.get_submission(&row.return_id).await.unwrap().unwrap();
  assert_eq!(version.version_id, version_id);
  assert_eq!(version.version_number, 1);
  assert!(!version.nil_return);
  assert_eq!(lines.len(), 2);
  assert_eq!(lines[0].quantity, Some(12.0));
  assert_eq!(lines[1].quantity, None);
  assert_eq!(lines[0].time_period, "month");
}

#[tokio::test]
async fn nil_return_submission_has_no_lines() {
  let s = store().await;
  let row =
    new_return_log(&s, "v1:1:L1:10:2016-11-01:2017-10-31", "L1", date(2017, 10, 31))
      .await;
  s.insert_return_log(row.clone()).await.unwrap();

  s.create_submission(NewSubmission {
    return_id:  row.return_id.clone(),
    nil_return: true,
    lines:      vec![],
  })
  .await
  .unwrap();

  let (version, lines) =
    s.get_submission(&row.return_id).await.unwrap().unwrap();
  assert!(version.nil_return);
  assert!(lines.is_empty());
}

// ─── Legacy source ───────────────────────────────────────────────────────────

#[tokio::test]
async fn formats_flatten_effective_window() {
  let s = store().await;
  s.seed_licence(LicenceSeed {
    licence_ref: "L1".into(),
    expiry_date: "30/06/2018".into(),
    curr_version_st_date: "01/06/2017".into(),
    ..Default::default()
  })
  .await
  .unwrap();
  s.seed_format(FormatSeed {
    format_id: 10,
    licence_ref: "L1".into(),
    eff_st_date: "23/05/2016".into(),
    eff_end_date: "null".into(),
    timeltd_st_date: "01/07/2016".into(),
    timeltd_end_date: "31/12/2018".into(),
    site_descr: "Borehole at Mill Farm".into(),
    ..Default::default()
  })
  .await
  .unwrap();
  s.seed_purpose("1", 10, "Spray irrigation").await.unwrap();

  let split = s.current_version_start("L1").await.unwrap();
  assert_eq!(split, Some(date(2017, 6, 1)));

  let formats = s.formats_for_licence("L1").await.unwrap();
  assert_eq!(formats.len(), 1);
  let format = &formats[0];
  // Later of version start and time-limited start.
  assert_eq!(format.start_date, date(2016, 7, 1));
  // Earliest of time-limited end and licence expiry.
  assert_eq!(format.end_date, Some(date(2018, 6, 30)));
  assert_eq!(format.frequency, ReturnsFrequency::Month);
  assert!(format.production_month.is_summer);
  assert_eq!(format.site_description.as_deref(), Some("Borehole at Mill Farm"));
  assert_eq!(format.purposes, vec!["Spray irrigation".to_owned()]);
}

#[tokio::test]
async fn missing_licence_row_is_an_error_for_formats() {
  let s = store().await;
  let err = s.formats_for_licence("NOPE").await.unwrap_err();
  assert!(matches!(err, crate::Error::LicenceNotFound(_)));

  // But the current-version probe reports plain absence.
  assert_eq!(s.current_version_start("NOPE").await.unwrap(), None);
}

#[tokio::test]
async fn submission_logs_decode_and_sort() {
  let s = store().await;
  s.seed_form_log(FormLogSeed {
    format_id: 10,
    date_from: "01/11/2017".into(),
    date_to: "31/10/2018".into(),
    received_date: "null".into(),
    ..Default::default()
  })
  .await
  .unwrap();
  s.seed_form_log(FormLogSeed {
    format_id: 10,
    date_from: "01/11/2016".into(),
    date_to: "31/10/2017".into(),
    received_date: "14/11/2017".into(),
    ..Default::default()
  })
  .await
  .unwrap();

  let logs = s.submission_logs("1", 10).await.unwrap();
  assert_eq!(logs.len(), 2);
  assert_eq!(logs[0].start_date, date(2016, 11, 1));
  assert_eq!(logs[0].received, Some(date(2017, 11, 14)));
  assert_eq!(logs[1].received, None);
}

#[tokio::test]
async fn line_windows_filter_on_end_date() {
  let s = store().await;
  for (start, end, quantity) in [
    ("01/10/2016", "31/10/2016", "5"),
    ("01/11/2016", "30/11/2016", "7.5"),
    ("01/11/2017", "30/11/2017", "null"),
  ] {
    s.seed_line(LineSeed {
      format_id: 10,
      start_date: start.into(),
      end_date: end.into(),
      quantity: quantity.into(),
      ..Default::default()
    })
    .await
    .unwrap();
  }

  let lines = s
    .lines_for_window("1", 10, date(2016, 11, 1), date(2017, 10, 31))
    .await
    .unwrap();
  assert_eq!(lines.len(), 1);
  assert_eq!(lines[0].quantity, Some(7.5));
  assert_eq!(lines[0].unit, "m³");
}

#[tokio::test]
async fn archive_lines_use_compact_dates() {
  let s = store().await;
  s.seed_archive_line(LineSeed {
    format_id: 10,
    start_date: "20120401".into(),
    end_date: "20120430".into(),
    quantity: "3.25".into(),
    ..Default::default()
  })
  .await
  .unwrap();

  let lines = s
    .archive_lines_for_window("1", 10, date(2012, 4, 1), date(2013, 3, 31))
    .await
    .unwrap();
  assert_eq!(lines.len(), 1);
  assert_eq!(lines[0].start_date, date(2012, 4, 1));
  assert_eq!(lines[0].quantity, Some(3.25));
}

#[tokio::test]
async fn licence_refs_enumerates_formats() {
  let s = store().await;
  for (licence, format_id) in [("L2", 20), ("L1", 10), ("L1", 11)] {
    s.seed_format(FormatSeed {
      format_id,
      licence_ref: licence.into(),
      eff_st_date: "01/04/2015".into(),
      ..Default::default()
    })
    .await
    .unwrap();
  }

  let refs = s.licence_refs().await.unwrap();
  assert_eq!(refs, vec!["L1".to_owned(), "L2".to_owned()]);
}
