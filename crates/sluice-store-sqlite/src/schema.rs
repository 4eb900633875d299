//! SQL schema for the Sluice SQLite store.
//!
//! Two families of tables live side by side: the `nald_*` tables mirror the
//! legacy extract exactly as loaded (dates as `DD/MM/YYYY` text with the
//! literal string `null` for absent values — the archive line table uses
//! `YYYYMMDD`), and the target tables use proper ISO dates and real NULLs.
//! The engine only ever reads the `nald_*` tables.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- ── Legacy extract (read-only) ──────────────────────────────────────────

CREATE TABLE IF NOT EXISTS nald_licences (
    licence_ref          TEXT PRIMARY KEY,
    region_code          TEXT NOT NULL,
    expiry_date          TEXT NOT NULL,   -- DD/MM/YYYY or 'null'
    lapsed_date          TEXT NOT NULL,
    revoked_date         TEXT NOT NULL,
    curr_version_st_date TEXT NOT NULL    -- start of the current version
);

CREATE TABLE IF NOT EXISTS nald_return_formats (
    format_id           INTEGER NOT NULL,
    region_code         TEXT NOT NULL,
    licence_ref         TEXT NOT NULL,
    returns_freq        TEXT NOT NULL,    -- 'D'|'W'|'F'|'M'|'Q'|'A'
    form_prodn_month    INTEGER NOT NULL,
    abs_period_st_day   TEXT NOT NULL,    -- number or 'null'
    abs_period_st_month TEXT NOT NULL,
    abs_period_end_day  TEXT NOT NULL,
    abs_period_end_month TEXT NOT NULL,
    eff_st_date         TEXT NOT NULL,    -- version window
    eff_end_date        TEXT NOT NULL,
    timeltd_st_date     TEXT NOT NULL,    -- time-limited overrides
    timeltd_end_date    TEXT NOT NULL,
    next_mod_reason     TEXT NOT NULL,    -- change reason of the next version
    site_descr          TEXT NOT NULL,
    PRIMARY KEY (region_code, format_id)
);

CREATE INDEX IF NOT EXISTS nald_formats_licence_idx
    ON nald_return_formats(licence_ref);

CREATE TABLE IF NOT EXISTS nald_return_purposes (
    region_code   TEXT NOT NULL,
    format_id     INTEGER NOT NULL,
    purpose_descr TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS nald_form_logs (
    region_code   TEXT NOT NULL,
    format_id     INTEGER NOT NULL,
    date_from     TEXT NOT NULL,
    date_to       TEXT NOT NULL,
    received_date TEXT NOT NULL            -- DD/MM/YYYY or 'null'
);

CREATE INDEX IF NOT EXISTS nald_form_logs_format_idx
    ON nald_form_logs(region_code, format_id);

CREATE TABLE IF NOT EXISTS nald_return_lines (
    region_code     TEXT NOT NULL,
    format_id       INTEGER NOT NULL,
    start_date      TEXT NOT NULL,
    end_date        TEXT NOT NULL,
    quantity        TEXT NOT NULL,         -- number or 'null'
    reading_type    TEXT NOT NULL,         -- 'M' | 'D'
    unit_of_measure TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS nald_return_lines_format_idx
    ON nald_return_lines(region_code, format_id);

-- Pre-cutover readings; dates are YYYYMMDD text.
CREATE TABLE IF NOT EXISTS nald_line_archive (
    region_code     TEXT NOT NULL,
    format_id       INTEGER NOT NULL,
    start_date      TEXT NOT NULL,
    end_date        TEXT NOT NULL,
    quantity        TEXT NOT NULL,
    reading_type    TEXT NOT NULL,
    unit_of_measure TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS nald_line_archive_format_idx
    ON nald_line_archive(region_code, format_id);

-- ── Target relations ────────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS return_cycles (
    return_cycle_id      TEXT PRIMARY KEY,
    start_date           TEXT NOT NULL,    -- ISO 8601 date
    end_date             TEXT NOT NULL,
    is_summer            INTEGER NOT NULL,
    -- Derived once at creation; never recomputed.
    is_submitted_in_wrls INTEGER NOT NULL,
    created_at           TEXT NOT NULL,
    updated_at           TEXT NOT NULL,
    UNIQUE (start_date, end_date, is_summer)
);

-- Return logs are voided, never deleted.
CREATE TABLE IF NOT EXISTS return_logs (
    return_id         TEXT PRIMARY KEY,
    licence_ref       TEXT NOT NULL,
    start_date        TEXT NOT NULL,
    end_date          TEXT NOT NULL,
    due_date          TEXT NOT NULL,
    received_date     TEXT,
    status            TEXT NOT NULL,       -- 'due' | 'completed' | 'void'
    source            TEXT NOT NULL,
    returns_frequency TEXT NOT NULL,
    return_cycle_id   TEXT NOT NULL REFERENCES return_cycles(return_cycle_id),
    metadata          TEXT NOT NULL,       -- JSON blob
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS return_logs_licence_idx
    ON return_logs(licence_ref);
CREATE INDEX IF NOT EXISTS return_logs_cycle_idx
    ON return_logs(return_cycle_id);

CREATE TABLE IF NOT EXISTS return_versions (
    version_id     TEXT PRIMARY KEY,
    return_id      TEXT NOT NULL REFERENCES return_logs(return_id),
    version_number INTEGER NOT NULL,
    nil_return     INTEGER NOT NULL,
    created_at     TEXT NOT NULL,
    UNIQUE (return_id, version_number)
);

CREATE TABLE IF NOT EXISTS return_lines (
    line_id      TEXT PRIMARY KEY,
    version_id   TEXT NOT NULL REFERENCES return_versions(version_id),
    start_date   TEXT NOT NULL,
    end_date     TEXT NOT NULL,
    quantity     REAL,                     -- NULL means not reported
    time_period  TEXT NOT NULL,            -- 'day' | 'week' | 'month'
    reading_type TEXT NOT NULL,
    unit         TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS return_lines_version_idx
    ON return_lines(version_id);

PRAGMA user_version = 1;
";
