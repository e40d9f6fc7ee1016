//! SQL schema for the PawGuard SQLite store.
//!
//! Records are stored as JSON documents next to the handful of columns the
//! queries filter and sort on. Histories live in their own append-only
//! tables; `seq` is the store-assigned sequence number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS animals (
    id                 TEXT PRIMARY KEY,
    system_id          TEXT NOT NULL UNIQUE,   -- PG-<year>-<NNNN>
    species            TEXT NOT NULL,          -- 'dog' | 'cat'
    status             TEXT NOT NULL,
    created_by         TEXT NOT NULL,
    last_seen_at       TEXT NOT NULL,          -- RFC 3339 UTC, microseconds
    last_seen_location TEXT NOT NULL,
    embedding_json     TEXT,                   -- JSON array of f32 or NULL
    record_json        TEXT NOT NULL           -- AnimalIdentity without histories
);

-- Append-only. No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS report_history (
    seq         INTEGER PRIMARY KEY AUTOINCREMENT,
    animal_id   TEXT NOT NULL REFERENCES animals(id),
    timestamp   TEXT NOT NULL,
    location    TEXT NOT NULL,
    notes       TEXT,
    condition   TEXT,
    reported_by TEXT NOT NULL
);

-- Append-only.
CREATE TABLE IF NOT EXISTS care_history (
    seq         INTEGER PRIMARY KEY AUTOINCREMENT,
    animal_id   TEXT NOT NULL REFERENCES animals(id),
    recorded_at TEXT NOT NULL,
    ngo_id      TEXT NOT NULL,
    ngo_name    TEXT NOT NULL,
    action      TEXT NOT NULL,
    notes       TEXT
);

CREATE TABLE IF NOT EXISTS reports (
    id            TEXT PRIMARY KEY,
    report_id     TEXT NOT NULL UNIQUE,        -- RPT-<year>-<NNNN>
    animal_id     TEXT REFERENCES animals(id),
    reporter_id   TEXT NOT NULL,
    status        TEXT NOT NULL,
    disaster_mode INTEGER NOT NULL DEFAULT 0,
    latitude      REAL,
    longitude     REAL,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL,
    body_json     TEXT NOT NULL                -- full AnimalReport
);

-- Append-only audit log of NGO actions.
CREATE TABLE IF NOT EXISTS status_history (
    seq             INTEGER PRIMARY KEY AUTOINCREMENT,
    report_id       TEXT NOT NULL REFERENCES reports(id),
    old_status      TEXT,
    new_status      TEXT NOT NULL,
    action          TEXT NOT NULL,
    changed_by      TEXT NOT NULL,
    changed_by_name TEXT NOT NULL,
    notes           TEXT,
    recorded_at     TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS animals_species_seen_idx ON animals(species, last_seen_at);
CREATE INDEX IF NOT EXISTS report_history_animal_idx ON report_history(animal_id);
CREATE INDEX IF NOT EXISTS care_history_animal_idx   ON care_history(animal_id);
CREATE INDEX IF NOT EXISTS reports_created_idx       ON reports(created_at);
CREATE INDEX IF NOT EXISTS reports_reporter_idx      ON reports(reporter_id);
CREATE INDEX IF NOT EXISTS status_history_report_idx ON status_history(report_id);

PRAGMA user_version = 1;
";
