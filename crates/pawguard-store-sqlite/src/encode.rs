//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings with fixed microsecond precision and a `Z`
//! suffix, so lexical order equals time order. UUIDs are hyphenated
//! lowercase strings. Records are compact JSON.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use pawguard_core::{
  animal::{AnimalIdentity, CareEntry, ReportEntry},
  report::{AnimalReport, StatusChange},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Micros, true) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

/// Parse a strum-backed enum column.
pub fn decode_enum<T: FromStr>(s: &str) -> Result<T> {
  s.parse()
    .map_err(|_| Error::Decode(format!("{s:?} is not a valid {}", std::any::type_name::<T>())))
}

/// Carry a decode failure out of a `Connection::call` closure.
pub fn call_error<E>(e: E) -> tokio_rusqlite::Error
where
  E: std::error::Error + Send + Sync + 'static,
{
  tokio_rusqlite::Error::Other(Box::new(e))
}

// ─── Animal rows ─────────────────────────────────────────────────────────────

/// Column values of one `animals` row.
pub struct AnimalRow {
  pub id:                 String,
  pub system_id:          String,
  pub species:            String,
  pub status:             String,
  pub created_by:         String,
  pub last_seen_at:       String,
  pub last_seen_location: String,
  pub embedding_json:     Option<String>,
  pub record_json:        String,
}

impl AnimalRow {
  /// Histories are stored in their own tables and left out of the document.
  pub fn encode(animal: &AnimalIdentity) -> Result<Self> {
    let record = AnimalIdentity {
      report_history: Vec::new(),
      care_history: Vec::new(),
      ..animal.clone()
    };
    Ok(Self {
      id:                 encode_uuid(animal.id),
      system_id:          animal.system_id.clone(),
      species:            animal.species.as_ref().to_owned(),
      status:             animal.status.as_ref().to_owned(),
      created_by:         animal.created_by.clone(),
      last_seen_at:       encode_dt(animal.last_seen_at),
      last_seen_location: animal.last_seen_location.clone(),
      embedding_json:     animal
        .embedding
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?,
      record_json:        serde_json::to_string(&record)?,
    })
  }
}

/// Raw strings read for one animal and its histories.
pub struct RawAnimal {
  pub record_json: String,
  pub reports:     Vec<RawReportEntry>,
  pub care:        Vec<RawCareEntry>,
}

impl RawAnimal {
  pub fn into_animal(self) -> Result<AnimalIdentity> {
    let mut animal: AnimalIdentity = serde_json::from_str(&self.record_json)?;
    animal.report_history = self
      .reports
      .into_iter()
      .map(RawReportEntry::into_entry)
      .collect::<Result<_>>()?;
    animal.care_history = self
      .care
      .into_iter()
      .map(RawCareEntry::into_entry)
      .collect::<Result<_>>()?;
    Ok(animal)
  }
}

pub struct RawReportEntry {
  pub seq:         i64,
  pub timestamp:   String,
  pub location:    String,
  pub notes:       Option<String>,
  pub condition:   Option<String>,
  pub reported_by: String,
}

impl RawReportEntry {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      seq:         row.get(0)?,
      timestamp:   row.get(1)?,
      location:    row.get(2)?,
      notes:       row.get(3)?,
      condition:   row.get(4)?,
      reported_by: row.get(5)?,
    })
  }

  pub fn into_entry(self) -> Result<ReportEntry> {
    Ok(ReportEntry {
      seq:         self.seq,
      timestamp:   decode_dt(&self.timestamp)?,
      location:    self.location,
      notes:       self.notes,
      condition:   self.condition,
      reported_by: self.reported_by,
    })
  }
}

pub struct RawCareEntry {
  pub seq:         i64,
  pub recorded_at: String,
  pub ngo_id:      String,
  pub ngo_name:    String,
  pub action:      String,
  pub notes:       Option<String>,
}

impl RawCareEntry {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      seq:         row.get(0)?,
      recorded_at: row.get(1)?,
      ngo_id:      row.get(2)?,
      ngo_name:    row.get(3)?,
      action:      row.get(4)?,
      notes:       row.get(5)?,
    })
  }

  pub fn into_entry(self) -> Result<CareEntry> {
    Ok(CareEntry {
      seq:         self.seq,
      recorded_at: decode_dt(&self.recorded_at)?,
      ngo_id:      self.ngo_id,
      ngo_name:    self.ngo_name,
      action:      decode_enum(&self.action)?,
      notes:       self.notes,
    })
  }
}

// ─── Report rows ─────────────────────────────────────────────────────────────

/// Column values of one `reports` row.
pub struct ReportRow {
  pub id:            String,
  pub report_id:     String,
  pub animal_id:     Option<String>,
  pub reporter_id:   String,
  pub status:        String,
  pub disaster_mode: bool,
  pub latitude:      Option<f64>,
  pub longitude:     Option<f64>,
  pub created_at:    String,
  pub updated_at:    String,
  pub body_json:     String,
}

impl ReportRow {
  pub fn encode(report: &AnimalReport) -> Result<Self> {
    Ok(Self {
      id:            encode_uuid(report.id),
      report_id:     report.report_id.clone(),
      animal_id:     report.animal_id.map(encode_uuid),
      reporter_id:   report.reporter_id.clone(),
      status:        report.status.as_ref().to_owned(),
      disaster_mode: report.disaster_mode,
      latitude:      report.latitude,
      longitude:     report.longitude,
      created_at:    encode_dt(report.created_at),
      updated_at:    encode_dt(report.updated_at),
      body_json:     serde_json::to_string(report)?,
    })
  }
}

pub fn decode_report(body_json: &str) -> Result<AnimalReport> { Ok(serde_json::from_str(body_json)?) }

pub struct RawStatusChange {
  pub seq:             i64,
  pub report_id:       String,
  pub old_status:      Option<String>,
  pub new_status:      String,
  pub action:          String,
  pub changed_by:      String,
  pub changed_by_name: String,
  pub notes:           Option<String>,
  pub recorded_at:     String,
}

impl RawStatusChange {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      seq:             row.get(0)?,
      report_id:       row.get(1)?,
      old_status:      row.get(2)?,
      new_status:      row.get(3)?,
      action:          row.get(4)?,
      changed_by:      row.get(5)?,
      changed_by_name: row.get(6)?,
      notes:           row.get(7)?,
      recorded_at:     row.get(8)?,
    })
  }

  pub fn into_change(self) -> Result<StatusChange> {
    Ok(StatusChange {
      seq:             self.seq,
      report_id:       decode_uuid(&self.report_id)?,
      old_status:      self.old_status,
      new_status:      self.new_status,
      action:          decode_enum(&self.action)?,
      changed_by:      self.changed_by,
      changed_by_name: self.changed_by_name,
      notes:           self.notes,
      recorded_at:     decode_dt(&self.recorded_at)?,
    })
  }
}
