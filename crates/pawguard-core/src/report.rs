//! Citizen sighting reports and their audit log.
//!
//! A report is created by a citizen submission and mutated only by NGO
//! actions. Every applied action also lands in the append-only
//! [`StatusChange`] log.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::animal::{Coordinates, Species};

// ─── Enums ───────────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReportStatus {
  #[default]
  New,
  InProgress,
  Rescued,
  Resolved,
  Adopted,
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RescueOutcome {
  ReleasedToNature,
  ShelterRecovery,
  Adopted,
  Deceased,
}

/// The independently toggleable welfare booleans on a report.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WelfareFlag {
  Vaccinated,
  Neutered,
  Rescued,
}

// ─── AnimalReport ────────────────────────────────────────────────────────────

/// Weather at the time of a sighting, stored as supplied by the client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
  pub condition:   Option<String>,
  pub temperature: Option<f64>,
  pub alert:       Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimalReport {
  pub id:             Uuid,
  /// `RPT-<year>-<NNNN>`.
  pub report_id:      String,
  /// The registry record this sighting was attached to.
  pub animal_id:      Option<Uuid>,
  pub reporter_id:    String,
  pub reporter_name:  String,
  pub reporter_phone: Option<String>,

  pub species:              Species,
  pub breed:                Option<String>,
  pub color:                Option<String>,
  pub distinctive_features: Option<String>,
  pub health_notes:         Option<String>,
  pub is_emergency:         bool,
  pub image_url:            String,

  pub address:   String,
  pub latitude:  Option<f64>,
  pub longitude: Option<f64>,
  #[serde(default)]
  pub weather:   WeatherSnapshot,

  pub is_vaccinated:     bool,
  pub vaccination_date:  Option<NaiveDate>,
  pub vaccination_notes: Option<String>,
  pub is_neutered:       bool,
  pub neutered_date:     Option<NaiveDate>,
  pub is_rescued:        bool,
  pub rescue_date:       Option<NaiveDate>,
  pub rescue_notes:      Option<String>,

  pub status:            ReportStatus,
  pub disaster_mode:     bool,
  pub assigned_ngo_id:   Option<String>,
  pub assigned_ngo_name: Option<String>,
  /// Private to NGO users.
  pub ngo_notes:         Option<String>,
  pub rescue_outcome:    Option<RescueOutcome>,

  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
  pub resolved_at: Option<DateTime<Utc>>,
}

impl AnimalReport {
  pub fn coordinates(&self) -> Option<Coordinates> {
    Some(Coordinates {
      lat: self.latitude?,
      lng: self.longitude?,
    })
  }

  /// The report as anyone may see it: the private NGO notes are dropped.
  pub fn redacted(mut self) -> Self {
    self.ngo_notes = None;
    self
  }
}

/// Input to [`crate::store::ReportStore::insert_report`]. The store assigns
/// `id`, `report_id` and the timestamps.
#[derive(Debug, Clone)]
pub struct NewReport {
  pub animal_id:            Option<Uuid>,
  pub reporter_id:          String,
  pub reporter_name:        String,
  pub reporter_phone:       Option<String>,
  pub species:              Species,
  pub breed:                Option<String>,
  pub color:                Option<String>,
  pub distinctive_features: Option<String>,
  pub health_notes:         Option<String>,
  pub is_emergency:         bool,
  pub image_url:            String,
  pub address:              String,
  pub coordinates:          Option<Coordinates>,
  pub weather:              WeatherSnapshot,
}

impl NewReport {
  /// Build a fresh `new`-status report with every welfare flag cleared.
  pub fn into_report(self, id: Uuid, report_id: String, now: DateTime<Utc>) -> AnimalReport {
    AnimalReport {
      id,
      report_id,
      animal_id: self.animal_id,
      reporter_id: self.reporter_id,
      reporter_name: self.reporter_name,
      reporter_phone: self.reporter_phone,
      species: self.species,
      breed: self.breed,
      color: self.color,
      distinctive_features: self.distinctive_features,
      health_notes: self.health_notes,
      is_emergency: self.is_emergency,
      image_url: self.image_url,
      address: self.address,
      latitude: self.coordinates.map(|c| c.lat),
      longitude: self.coordinates.map(|c| c.lng),
      weather: self.weather,
      is_vaccinated: false,
      vaccination_date: None,
      vaccination_notes: None,
      is_neutered: false,
      neutered_date: None,
      is_rescued: false,
      rescue_date: None,
      rescue_notes: None,
      status: ReportStatus::New,
      disaster_mode: false,
      assigned_ngo_id: None,
      assigned_ngo_name: None,
      ngo_notes: None,
      rescue_outcome: None,
      created_at: now,
      updated_at: now,
      resolved_at: None,
    }
  }
}

// ─── Actions ─────────────────────────────────────────────────────────────────

/// The NGO user performing an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NgoActor {
  pub ngo_id:   String,
  pub ngo_name: String,
}

/// A single NGO mutation of a report. Applied by
/// [`crate::lifecycle::apply`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ReportAction {
  SetStatus {
    status: ReportStatus,
    #[serde(default)]
    notes:  Option<String>,
  },
  /// Assign the report to the acting NGO.
  Assign,
  SetWelfare {
    flag:  WelfareFlag,
    value: bool,
    #[serde(default)]
    notes: Option<String>,
  },
  SetOutcome {
    outcome: RescueOutcome,
  },
  SetNotes {
    notes: String,
  },
}

// ─── Audit log ───────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ChangeAction {
  StatusChange,
  Vaccination,
  Neutering,
  Rescue,
  Assignment,
  Outcome,
  Notes,
}

/// The part of a [`StatusChange`] decided by the lifecycle rules; the store
/// fills in the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChangeDraft {
  pub old_status: Option<String>,
  pub new_status: String,
  pub action:     ChangeAction,
  pub notes:      Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
  pub seq:             i64,
  pub report_id:       Uuid,
  pub old_status:      Option<String>,
  pub new_status:      String,
  pub action:          ChangeAction,
  pub changed_by:      String,
  pub changed_by_name: String,
  pub notes:           Option<String>,
  pub recorded_at:     DateTime<Utc>,
}

// ─── Events ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportEventKind {
  Created,
  Updated,
}

/// Broadcast to live subscribers whenever a report is created or changed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportEvent {
  pub kind:   ReportEventKind,
  pub report: AnimalReport,
}

impl ReportEvent {
  pub fn redacted(self) -> Self {
    Self {
      kind:   self.kind,
      report: self.report.redacted(),
    }
  }
}
