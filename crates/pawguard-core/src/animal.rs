//! Registry records: one [`AnimalIdentity`] per unique animal.
//!
//! The identity row holds current state; sightings and NGO care actions live
//! in append-only histories whose sequence numbers are assigned by the store.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

// ─── Species ─────────────────────────────────────────────────────────────────

/// Species as reported by an identification backend.
///
/// Registry records only ever hold `Dog` or `Cat`; see
/// [`Species::registry_species`].
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Species {
  Dog,
  Cat,
  #[default]
  Unknown,
}

impl Species {
  /// Loose normalisation of free text coming back from a vision model.
  pub fn from_loose(text: &str) -> Self {
    let t = text.trim().to_lowercase();
    match t.as_str() {
      "dog" | "dogs" | "canine" | "puppy" => Self::Dog,
      "cat" | "cats" | "feline" | "kitten" => Self::Cat,
      _ => Self::Unknown,
    }
  }

  /// The species stored on a registry record. `Unknown` falls back to `Dog`.
  pub fn registry_species(self) -> Self {
    match self {
      Self::Unknown => Self::Dog,
      other => other,
    }
  }

  pub fn is_known(self) -> bool { !matches!(self, Self::Unknown) }
}

// ─── Status ──────────────────────────────────────────────────────────────────

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
pub enum AnimalStatus {
  #[default]
  Waiting,
  InCare,
  Rescued,
  Adopted,
  Released,
  Deceased,
}

// ─── History entries ─────────────────────────────────────────────────────────

/// A single sighting appended to an animal's report history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportEntry {
  /// Store-assigned, strictly increasing within the store.
  pub seq:         i64,
  pub timestamp:   DateTime<Utc>,
  pub location:    String,
  pub notes:       Option<String>,
  pub condition:   Option<String>,
  pub reported_by: String,
}

/// Input to [`crate::store::AnimalStore::append_report_entry`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportEntryInput {
  pub timestamp:   DateTime<Utc>,
  pub location:    String,
  #[serde(default)]
  pub notes:       Option<String>,
  #[serde(default)]
  pub condition:   Option<String>,
  pub reported_by: String,
}

/// The kind of action an NGO took for an animal.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CareAction {
  Vaccination,
  Neutering,
  MedicalTreatment,
  Feeding,
  Rescue,
  Relocation,
  Other,
}

/// An NGO action appended to an animal's care history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CareEntry {
  pub seq:         i64,
  pub recorded_at: DateTime<Utc>,
  pub ngo_id:      String,
  pub ngo_name:    String,
  pub action:      CareAction,
  pub notes:       Option<String>,
}

/// Input to [`crate::store::AnimalStore::append_care_entry`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CareEntryInput {
  pub ngo_id:   String,
  pub ngo_name: String,
  pub action:   CareAction,
  #[serde(default)]
  pub notes:    Option<String>,
}

// ─── Reporter / location ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reporter {
  pub user_id:   String,
  pub user_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
  pub lat: f64,
  pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SightingLocation {
  pub address:     String,
  #[serde(default)]
  pub coordinates: Option<Coordinates>,
}

// ─── AnimalIdentity ──────────────────────────────────────────────────────────

/// A unique animal in the registry, with its histories attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimalIdentity {
  pub id:                   Uuid,
  /// Human-readable `PG-<year>-<4 digits>` identifier.
  pub system_id:            String,
  pub species:              Species,
  pub breed:                String,
  pub color:                String,
  pub distinctive_features: Vec<String>,
  pub feature_hash:         String,
  pub primary_image_url:    String,

  pub status:           AnimalStatus,
  pub is_vaccinated:    bool,
  pub vaccination_date: Option<NaiveDate>,
  pub is_neutered:      bool,

  pub assigned_ngo_id:   Option<String>,
  pub assigned_ngo_name: Option<String>,
  pub ngo_assigned_at:   Option<DateTime<Utc>>,

  pub first_reported_at:  DateTime<Utc>,
  pub first_reported_by:  String,
  pub created_by:         String,
  pub last_seen_at:       DateTime<Utc>,
  pub last_seen_location: String,

  /// Image embedding carried over from the detection backend, if any.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub embedding: Option<Vec<f32>>,

  #[serde(default)]
  pub report_history: Vec<ReportEntry>,
  #[serde(default)]
  pub care_history:   Vec<CareEntry>,
}

/// Input to [`crate::store::AnimalStore::insert_animal`]. The store assigns
/// `id` and starts both histories empty.
#[derive(Debug, Clone)]
pub struct NewAnimal {
  pub system_id:            String,
  pub species:              Species,
  pub breed:                String,
  pub color:                String,
  pub distinctive_features: Vec<String>,
  pub feature_hash:         String,
  pub primary_image_url:    String,
  pub reported_at:          DateTime<Utc>,
  pub reporter:             Reporter,
  pub location:             String,
  pub embedding:            Option<Vec<f32>>,
}

impl NewAnimal {
  /// Build the stored record; both histories start empty.
  pub fn into_identity(self, id: Uuid) -> AnimalIdentity {
    AnimalIdentity {
      id,
      system_id: self.system_id,
      species: self.species,
      breed: self.breed,
      color: self.color,
      distinctive_features: self.distinctive_features,
      feature_hash: self.feature_hash,
      primary_image_url: self.primary_image_url,
      status: AnimalStatus::Waiting,
      is_vaccinated: false,
      vaccination_date: None,
      is_neutered: false,
      assigned_ngo_id: None,
      assigned_ngo_name: None,
      ngo_assigned_at: None,
      first_reported_at: self.reported_at,
      first_reported_by: self.reporter.user_name,
      created_by: self.reporter.user_id,
      last_seen_at: self.reported_at,
      last_seen_location: self.location,
      embedding: self.embedding,
      report_history: Vec::new(),
      care_history: Vec::new(),
    }
  }
}

// ─── AnimalUpdate ────────────────────────────────────────────────────────────

/// NGO-side patch of an animal's current state. `None` leaves a field alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnimalUpdate {
  #[serde(default)]
  pub status:            Option<AnimalStatus>,
  #[serde(default)]
  pub is_vaccinated:     Option<bool>,
  #[serde(default)]
  pub vaccination_date:  Option<NaiveDate>,
  #[serde(default)]
  pub is_neutered:       Option<bool>,
  #[serde(default)]
  pub assigned_ngo_id:   Option<String>,
  #[serde(default)]
  pub assigned_ngo_name: Option<String>,
  #[serde(default)]
  pub ngo_assigned_at:   Option<DateTime<Utc>>,
}

impl AnimalUpdate {
  pub fn is_empty(&self) -> bool {
    self.status.is_none()
      && self.is_vaccinated.is_none()
      && self.vaccination_date.is_none()
      && self.is_neutered.is_none()
      && self.assigned_ngo_id.is_none()
      && self.assigned_ngo_name.is_none()
      && self.ngo_assigned_at.is_none()
  }

  /// Overwrite every field that is set. Last write wins.
  pub fn apply(&self, animal: &mut AnimalIdentity) {
    if let Some(status) = self.status {
      animal.status = status;
    }
    if let Some(v) = self.is_vaccinated {
      animal.is_vaccinated = v;
      if !v {
        animal.vaccination_date = None;
      }
    }
    // Clearing the flag also drops a date sent alongside it.
    if let Some(d) = self.vaccination_date.filter(|_| self.is_vaccinated != Some(false)) {
      animal.vaccination_date = Some(d);
    }
    if let Some(n) = self.is_neutered {
      animal.is_neutered = n;
    }
    if let Some(id) = &self.assigned_ngo_id {
      animal.assigned_ngo_id = Some(id.clone());
    }
    if let Some(name) = &self.assigned_ngo_name {
      animal.assigned_ngo_name = Some(name.clone());
    }
    if let Some(at) = self.ngo_assigned_at {
      animal.ngo_assigned_at = Some(at);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn loose_species_parsing() {
    assert_eq!(Species::from_loose(" Dog "), Species::Dog);
    assert_eq!(Species::from_loose("feline"), Species::Cat);
    assert_eq!(Species::from_loose("rabbit"), Species::Unknown);
    assert_eq!(Species::from_loose(""), Species::Unknown);
  }

  #[test]
  fn unknown_species_registers_as_dog() {
    assert_eq!(Species::Unknown.registry_species(), Species::Dog);
    assert_eq!(Species::Cat.registry_species(), Species::Cat);
  }

  #[test]
  fn species_strum_roundtrip() {
    assert_eq!(Species::Cat.to_string(), "cat");
    assert_eq!("DOG".parse::<Species>().unwrap(), Species::Dog);
    assert_eq!(AnimalStatus::InCare.as_ref(), "in_care");
    assert_eq!(
      "medical_treatment".parse::<CareAction>().unwrap(),
      CareAction::MedicalTreatment
    );
  }

  fn animal() -> AnimalIdentity {
    NewAnimal {
      system_id:            "PG-2026-0001".into(),
      species:              Species::Dog,
      breed:                "Labrador".into(),
      color:                "black".into(),
      distinctive_features: vec![],
      feature_hash:         "0".into(),
      primary_image_url:    String::new(),
      reported_at:          Utc::now(),
      reporter:             Reporter {
        user_id:   "u1".into(),
        user_name: "Asha".into(),
      },
      location:             "Pune".into(),
      embedding:            None,
    }
    .into_identity(Uuid::new_v4())
  }

  #[test]
  fn update_is_idempotent() {
    let mut animal = animal();
    let update = AnimalUpdate {
      is_vaccinated: Some(true),
      ..Default::default()
    };
    update.apply(&mut animal);
    let once = animal.clone();
    update.apply(&mut animal);
    assert_eq!(once, animal);
    assert!(animal.is_vaccinated);
    assert!(!animal.is_neutered);
  }

  #[test]
  fn unvaccinating_clears_the_date() {
    let mut animal = animal();
    let day = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
    AnimalUpdate {
      is_vaccinated: Some(true),
      vaccination_date: Some(day),
      ..Default::default()
    }
    .apply(&mut animal);
    assert_eq!(animal.vaccination_date, Some(day));

    AnimalUpdate {
      is_vaccinated: Some(false),
      vaccination_date: Some(day),
      ..Default::default()
    }
    .apply(&mut animal);
    assert!(!animal.is_vaccinated);
    assert_eq!(animal.vaccination_date, None);
  }
}
