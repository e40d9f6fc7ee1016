//! Integration tests for `SqliteStore` and the core services running on it,
//! against an in-memory database.

use std::sync::Arc;

use chrono::{Datelike, Utc};
use pawguard_core::{
  Error as CoreError,
  animal::{
    AnimalStatus, AnimalUpdate, CareAction, CareEntryInput, Coordinates, NewAnimal,
    ReportEntryInput, Reporter, SightingLocation, Species,
  },
  desk::ReportDesk,
  hash::feature_hash,
  ids::is_system_id,
  identification::{Identification, IdentificationSource},
  registry::Registry,
  report::{
    ChangeAction, NgoActor, ReportEventKind, ReportStatus, RescueOutcome, WeatherSnapshot,
    WelfareFlag,
  },
  store::{AnimalStore, ReportQuery},
  submission::{SightingSubmission, SubmissionError},
};
use rand_core::{RngCore, impls};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> Arc<SqliteStore> {
  Arc::new(
    SqliteStore::open_in_memory()
      .await
      .expect("in-memory store"),
  )
}

/// Replays a fixed sequence of `u32`s, repeating the last one.
struct Scripted(Vec<u32>);

impl RngCore for Scripted {
  fn next_u32(&mut self) -> u32 {
    if self.0.len() > 1 {
      self.0.remove(0)
    } else {
      self.0[0]
    }
  }

  fn next_u64(&mut self) -> u64 { impls::next_u64_via_u32(self) }

  fn fill_bytes(&mut self, dest: &mut [u8]) { impls::fill_bytes_via_next(self, dest) }

  fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
    self.fill_bytes(dest);
    Ok(())
  }
}

fn identification(species: Species, breed: &str, color: &str) -> Identification {
  Identification {
    species,
    breed: breed.into(),
    color: color.into(),
    distinctive_features: vec!["white patch on chest".into()],
    confidence: 0.95,
    is_emergency: false,
    health_notes: None,
    source: IdentificationSource::CloudVision,
  }
}

fn reporter() -> Reporter {
  Reporter {
    user_id:   "user-1".into(),
    user_name: "Asha".into(),
  }
}

fn ngo() -> NgoActor {
  NgoActor {
    ngo_id:   "ngo-1".into(),
    ngo_name: "Paws Trust".into(),
  }
}

fn sighting(address: &str, coordinates: Option<Coordinates>) -> SightingSubmission {
  SightingSubmission {
    photo_url: "http://localhost/api/images/2026/abc.jpg".into(),
    identification: Some(identification(Species::Dog, "Indie", "brown")),
    reporter: reporter(),
    reporter_phone: Some("+91 90000 00000".into()),
    location: SightingLocation {
      address: address.into(),
      coordinates,
    },
    notes: Some("near the bus stop".into()),
    condition: Some("limping".into()),
    match_animal_id: None,
    weather: WeatherSnapshot {
      condition:   Some("Rain".into()),
      temperature: Some(24.5),
      alert:       None,
    },
  }
}

fn entry(location: &str) -> ReportEntryInput {
  ReportEntryInput {
    timestamp:   Utc::now(),
    location:    location.into(),
    notes:       None,
    condition:   None,
    reported_by: "Ravi".into(),
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn duplicate_system_id_is_not_inserted() {
  let s = store().await;
  let input = NewAnimal {
    system_id:            "PG-2026-0001".into(),
    species:              Species::Cat,
    breed:                "Persian".into(),
    color:                "white".into(),
    distinctive_features: vec![],
    feature_hash:         feature_hash(Species::Cat, "Persian", "white"),
    primary_image_url:    "http://img/1.jpg".into(),
    reported_at:          Utc::now(),
    reporter:             reporter(),
    location:             "Baner, Pune".into(),
    embedding:            None,
  };

  let first = s.insert_animal(input.clone()).await.unwrap().unwrap();
  assert!(s.insert_animal(input).await.unwrap().is_none());

  let fetched = s.get_animal(first.id).await.unwrap().unwrap();
  assert_eq!(fetched, first);
}

#[tokio::test]
async fn missing_animal_returns_none() {
  let s = store().await;
  assert!(s.get_animal(Uuid::new_v4()).await.unwrap().is_none());
  assert!(
    s.append_report_entry(Uuid::new_v4(), entry("x"))
      .await
      .unwrap()
      .is_none()
  );
}

// ─── Registry ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn unknown_species_is_registered_as_dog() {
  let registry = Registry::new(store().await);
  let result = identification(Species::Unknown, "Mixed", "Unknown");

  let animal = registry
    .create_animal_identity(&result, "http://img/1.jpg", &reporter(), "Pune")
    .await
    .unwrap();

  assert_eq!(animal.species, Species::Dog);
  assert_eq!(animal.feature_hash, "26c43bcb");
  assert!(is_system_id(&animal.system_id));
  assert_eq!(animal.status, AnimalStatus::Waiting);
  assert_eq!(animal.first_reported_by, "Asha");
  assert_eq!(animal.created_by, "user-1");
  assert!(animal.report_history.is_empty());
}

#[tokio::test]
async fn system_id_collision_retries_then_gives_up() {
  let registry = Registry::new(store().await);
  let result = identification(Species::Cat, "Siamese", "cream");
  let year = Utc::now().year();

  let first = registry
    .create_animal_identity_with_rng(&result, "u", &reporter(), "Pune", &mut Scripted(vec![42]))
    .await
    .unwrap();
  assert_eq!(first.system_id, format!("PG-{year}-0042"));

  let second = registry
    .create_animal_identity_with_rng(
      &result,
      "u",
      &reporter(),
      "Pune",
      &mut Scripted(vec![42, 42, 7]),
    )
    .await
    .unwrap();
  assert_eq!(second.system_id, format!("PG-{year}-0007"));

  let err = registry
    .create_animal_identity_with_rng(&result, "u", &reporter(), "Pune", &mut Scripted(vec![7]))
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::SystemIdExhausted(8)));
}

#[tokio::test]
async fn report_append_moves_last_seen() {
  let registry = Registry::new(store().await);
  let animal = registry
    .create_animal_identity(
      &identification(Species::Dog, "Indie", "brown"),
      "u",
      &reporter(),
      "Aundh, Pune",
    )
    .await
    .unwrap();

  registry
    .add_report_to_animal(animal.id, entry("Baner, Pune"))
    .await
    .unwrap();
  let latest = entry("Pashan, Pune");
  let updated = registry
    .add_report_to_animal(animal.id, latest.clone())
    .await
    .unwrap();

  assert_eq!(updated.report_history.len(), 2);
  assert!(updated.report_history[0].seq < updated.report_history[1].seq);
  assert_eq!(updated.last_seen_location, "Pashan, Pune");
  assert_eq!(updated.last_seen_at, latest.timestamp);
  assert_eq!(updated.first_reported_at, animal.first_reported_at);

  let err = registry
    .add_report_to_animal(Uuid::new_v4(), entry("x"))
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::AnimalNotFound(_)));
}

#[tokio::test]
async fn care_entries_and_status_updates() {
  let registry = Registry::new(store().await);
  let animal = registry
    .create_animal_identity(&identification(Species::Cat, "Tabby", "grey"), "u", &reporter(), "Pune")
    .await
    .unwrap();

  let updated = registry
    .add_care_entry(animal.id, CareEntryInput {
      ngo_id:   "ngo-1".into(),
      ngo_name: "Paws Trust".into(),
      action:   CareAction::Vaccination,
      notes:    Some("rabies".into()),
    })
    .await
    .unwrap();
  assert_eq!(updated.care_history.len(), 1);
  assert_eq!(updated.care_history[0].action, CareAction::Vaccination);

  let patched = registry
    .update_animal_status(animal.id, AnimalUpdate {
      status: Some(AnimalStatus::InCare),
      is_vaccinated: Some(true),
      assigned_ngo_id: Some("ngo-1".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(patched.status, AnimalStatus::InCare);
  assert!(patched.is_vaccinated);
  assert_eq!(patched.assigned_ngo_id.as_deref(), Some("ngo-1"));
  assert_eq!(patched.care_history.len(), 1);

  let listed = registry.list_animals(Some(AnimalStatus::InCare), None).await.unwrap();
  assert_eq!(listed.len(), 1);
  assert!(registry.list_animals(Some(AnimalStatus::Adopted), None).await.unwrap().is_empty());
}

#[tokio::test]
async fn similar_search_filters_by_species_and_features() {
  let registry = Registry::new(store().await);
  let add = |species, breed: &'static str, color: &'static str, loc: &'static str| {
    let registry = registry.clone();
    async move {
      registry
        .create_animal_identity(&identification(species, breed, color), "u", &reporter(), loc)
        .await
        .unwrap()
    }
  };

  add(Species::Dog, "Labrador Retriever", "black", "Kothrud, Pune").await;
  add(Species::Dog, "Indie", "brown", "Andheri, Mumbai").await;
  add(Species::Dog, "Beagle", "tricolor", "Kothrud, Pune").await;
  add(Species::Cat, "Labrador", "black", "Kothrud, Pune").await;

  let results = registry
    .search_similar_animals(Species::Dog, "labrador", "brown", None)
    .await
    .unwrap();
  assert_eq!(results.len(), 2);
  for a in &results {
    assert_eq!(a.species, Species::Dog);
    let breed = a.breed.to_lowercase();
    let color = a.color.to_lowercase();
    assert!(
      breed.contains("labrador") || "labrador".contains(&breed) || color.contains("brown")
    );
  }
  // Most recently seen first.
  assert_eq!(results[0].breed, "Indie");

  let in_pune = registry
    .search_similar_animals(Species::Dog, "labrador", "brown", Some("pune"))
    .await
    .unwrap();
  assert_eq!(in_pune.len(), 1);
  assert_eq!(in_pune[0].breed, "Labrador Retriever");

  assert_eq!(registry.animals_by_region("kothrud").await.unwrap().len(), 3);
  assert_eq!(registry.animals_by_user("user-1").await.unwrap().len(), 4);
}

#[tokio::test]
async fn similar_search_only_looks_at_the_most_recent_window() {
  let registry = Registry::new(store().await);
  let add = |species, breed: &'static str, color: &'static str| {
    let registry = registry.clone();
    async move {
      registry
        .create_animal_identity(&identification(species, breed, color), "u", &reporter(), "Pune")
        .await
        .unwrap()
    }
  };

  let oldest = add(Species::Dog, "Labrador", "black").await;
  let second = add(Species::Dog, "Labrador", "black").await;
  for _ in 0..19 {
    add(Species::Dog, "Labrador", "black").await;
  }

  let results = registry
    .search_similar_animals(Species::Dog, "labrador", "black", None)
    .await
    .unwrap();
  assert_eq!(results.len(), 20);
  assert!(results.iter().all(|a| a.id != oldest.id));
  assert!(results.windows(2).all(|w| w[0].last_seen_at >= w[1].last_seen_at));

  // A newer non-matching dog takes a slot in the window; a cat does not.
  add(Species::Dog, "Beagle", "tricolor").await;
  add(Species::Cat, "Labrador", "black").await;
  let results = registry
    .search_similar_animals(Species::Dog, "labrador", "black", None)
    .await
    .unwrap();
  assert_eq!(results.len(), 19);
  assert!(results.iter().all(|a| a.id != oldest.id && a.id != second.id));
}

#[tokio::test]
async fn embedding_match_ranks_by_cosine() {
  let registry = Registry::new(store().await);
  for (n, embedding) in [vec![1.0, 0.0, 0.0], vec![0.9, 0.1, 0.0], vec![0.0, 1.0, 0.0]]
    .into_iter()
    .enumerate()
  {
    let mut result = identification(Species::Dog, "Indie", "brown");
    result.source = IdentificationSource::Yolo {
      detections: vec![],
      embedding:  Some(embedding),
    };
    registry
      .create_animal_identity(&result, &format!("u{n}"), &reporter(), "Pune")
      .await
      .unwrap();
  }
  // Different dimension, skipped.
  let mut odd = identification(Species::Dog, "Indie", "brown");
  odd.source = IdentificationSource::Yolo {
    detections: vec![],
    embedding:  Some(vec![1.0, 0.0]),
  };
  registry
    .create_animal_identity(&odd, "odd", &reporter(), "Pune")
    .await
    .unwrap();

  let matches = registry
    .match_by_embedding(Species::Dog, &[1.0, 0.0, 0.0], 0.8, 10)
    .await
    .unwrap();
  assert_eq!(matches.len(), 2);
  assert_eq!(matches[0].animal.primary_image_url, "u0");
  assert!(matches[0].score >= matches[1].score);

  assert!(
    registry
      .match_by_embedding(Species::Cat, &[1.0, 0.0, 0.0], 0.0, 10)
      .await
      .unwrap()
      .is_empty()
  );
}

// ─── Submission ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_photo_never_touches_the_registry() {
  let desk = ReportDesk::new(store().await);
  let mut s = sighting("Pune", None);
  s.photo_url = String::new();

  let err = desk.submit_sighting(s).await.unwrap_err();
  assert!(matches!(err, CoreError::Submission(SubmissionError::MissingPhoto)));
  assert_eq!(err.to_string(), "Please add a photo of the animal");

  assert!(desk.registry().list_animals(None, None).await.unwrap().is_empty());
  assert!(desk.list_reports(&ReportQuery::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn missing_analysis_is_distinct() {
  let desk = ReportDesk::new(store().await);
  let mut s = sighting("Pune", None);
  s.identification = None;

  let err = desk.submit_sighting(s).await.unwrap_err();
  assert_eq!(err.to_string(), "Please run AI analysis before submitting");
  assert!(desk.registry().list_animals(None, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn submission_creates_animal_and_numbered_report() {
  let desk = ReportDesk::new(store().await);
  let mut events = desk.subscribe();
  let year = Utc::now().year();

  let first = desk.submit_sighting(sighting("FC Road, Pune", None)).await.unwrap();
  assert_eq!(first.report.report_id, format!("RPT-{year}-0001"));
  assert_eq!(first.report.animal_id, Some(first.animal.id));
  assert_eq!(first.report.status, ReportStatus::New);
  assert_eq!(first.report.weather.temperature, Some(24.5));
  assert_eq!(
    first.report.distinctive_features.as_deref(),
    Some("white patch on chest")
  );
  assert_eq!(first.animal.report_history.len(), 1);
  assert_eq!(first.animal.report_history[0].reported_by, "Asha");
  assert_eq!(first.animal.report_history[0].condition.as_deref(), Some("limping"));

  let event = events.recv().await.unwrap();
  assert_eq!(event.kind, ReportEventKind::Created);
  assert_eq!(event.report.id, first.report.id);

  let second = desk.submit_sighting(sighting("JM Road, Pune", None)).await.unwrap();
  assert_eq!(second.report.report_id, format!("RPT-{year}-0002"));
  assert_ne!(second.animal.id, first.animal.id);
}

#[tokio::test]
async fn matched_submission_appends_to_existing_animal() {
  let desk = ReportDesk::new(store().await);
  let first = desk.submit_sighting(sighting("FC Road, Pune", None)).await.unwrap();

  let mut again = sighting("Deccan, Pune", None);
  again.match_animal_id = Some(first.animal.id);
  let second = desk.submit_sighting(again).await.unwrap();

  assert_eq!(second.animal.id, first.animal.id);
  assert_eq!(second.animal.report_history.len(), 2);
  assert_eq!(second.animal.last_seen_location, "Deccan, Pune");
  assert_eq!(desk.registry().list_animals(None, None).await.unwrap().len(), 1);

  let mut stray = sighting("x", None);
  stray.match_animal_id = Some(Uuid::new_v4());
  assert!(matches!(
    desk.submit_sighting(stray).await.unwrap_err(),
    CoreError::AnimalNotFound(_)
  ));
}

// ─── Lifecycle ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn actions_are_logged_newest_first() {
  let desk = ReportDesk::new(store().await);
  let report = desk.submit_sighting(sighting("Pune", None)).await.unwrap().report;

  let assigned = desk.assign(report.id, &ngo()).await.unwrap();
  assert_eq!(assigned.status, ReportStatus::InProgress);

  let rescued = desk
    .set_welfare(report.id, WelfareFlag::Rescued, true, Some("picked up".into()), &ngo())
    .await
    .unwrap();
  assert_eq!(rescued.status, ReportStatus::Rescued);
  assert!(rescued.rescue_date.is_some());

  desk
    .set_outcome(report.id, RescueOutcome::ShelterRecovery, &ngo())
    .await
    .unwrap();
  let resolved = desk
    .update_status(report.id, ReportStatus::Resolved, None, &ngo())
    .await
    .unwrap();
  assert!(resolved.resolved_at.is_some());

  let history = desk.status_history(report.id).await.unwrap();
  let actions: Vec<_> = history.iter().map(|c| c.action).collect();
  assert_eq!(actions, vec![
    ChangeAction::StatusChange,
    ChangeAction::Outcome,
    ChangeAction::Rescue,
    ChangeAction::Assignment,
  ]);
  assert!(history.windows(2).all(|w| w[0].seq > w[1].seq));
  assert!(history.iter().all(|c| c.changed_by_name == "Paws Trust"));

  let stored = desk.get_report(report.id).await.unwrap();
  assert_eq!(stored, resolved);
}

#[tokio::test]
async fn invalid_transition_is_rejected_and_not_logged() {
  let desk = ReportDesk::new(store().await);
  let report = desk.submit_sighting(sighting("Pune", None)).await.unwrap().report;
  desk
    .update_status(report.id, ReportStatus::Resolved, None, &ngo())
    .await
    .unwrap();

  let err = desk
    .update_status(report.id, ReportStatus::InProgress, None, &ngo())
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::InvalidTransition(_)));
  assert_eq!(desk.status_history(report.id).await.unwrap().len(), 1);
  assert_eq!(
    desk.get_report(report.id).await.unwrap().status,
    ReportStatus::Resolved
  );

  let missing = desk.assign(Uuid::new_v4(), &ngo()).await.unwrap_err();
  assert!(matches!(missing, CoreError::ReportNotFound(_)));
}

#[tokio::test]
async fn welfare_toggles_are_idempotent_in_the_store() {
  let desk = ReportDesk::new(store().await);
  let report = desk.submit_sighting(sighting("Pune", None)).await.unwrap().report;

  let once = desk
    .set_welfare(report.id, WelfareFlag::Neutered, true, None, &ngo())
    .await
    .unwrap();
  let twice = desk
    .set_welfare(report.id, WelfareFlag::Neutered, true, None, &ngo())
    .await
    .unwrap();
  assert_eq!(once.is_neutered, twice.is_neutered);
  assert_eq!(once.neutered_date, twice.neutered_date);
  assert_eq!(once.status, twice.status);
  assert_eq!(twice.status, ReportStatus::New);
}

#[tokio::test]
async fn notes_and_updates_are_broadcast() {
  let desk = ReportDesk::new(store().await);
  let report = desk.submit_sighting(sighting("Pune", None)).await.unwrap().report;
  let mut events = desk.subscribe();

  desk
    .set_notes(report.id, "needs vet".into(), &ngo())
    .await
    .unwrap();
  let event = events.recv().await.unwrap();
  assert_eq!(event.kind, ReportEventKind::Updated);
  assert_eq!(event.report.ngo_notes.as_deref(), Some("needs vet"));
}

// ─── Queries and zones ───────────────────────────────────────────────────────

#[tokio::test]
async fn list_reports_filters() {
  let desk = ReportDesk::new(store().await);
  let a = desk.submit_sighting(sighting("Pune", None)).await.unwrap().report;
  let mut other = sighting("Mumbai", None);
  other.reporter.user_id = "user-2".into();
  desk.submit_sighting(other).await.unwrap();
  desk.assign(a.id, &ngo()).await.unwrap();

  let all = desk.list_reports(&ReportQuery::default()).await.unwrap();
  assert_eq!(all.len(), 2);
  assert!(all[0].created_at >= all[1].created_at);

  let in_progress = desk
    .list_reports(&ReportQuery {
      status: Some(ReportStatus::InProgress),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(in_progress.len(), 1);
  assert_eq!(in_progress[0].id, a.id);

  assert_eq!(desk.reports_by_user("user-2").await.unwrap().len(), 1);
  let limited = desk
    .list_reports(&ReportQuery {
      limit: Some(1),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(limited.len(), 1);
}

#[tokio::test]
async fn disaster_mode_for_zone() {
  let desk = ReportDesk::new(store().await);
  let pune = Coordinates {
    lat: 18.5204,
    lng: 73.8567,
  };
  let nearby = Coordinates {
    lat: 18.53,
    lng: 73.85,
  };
  let mumbai = Coordinates {
    lat: 19.0760,
    lng: 72.8777,
  };
  desk.submit_sighting(sighting("Pune", Some(pune))).await.unwrap();
  desk.submit_sighting(sighting("Shivajinagar", Some(nearby))).await.unwrap();
  desk.submit_sighting(sighting("Mumbai", Some(mumbai))).await.unwrap();
  desk.submit_sighting(sighting("Unknown spot", None)).await.unwrap();

  assert_eq!(desk.reports_in_zone(pune, 10.0, false).await.unwrap().len(), 2);
  assert_eq!(desk.reports_in_zone(pune, 200.0, false).await.unwrap().len(), 3);

  let updated = desk.set_disaster_mode_for_zone(pune, 10.0, true).await.unwrap();
  assert_eq!(updated, 2);
  // Already flagged reports are not counted again.
  assert_eq!(desk.set_disaster_mode_for_zone(pune, 10.0, true).await.unwrap(), 0);

  let flagged = desk.reports_in_zone(pune, 500.0, true).await.unwrap();
  assert_eq!(flagged.len(), 2);
  assert!(flagged.iter().all(|r| r.disaster_mode));

  let by_flag = desk
    .list_reports(&ReportQuery {
      disaster_mode: Some(true),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(by_flag.len(), 2);
}
