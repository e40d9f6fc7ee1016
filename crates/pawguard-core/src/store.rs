//! The store traits and supporting query types.
//!
//! Implemented by storage backends (e.g. `pawguard-store-sqlite`). The
//! services in [`crate::registry`] and [`crate::desk`] depend on these
//! traits, not on any concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  animal::{
    AnimalIdentity, AnimalStatus, AnimalUpdate, CareEntryInput, NewAnimal, ReportEntryInput,
    Species,
  },
  lifecycle::TransitionError,
  report::{
    AnimalReport, NewReport, NgoActor, ReportAction, ReportStatus, StatusChange,
  },
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// Parameters for [`AnimalStore::list_animals`]. Results are ordered by
/// `last_seen_at`, most recent first.
#[derive(Debug, Clone, Default)]
pub struct AnimalQuery {
  pub species:    Option<Species>,
  pub status:     Option<AnimalStatus>,
  /// Restrict to records created by this user id.
  pub created_by: Option<String>,
  /// Case-insensitive substring of `last_seen_location`.
  pub region:     Option<String>,
  pub limit:      Option<usize>,
}

/// Parameters for [`ReportStore::list_reports`]. Results are ordered by
/// `created_at`, newest first.
#[derive(Debug, Clone, Default)]
pub struct ReportQuery {
  pub status:        Option<ReportStatus>,
  pub disaster_mode: Option<bool>,
  pub reporter_id:   Option<String>,
  pub limit:         Option<usize>,
}

/// Result of [`ReportStore::apply_action`].
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
  NotFound,
  /// The lifecycle rules refused the action; nothing was written.
  Rejected(TransitionError),
  Applied {
    report: AnimalReport,
    change: StatusChange,
  },
}

// ─── Traits ──────────────────────────────────────────────────────────────────

/// Registry storage.
///
/// Histories are append-only. Sequence numbers and timestamps of appended
/// entries are assigned by the store, and every append updates the record in
/// the same transaction.
///
/// All methods return `Send` futures so the traits can be used from axum
/// handlers on a multi-threaded runtime.
pub trait AnimalStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Persist a new record. Returns `None` if `system_id` is already taken.
  fn insert_animal(
    &self,
    input: NewAnimal,
  ) -> impl Future<Output = Result<Option<AnimalIdentity>, Self::Error>> + Send + '_;

  /// Retrieve a record with both histories attached.
  fn get_animal(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<AnimalIdentity>, Self::Error>> + Send + '_;

  fn list_animals<'a>(
    &'a self,
    query: &'a AnimalQuery,
  ) -> impl Future<Output = Result<Vec<AnimalIdentity>, Self::Error>> + Send + 'a;

  /// Patch current state. Returns `None` if the record does not exist.
  fn update_animal(
    &self,
    id: Uuid,
    update: AnimalUpdate,
  ) -> impl Future<Output = Result<Option<AnimalIdentity>, Self::Error>> + Send + '_;

  /// Append a sighting and move `last_seen_*` to it.
  fn append_report_entry(
    &self,
    id: Uuid,
    entry: ReportEntryInput,
  ) -> impl Future<Output = Result<Option<AnimalIdentity>, Self::Error>> + Send + '_;

  fn append_care_entry(
    &self,
    id: Uuid,
    entry: CareEntryInput,
  ) -> impl Future<Output = Result<Option<AnimalIdentity>, Self::Error>> + Send + '_;

  /// Every stored embedding for `species` as `(animal id, vector)`.
  fn animal_embeddings(
    &self,
    species: Species,
  ) -> impl Future<Output = Result<Vec<(Uuid, Vec<f32>)>, Self::Error>> + Send + '_;
}

/// Report storage. Reports are never deleted.
pub trait ReportStore: AnimalStore {
  /// Persist a new report. The store assigns `id`, the yearly sequential
  /// `report_id` and the timestamps in one transaction.
  fn insert_report(
    &self,
    input: NewReport,
  ) -> impl Future<Output = Result<AnimalReport, Self::Error>> + Send + '_;

  fn get_report(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<AnimalReport>, Self::Error>> + Send + '_;

  fn list_reports<'a>(
    &'a self,
    query: &'a ReportQuery,
  ) -> impl Future<Output = Result<Vec<AnimalReport>, Self::Error>> + Send + 'a;

  /// Load, apply [`crate::lifecycle::apply`], write the report and append
  /// the status change, all in one transaction.
  fn apply_action(
    &self,
    id: Uuid,
    action: ReportAction,
    actor: NgoActor,
  ) -> impl Future<Output = Result<ActionOutcome, Self::Error>> + Send + '_;

  /// The audit log of one report, newest first.
  fn status_history(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Vec<StatusChange>, Self::Error>> + Send + '_;

  /// Reports that carry both latitude and longitude.
  fn reports_with_coordinates(
    &self,
    disaster_only: bool,
  ) -> impl Future<Output = Result<Vec<AnimalReport>, Self::Error>> + Send + '_;

  /// Flip `disaster_mode` on the given reports. Returns how many rows
  /// changed.
  fn set_disaster_mode(
    &self,
    ids: Vec<Uuid>,
    enabled: bool,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;
}
