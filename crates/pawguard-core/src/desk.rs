//! The report desk: sighting submission, NGO actions on reports, and the
//! live event feed.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
  Error, Result,
  animal::{AnimalIdentity, Coordinates, ReportEntryInput},
  matching::haversine_km,
  registry::Registry,
  report::{
    AnimalReport, NewReport, NgoActor, ReportAction, ReportEvent, ReportEventKind,
    ReportStatus, RescueOutcome, StatusChange, WelfareFlag,
  },
  store::{ActionOutcome, ReportQuery, ReportStore},
  submission::SightingSubmission,
};

/// Capacity of the report event channel. Subscribers further behind than
/// this lose the oldest events.
pub const EVENT_CAPACITY: usize = 256;

/// What a successful submission produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sighting {
  pub animal: AnimalIdentity,
  pub report: AnimalReport,
}

pub struct ReportDesk<S> {
  store:    Arc<S>,
  registry: Registry<S>,
  events:   broadcast::Sender<ReportEvent>,
}

impl<S> Clone for ReportDesk<S> {
  fn clone(&self) -> Self {
    Self {
      store:    Arc::clone(&self.store),
      registry: self.registry.clone(),
      events:   self.events.clone(),
    }
  }
}

impl<S: ReportStore> ReportDesk<S> {
  pub fn new(store: Arc<S>) -> Self {
    let (events, _) = broadcast::channel(EVENT_CAPACITY);
    Self {
      registry: Registry::new(Arc::clone(&store)),
      store,
      events,
    }
  }

  pub fn registry(&self) -> &Registry<S> { &self.registry }

  /// A receiver for every report created or changed from now on.
  pub fn subscribe(&self) -> broadcast::Receiver<ReportEvent> { self.events.subscribe() }

  fn publish(&self, kind: ReportEventKind, report: &AnimalReport) {
    let event = ReportEvent {
      kind,
      report: report.clone(),
    };
    if self.events.send(event).is_err() {
      debug!(report_id = %report.report_id, "no event subscribers");
    }
  }

  // ── Submission ────────────────────────────────────────────────────────

  /// File a citizen sighting.
  ///
  /// Guards run before any write. The sighting is appended to
  /// `match_animal_id` when given, otherwise a new registry record is
  /// created with the sighting as its first entry. The report is linked to
  /// the resulting animal.
  pub async fn submit_sighting(&self, submission: SightingSubmission) -> Result<Sighting> {
    let identification = submission.validate()?;
    let now = Utc::now();

    let entry = ReportEntryInput {
      timestamp:   now,
      location:    submission.location.address.clone(),
      notes:       submission.notes.clone(),
      condition:   submission.condition.clone(),
      reported_by: submission.reporter.user_name.clone(),
    };

    let animal_id = match submission.match_animal_id {
      Some(id) => id,
      None => {
        self
          .registry
          .create_animal_identity(
            identification,
            &submission.photo_url,
            &submission.reporter,
            &submission.location.address,
          )
          .await?
          .id
      }
    };
    let animal = self.registry.add_report_to_animal(animal_id, entry).await?;

    let features = identification.distinctive_features.join(", ");
    let input = NewReport {
      animal_id:            Some(animal.id),
      reporter_id:          submission.reporter.user_id.clone(),
      reporter_name:        submission.reporter.user_name.clone(),
      reporter_phone:       submission.reporter_phone.clone(),
      species:              identification.species,
      breed:                Some(identification.breed.clone()),
      color:                Some(identification.color.clone()),
      distinctive_features: (!features.is_empty()).then_some(features),
      health_notes:         identification.health_notes.clone(),
      is_emergency:         identification.is_emergency,
      image_url:            submission.photo_url.clone(),
      address:              submission.location.address.clone(),
      coordinates:          submission.location.coordinates,
      weather:              submission.weather.clone(),
    };
    let report = self.store.insert_report(input).await.map_err(Error::store)?;

    info!(
      report_id = %report.report_id,
      system_id = %animal.system_id,
      emergency = report.is_emergency,
      "sighting filed"
    );
    self.publish(ReportEventKind::Created, &report);
    Ok(Sighting { animal, report })
  }

  // ── NGO actions ───────────────────────────────────────────────────────

  /// Apply one NGO action, log it, and notify subscribers.
  pub async fn apply(
    &self,
    id: Uuid,
    action: ReportAction,
    actor: &NgoActor,
  ) -> Result<(AnimalReport, StatusChange)> {
    match self
      .store
      .apply_action(id, action, actor.clone())
      .await
      .map_err(Error::store)?
    {
      ActionOutcome::NotFound => Err(Error::ReportNotFound(id)),
      ActionOutcome::Rejected(e) => Err(e.into()),
      ActionOutcome::Applied { report, change } => {
        info!(
          report_id = %report.report_id,
          action = %change.action,
          status = %report.status,
          ngo = %actor.ngo_name,
          "report updated"
        );
        self.publish(ReportEventKind::Updated, &report);
        Ok((report, change))
      }
    }
  }

  pub async fn update_status(
    &self,
    id: Uuid,
    status: ReportStatus,
    notes: Option<String>,
    actor: &NgoActor,
  ) -> Result<AnimalReport> {
    Ok(self.apply(id, ReportAction::SetStatus { status, notes }, actor).await?.0)
  }

  pub async fn assign(&self, id: Uuid, actor: &NgoActor) -> Result<AnimalReport> {
    Ok(self.apply(id, ReportAction::Assign, actor).await?.0)
  }

  pub async fn set_welfare(
    &self,
    id: Uuid,
    flag: WelfareFlag,
    value: bool,
    notes: Option<String>,
    actor: &NgoActor,
  ) -> Result<AnimalReport> {
    let action = ReportAction::SetWelfare { flag, value, notes };
    Ok(self.apply(id, action, actor).await?.0)
  }

  pub async fn set_outcome(
    &self,
    id: Uuid,
    outcome: RescueOutcome,
    actor: &NgoActor,
  ) -> Result<AnimalReport> {
    Ok(self.apply(id, ReportAction::SetOutcome { outcome }, actor).await?.0)
  }

  pub async fn set_notes(
    &self,
    id: Uuid,
    notes: String,
    actor: &NgoActor,
  ) -> Result<AnimalReport> {
    Ok(self.apply(id, ReportAction::SetNotes { notes }, actor).await?.0)
  }

  // ── Queries ───────────────────────────────────────────────────────────

  pub async fn get_report(&self, id: Uuid) -> Result<AnimalReport> {
    self
      .store
      .get_report(id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::ReportNotFound(id))
  }

  pub async fn list_reports(&self, query: &ReportQuery) -> Result<Vec<AnimalReport>> {
    self.store.list_reports(query).await.map_err(Error::store)
  }

  pub async fn reports_by_user(&self, reporter_id: &str) -> Result<Vec<AnimalReport>> {
    let query = ReportQuery {
      reporter_id: Some(reporter_id.to_owned()),
      ..Default::default()
    };
    self.list_reports(&query).await
  }

  /// The audit log of a report, newest first.
  pub async fn status_history(&self, id: Uuid) -> Result<Vec<StatusChange>> {
    self.get_report(id).await?;
    self.store.status_history(id).await.map_err(Error::store)
  }

  // ── Zones ─────────────────────────────────────────────────────────────

  /// Reports within `radius_km` of `center`. Reports without coordinates are
  /// never included.
  pub async fn reports_in_zone(
    &self,
    center: Coordinates,
    radius_km: f64,
    disaster_only: bool,
  ) -> Result<Vec<AnimalReport>> {
    let reports = self
      .store
      .reports_with_coordinates(disaster_only)
      .await
      .map_err(Error::store)?;
    Ok(
      reports
        .into_iter()
        .filter(|r| {
          r.coordinates()
            .is_some_and(|c| haversine_km(center, c) <= radius_km)
        })
        .collect(),
    )
  }

  /// Flag or unflag every report in the zone. Returns how many changed.
  pub async fn set_disaster_mode_for_zone(
    &self,
    center: Coordinates,
    radius_km: f64,
    enabled: bool,
  ) -> Result<usize> {
    let ids = self
      .reports_in_zone(center, radius_km, false)
      .await?
      .into_iter()
      .filter(|r| r.disaster_mode != enabled)
      .map(|r| r.id)
      .collect::<Vec<_>>();
    if ids.is_empty() {
      return Ok(0);
    }
    let updated = self
      .store
      .set_disaster_mode(ids, enabled)
      .await
      .map_err(Error::store)?;
    info!(updated, enabled, radius_km, "disaster mode changed for zone");
    Ok(updated)
  }
}
