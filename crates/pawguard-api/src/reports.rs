//! Handlers for `/reports` endpoints.
//!
//! Reads are open, but only NGO callers see `ngo_notes`. Every mutation
//! requires NGO credentials and is recorded in the report's status history
//! under the authenticated NGO.

use axum::{
  Json,
  extract::{Path, Query, State},
};
use pawguard_core::{
  animal::Coordinates,
  report::{AnimalReport, ReportStatus, RescueOutcome, StatusChange, WelfareFlag},
  store::{ReportQuery, ReportStore},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppState, auth::Ngo, error::ApiError};

// ─── Reads ────────────────────────────────────────────────────────────────────

fn visible(report: AnimalReport, ngo: &Option<Ngo>) -> AnimalReport {
  match ngo {
    Some(_) => report,
    None => report.redacted(),
  }
}

#[derive(Debug, Deserialize, Default)]
pub struct ListParams {
  pub status:        Option<ReportStatus>,
  pub disaster_mode: Option<bool>,
  pub reporter_id:   Option<String>,
  pub limit:         Option<usize>,
}

/// `GET /reports[?status=...][&disaster_mode=...][&reporter_id=...][&limit=...]`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  ngo: Option<Ngo>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<AnimalReport>>, ApiError>
where
  S: ReportStore + 'static,
{
  let query = ReportQuery {
    status:        params.status,
    disaster_mode: params.disaster_mode,
    reporter_id:   params.reporter_id,
    limit:         params.limit,
  };
  let reports = state.desk.list_reports(&query).await?;
  Ok(Json(reports.into_iter().map(|r| visible(r, &ngo)).collect()))
}

/// `GET /reports/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  ngo: Option<Ngo>,
  Path(id): Path<Uuid>,
) -> Result<Json<AnimalReport>, ApiError>
where
  S: ReportStore + 'static,
{
  Ok(Json(visible(state.desk.get_report(id).await?, &ngo)))
}

/// `GET /reports/{id}/history`, newest first.
pub async fn history<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<StatusChange>>, ApiError>
where
  S: ReportStore + 'static,
{
  Ok(Json(state.desk.status_history(id).await?))
}

// ─── NGO actions ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StatusBody {
  pub status: ReportStatus,
  pub notes:  Option<String>,
}

/// `POST /reports/{id}/status`
pub async fn set_status<S>(
  State(state): State<AppState<S>>,
  Ngo(actor): Ngo,
  Path(id): Path<Uuid>,
  Json(body): Json<StatusBody>,
) -> Result<Json<AnimalReport>, ApiError>
where
  S: ReportStore + 'static,
{
  let report = state
    .desk
    .update_status(id, body.status, body.notes, &actor)
    .await?;
  Ok(Json(report))
}

/// `POST /reports/{id}/assign`: assigns the report to the caller's NGO.
pub async fn assign<S>(
  State(state): State<AppState<S>>,
  Ngo(actor): Ngo,
  Path(id): Path<Uuid>,
) -> Result<Json<AnimalReport>, ApiError>
where
  S: ReportStore + 'static,
{
  Ok(Json(state.desk.assign(id, &actor).await?))
}

#[derive(Debug, Deserialize)]
pub struct WelfareBody {
  pub flag:  WelfareFlag,
  pub value: bool,
  pub notes: Option<String>,
}

/// `POST /reports/{id}/welfare`
pub async fn welfare<S>(
  State(state): State<AppState<S>>,
  Ngo(actor): Ngo,
  Path(id): Path<Uuid>,
  Json(body): Json<WelfareBody>,
) -> Result<Json<AnimalReport>, ApiError>
where
  S: ReportStore + 'static,
{
  let report = state
    .desk
    .set_welfare(id, body.flag, body.value, body.notes, &actor)
    .await?;
  Ok(Json(report))
}

#[derive(Debug, Deserialize)]
pub struct OutcomeBody {
  pub outcome: RescueOutcome,
}

/// `POST /reports/{id}/outcome`
pub async fn outcome<S>(
  State(state): State<AppState<S>>,
  Ngo(actor): Ngo,
  Path(id): Path<Uuid>,
  Json(body): Json<OutcomeBody>,
) -> Result<Json<AnimalReport>, ApiError>
where
  S: ReportStore + 'static,
{
  Ok(Json(state.desk.set_outcome(id, body.outcome, &actor).await?))
}

#[derive(Debug, Deserialize)]
pub struct NotesBody {
  pub notes: String,
}

/// `PUT /reports/{id}/notes`: an empty string clears the notes.
pub async fn notes<S>(
  State(state): State<AppState<S>>,
  Ngo(actor): Ngo,
  Path(id): Path<Uuid>,
  Json(body): Json<NotesBody>,
) -> Result<Json<AnimalReport>, ApiError>
where
  S: ReportStore + 'static,
{
  Ok(Json(state.desk.set_notes(id, body.notes, &actor).await?))
}

// ─── Zones ────────────────────────────────────────────────────────────────────

fn check_zone(lat: f64, lng: f64, radius_km: f64) -> Result<Coordinates, ApiError> {
  if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
    return Err(ApiError::BadRequest(format!("invalid coordinates {lat},{lng}")));
  }
  if !radius_km.is_finite() || radius_km < 0.0 {
    return Err(ApiError::BadRequest(format!("invalid radius {radius_km}")));
  }
  Ok(Coordinates { lat, lng })
}

#[derive(Debug, Deserialize)]
pub struct ZoneParams {
  pub lat:           f64,
  pub lng:           f64,
  pub radius_km:     f64,
  #[serde(default)]
  pub disaster_only: bool,
}

/// `GET /reports/zone?lat=...&lng=...&radius_km=...[&disaster_only=true]`
pub async fn zone<S>(
  State(state): State<AppState<S>>,
  ngo: Option<Ngo>,
  Query(params): Query<ZoneParams>,
) -> Result<Json<Vec<AnimalReport>>, ApiError>
where
  S: ReportStore + 'static,
{
  let center = check_zone(params.lat, params.lng, params.radius_km)?;
  let reports = state
    .desk
    .reports_in_zone(center, params.radius_km, params.disaster_only)
    .await?;
  Ok(Json(reports.into_iter().map(|r| visible(r, &ngo)).collect()))
}

#[derive(Debug, Deserialize)]
pub struct DisasterModeBody {
  pub lat:       f64,
  pub lng:       f64,
  pub radius_km: f64,
  pub enabled:   bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DisasterModeResult {
  pub updated: usize,
}

/// `POST /reports/zone/disaster-mode`
pub async fn zone_disaster_mode<S>(
  State(state): State<AppState<S>>,
  Ngo(_actor): Ngo,
  Json(body): Json<DisasterModeBody>,
) -> Result<Json<DisasterModeResult>, ApiError>
where
  S: ReportStore + 'static,
{
  let center = check_zone(body.lat, body.lng, body.radius_km)?;
  let updated = state
    .desk
    .set_disaster_mode_for_zone(center, body.radius_km, body.enabled)
    .await?;
  Ok(Json(DisasterModeResult { updated }))
}
