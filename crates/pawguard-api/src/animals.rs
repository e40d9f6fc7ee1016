//! Handlers for `/animals` endpoints.
//!
//! | Method  | Path | Notes |
//! |---------|------|-------|
//! | `GET`   | `/animals` | Optional `status`, `species`, `created_by`, `region`, `limit` |
//! | `GET`   | `/animals/search` | `species` required; `breed`, `color`, `region` |
//! | `POST`  | `/animals/match` | Body: [`MatchBody`] |
//! | `GET`   | `/animals/{id}` | 404 if not found |
//! | `PATCH` | `/animals/{id}` | NGO. Body: [`AnimalUpdate`] |
//! | `POST`  | `/animals/{id}/reports` | Body: [`ReportEntryBody`] |
//! | `POST`  | `/animals/{id}/care` | NGO. Body: [`CareBody`] |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{DateTime, Utc};
use pawguard_core::{
  animal::{
    AnimalIdentity, AnimalStatus, AnimalUpdate, CareAction, CareEntryInput, ReportEntryInput,
    Species,
  },
  matching::{DEFAULT_MATCH_LIMIT, DEFAULT_MATCH_THRESHOLD},
  registry::EmbeddingMatch,
  store::{AnimalQuery, ReportStore},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, auth::Ngo, error::ApiError};

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Default)]
pub struct ListParams {
  pub status:     Option<AnimalStatus>,
  pub species:    Option<Species>,
  /// Records first created by this user.
  pub created_by: Option<String>,
  /// Substring of the last-seen location.
  pub region:     Option<String>,
  pub limit:      Option<usize>,
}

/// `GET /animals[?status=...][&species=...][&created_by=...][&region=...][&limit=...]`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<AnimalIdentity>>, ApiError>
where
  S: ReportStore + 'static,
{
  let query = AnimalQuery {
    species:    params.species,
    status:     params.status,
    created_by: params.created_by,
    region:     params.region,
    limit:      params.limit,
  };
  Ok(Json(state.desk.registry().find_animals(query).await?))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /animals/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<AnimalIdentity>, ApiError>
where
  S: ReportStore + 'static,
{
  Ok(Json(state.desk.registry().get_animal_by_id(id).await?))
}

// ─── Similarity ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SearchParams {
  pub species: Species,
  #[serde(default)]
  pub breed:   String,
  #[serde(default)]
  pub color:   String,
  pub region:  Option<String>,
}

/// `GET /animals/search?species=...[&breed=...][&color=...][&region=...]`
pub async fn search<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<SearchParams>,
) -> Result<Json<Vec<AnimalIdentity>>, ApiError>
where
  S: ReportStore + 'static,
{
  let animals = state
    .desk
    .registry()
    .search_similar_animals(
      params.species,
      &params.breed,
      &params.color,
      params.region.as_deref(),
    )
    .await?;
  Ok(Json(animals))
}

#[derive(Debug, Deserialize)]
pub struct MatchBody {
  pub species:   Species,
  pub embedding: Vec<f32>,
  pub threshold: Option<f32>,
  pub limit:     Option<usize>,
}

/// `POST /animals/match`
pub async fn match_embedding<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<MatchBody>,
) -> Result<Json<Vec<EmbeddingMatch>>, ApiError>
where
  S: ReportStore + 'static,
{
  if body.embedding.is_empty() {
    return Err(ApiError::BadRequest("embedding is empty".into()));
  }
  let matches = state
    .desk
    .registry()
    .match_by_embedding(
      body.species,
      &body.embedding,
      body.threshold.unwrap_or(DEFAULT_MATCH_THRESHOLD),
      body.limit.unwrap_or(DEFAULT_MATCH_LIMIT),
    )
    .await?;
  Ok(Json(matches))
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// `PATCH /animals/{id}`, NGO only.
pub async fn update<S>(
  State(state): State<AppState<S>>,
  Ngo(_actor): Ngo,
  Path(id): Path<Uuid>,
  Json(update): Json<AnimalUpdate>,
) -> Result<Json<AnimalIdentity>, ApiError>
where
  S: ReportStore + 'static,
{
  if update.is_empty() {
    return Err(ApiError::BadRequest("update sets no fields".into()));
  }
  Ok(Json(state.desk.registry().update_animal_status(id, update).await?))
}

// ─── Histories ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ReportEntryBody {
  /// Defaults to now.
  pub timestamp:   Option<DateTime<Utc>>,
  pub location:    String,
  pub notes:       Option<String>,
  pub condition:   Option<String>,
  pub reported_by: String,
}

/// `POST /animals/{id}/reports`: returns 201 + the updated record.
pub async fn add_report<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<ReportEntryBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ReportStore + 'static,
{
  let entry = ReportEntryInput {
    timestamp:   body.timestamp.unwrap_or_else(Utc::now),
    location:    body.location,
    notes:       body.notes,
    condition:   body.condition,
    reported_by: body.reported_by,
  };
  let animal = state.desk.registry().add_report_to_animal(id, entry).await?;
  Ok((StatusCode::CREATED, Json(animal)))
}

#[derive(Debug, Deserialize)]
pub struct CareBody {
  pub action: CareAction,
  pub notes:  Option<String>,
}

/// `POST /animals/{id}/care`, NGO only; the entry is attributed to the
/// authenticated NGO.
pub async fn add_care<S>(
  State(state): State<AppState<S>>,
  Ngo(actor): Ngo,
  Path(id): Path<Uuid>,
  Json(body): Json<CareBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ReportStore + 'static,
{
  let entry = CareEntryInput {
    ngo_id:   actor.ngo_id,
    ngo_name: actor.ngo_name,
    action:   body.action,
    notes:    body.notes,
  };
  let animal = state.desk.registry().add_care_entry(id, entry).await?;
  Ok((StatusCode::CREATED, Json(animal)))
}
