//! Handler for `POST /sightings`.
//!
//! The body is a [`SightingSubmission`], optionally carrying the photo inline
//! as `image_base64`. An inline photo is stored first and its URL replaces
//! `photo_url`.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use pawguard_core::{
  store::ReportStore,
  submission::SightingSubmission,
};
use serde::Deserialize;

use crate::{AppState, error::ApiError, images::decode_image};

#[derive(Debug, Deserialize)]
pub struct SightingBody {
  #[serde(flatten)]
  pub submission:   SightingSubmission,
  pub image_base64: Option<String>,
  pub mime_type:    Option<String>,
}

/// `POST /sightings`: returns 201 + `{animal, report}`.
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<SightingBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ReportStore + 'static,
{
  let mut submission = body.submission;

  if let Some(data) = body.image_base64.filter(|d| !d.trim().is_empty()) {
    // Guards that do not depend on the photo run before anything is written.
    submission
      .validate_details()
      .map_err(|e| ApiError::Submission(e.to_string()))?;
    let (bytes, data_mime) = decode_image(&data)?;
    let mime_type = body
      .mime_type
      .or(data_mime)
      .unwrap_or_else(|| "image/jpeg".to_owned());
    submission.photo_url = state
      .images
      .save(&bytes, &mime_type)
      .await
      .map_err(|e| ApiError::Store(Box::new(e)))?;
  }

  let sighting = state.desk.submit_sighting(submission).await?;
  Ok((StatusCode::CREATED, Json(sighting)))
}
