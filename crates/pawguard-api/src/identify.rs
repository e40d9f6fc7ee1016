//! Handler for `POST /identify`.

use axum::{Json, extract::State};
use pawguard_core::{identification::Identification, store::ReportStore};
use pawguard_identify::Backend;
use serde::Deserialize;

use crate::{AppState, error::ApiError, images::decode_image};

#[derive(Debug, Deserialize)]
pub struct IdentifyBody {
  /// Raw base64 or a `data:` URL.
  pub image_base64: String,
  /// Defaults to the data URL's type, then `image/jpeg`.
  pub mime_type:    Option<String>,
  /// Defaults to the server's configured backend.
  pub backend:      Option<Backend>,
}

/// `POST /identify`: body [`IdentifyBody`]; returns the normalised
/// [`Identification`]. Nothing is stored.
pub async fn handler<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<IdentifyBody>,
) -> Result<Json<Identification>, ApiError>
where
  S: ReportStore + 'static,
{
  let (image, data_mime) = decode_image(&body.image_base64)?;
  let mime_type = body
    .mime_type
    .or(data_mime)
    .unwrap_or_else(|| "image/jpeg".to_owned());

  let identification = state
    .identifier
    .identify(&image, &mime_type, body.backend)
    .await?;
  Ok(Json(identification))
}
