//! Content-addressed image storage and `GET /images/{*path}`.
//!
//! Images live at `<root>/<yyyy>/<sha256>.<ext>`. Writing the same bytes
//! twice yields the same path.

use std::{io, path::PathBuf};

use axum::{
  extract::{Path, State},
  http::header,
  response::IntoResponse,
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{Datelike, Utc};
use pawguard_core::store::ReportStore;
use sha2::{Digest, Sha256};
use tracing::info;

use crate::{AppState, error::ApiError};

/// Largest accepted image, after base64 decoding.
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

pub struct ImageStore {
  root:            PathBuf,
  public_base_url: String,
}

impl ImageStore {
  pub fn new(root: impl Into<PathBuf>, public_base_url: &str) -> Self {
    Self {
      root:            root.into(),
      public_base_url: public_base_url.trim_end_matches('/').to_owned(),
    }
  }

  /// Store `bytes` and return their public URL.
  pub async fn save(&self, bytes: &[u8], mime_type: &str) -> io::Result<String> {
    let hash = hex::encode(Sha256::digest(bytes));
    let relative = format!(
      "{:04}/{hash}.{}",
      Utc::now().year(),
      extension_for(mime_type)
    );
    let path = self.root.join(&relative);

    if !tokio::fs::try_exists(&path).await? {
      if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
      }
      tokio::fs::write(&path, bytes).await?;
      info!(path = %relative, bytes = bytes.len(), "stored image");
    }
    Ok(format!("{}/api/images/{relative}", self.public_base_url))
  }

  /// Read a stored image. `None` for anything that is not a stored image
  /// path or does not exist.
  pub async fn load(&self, relative: &str) -> io::Result<Option<Vec<u8>>> {
    if !is_image_path(relative) {
      return Ok(None);
    }
    match tokio::fs::read(self.root.join(relative)).await {
      Ok(bytes) => Ok(Some(bytes)),
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
      Err(e) => Err(e),
    }
  }
}

pub fn extension_for(mime_type: &str) -> &'static str {
  match mime_type {
    "image/jpeg" | "image/jpg" => "jpg",
    "image/png" => "png",
    "image/webp" => "webp",
    "image/gif" => "gif",
    "image/heic" => "heic",
    _ => "bin",
  }
}

fn mime_for(path: &str) -> &'static str {
  match path.rsplit_once('.').map(|(_, ext)| ext) {
    Some("jpg") => "image/jpeg",
    Some("png") => "image/png",
    Some("webp") => "image/webp",
    Some("gif") => "image/gif",
    Some("heic") => "image/heic",
    _ => "application/octet-stream",
  }
}

/// Only `<yyyy>/<hex>.<ext>` is ever served.
fn is_image_path(relative: &str) -> bool {
  let Some((year, file)) = relative.split_once('/') else {
    return false;
  };
  let Some((stem, ext)) = file.split_once('.') else {
    return false;
  };
  year.len() == 4
    && year.bytes().all(|b| b.is_ascii_digit())
    && stem.len() == 64
    && stem.bytes().all(|b| b.is_ascii_hexdigit())
    && !ext.is_empty()
    && ext.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// Decode a base64 image, accepting an optional `data:<mime>;base64,` prefix.
/// Returns the bytes and the MIME type from the prefix, if there was one.
pub fn decode_image(data: &str) -> Result<(Vec<u8>, Option<String>), ApiError> {
  let (mime, payload) = match data.strip_prefix("data:") {
    Some(rest) => {
      let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| ApiError::BadRequest("malformed data URL".into()))?;
      let mime = meta.strip_suffix(";base64").unwrap_or(meta);
      (Some(mime.to_owned()), payload)
    }
    None => (None, data),
  };

  let bytes = STANDARD
    .decode(payload.trim())
    .map_err(|e| ApiError::BadRequest(format!("image is not valid base64: {e}")))?;
  if bytes.is_empty() {
    return Err(ApiError::BadRequest("image is empty".into()));
  }
  if bytes.len() > MAX_IMAGE_BYTES {
    return Err(ApiError::BadRequest(format!(
      "image exceeds {MAX_IMAGE_BYTES} bytes"
    )));
  }
  Ok((bytes, mime))
}

/// `GET /images/{*path}`
pub async fn serve<S>(
  State(state): State<AppState<S>>,
  Path(path): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ReportStore + 'static,
{
  let bytes = state
    .images
    .load(&path)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(format!("image {path} not found")))?;
  Ok(([(header::CONTENT_TYPE, mime_for(&path))], bytes))
}
