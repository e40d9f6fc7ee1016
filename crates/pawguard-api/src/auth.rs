//! HTTP Basic-auth for NGO accounts.
//!
//! Citizen endpoints are open; every NGO mutation takes an [`Ngo`] extractor,
//! which resolves the credentials to the [`NgoActor`] recorded in the audit
//! log. Open report reads take `Option<Ngo>` so NGO callers also get the
//! private notes.

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{
  extract::{FromRequestParts, OptionalFromRequestParts},
  http::{HeaderMap, header, request::Parts},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use pawguard_core::{report::NgoActor, store::ReportStore};
use serde::Deserialize;
use tracing::debug;

use crate::{AppState, error::ApiError};

/// One NGO login.
#[derive(Debug, Clone, Deserialize)]
pub struct NgoAccount {
  pub ngo_id:        String,
  pub ngo_name:      String,
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
}

impl NgoAccount {
  pub fn actor(&self) -> NgoActor {
    NgoActor {
      ngo_id:   self.ngo_id.clone(),
      ngo_name: self.ngo_name.clone(),
    }
  }
}

/// The authenticated NGO behind a request.
pub struct Ngo(pub NgoActor);

/// Check the `Authorization` header against `accounts`.
pub fn verify_ngo(headers: &HeaderMap, accounts: &[NgoAccount]) -> Result<NgoActor, ApiError> {
  let encoded = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Basic "))
    .ok_or(ApiError::Unauthorized)?;

  let decoded = B64.decode(encoded).map_err(|_| ApiError::Unauthorized)?;
  let creds = std::str::from_utf8(&decoded).map_err(|_| ApiError::Unauthorized)?;
  let (username, password) = creds.split_once(':').ok_or(ApiError::Unauthorized)?;

  let account = accounts
    .iter()
    .find(|a| a.username == username)
    .ok_or(ApiError::Unauthorized)?;

  let parsed_hash =
    PasswordHash::new(&account.password_hash).map_err(|_| ApiError::Unauthorized)?;
  Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .map_err(|_| {
      debug!(%username, "rejected NGO credentials");
      ApiError::Unauthorized
    })?;

  Ok(account.actor())
}

impl<S> FromRequestParts<AppState<S>> for Ngo
where
  S: ReportStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    verify_ngo(&parts.headers, &state.accounts).map(Ngo)
  }
}

/// `Option<Ngo>`: `None` without an `Authorization` header. Credentials that
/// are present but wrong are still rejected.
impl<S> OptionalFromRequestParts<AppState<S>> for Ngo
where
  S: ReportStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Option<Self>, Self::Rejection> {
    if !parts.headers.contains_key(header::AUTHORIZATION) {
      return Ok(None);
    }
    verify_ngo(&parts.headers, &state.accounts).map(|actor| Some(Ngo(actor)))
  }
}
