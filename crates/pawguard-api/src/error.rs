//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use pawguard_identify::IdentifyError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("{0}")]
  BadRequest(String),

  /// A sighting guard refused the submission. The message is user-facing.
  #[error("{0}")]
  Submission(String),

  #[error("unauthorized")]
  Unauthorized,

  #[error("{0}")]
  Conflict(String),

  #[error("identification failed: {0}")]
  Identify(#[from] IdentifyError),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<pawguard_core::Error> for ApiError {
  fn from(err: pawguard_core::Error) -> Self {
    use pawguard_core::Error as E;
    match err {
      E::AnimalNotFound(_) | E::ReportNotFound(_) => Self::NotFound(err.to_string()),
      E::InvalidTransition(e) => Self::Conflict(e.to_string()),
      E::Submission(e) => Self::Submission(e.to_string()),
      other => Self::Store(Box::new(other)),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = match &self {
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::BadRequest(_) | ApiError::Submission(_) => StatusCode::UNPROCESSABLE_ENTITY,
      ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
      ApiError::Conflict(_) => StatusCode::CONFLICT,
      ApiError::Identify(IdentifyError::NoAnimal) => StatusCode::UNPROCESSABLE_ENTITY,
      ApiError::Identify(_) => StatusCode::BAD_GATEWAY,
      ApiError::Store(e) => {
        error!(error = %e, "store failure");
        StatusCode::INTERNAL_SERVER_ERROR
      }
    };

    let mut res = (status, Json(json!({ "error": self.to_string() }))).into_response();
    if matches!(self, ApiError::Unauthorized) {
      res.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"pawguard\""),
      );
    }
    res
  }
}

#[cfg(test)]
mod tests {
  use pawguard_core::{
    lifecycle::TransitionError, report::ReportStatus, submission::SubmissionError,
  };
  use uuid::Uuid;

  use super::*;

  #[test]
  fn core_errors_map_to_status_codes() {
    let cases: Vec<(pawguard_core::Error, StatusCode)> = vec![
      (pawguard_core::Error::ReportNotFound(Uuid::nil()), StatusCode::NOT_FOUND),
      (SubmissionError::MissingPhoto.into(), StatusCode::UNPROCESSABLE_ENTITY),
      (
        TransitionError {
          from: ReportStatus::Resolved,
          to:   ReportStatus::New,
        }
        .into(),
        StatusCode::CONFLICT,
      ),
      (pawguard_core::Error::SystemIdExhausted(8), StatusCode::INTERNAL_SERVER_ERROR),
    ];
    for (err, status) in cases {
      assert_eq!(ApiError::from(err).into_response().status(), status);
    }
  }

  #[test]
  fn unauthorized_carries_challenge() {
    let res = ApiError::Unauthorized.into_response();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert!(res.headers().contains_key(header::WWW_AUTHENTICATE));
  }

  #[test]
  fn vision_failures_are_bad_gateway() {
    let err = ApiError::from(IdentifyError::BackendUnavailable("down".into()));
    assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    let err = ApiError::from(IdentifyError::NoAnimal);
    assert_eq!(err.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
  }
}
