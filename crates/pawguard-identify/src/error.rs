//! Error type for `pawguard-identify`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdentifyError {
  #[error("HTTP request failed: {0}")]
  Http(#[from] reqwest::Error),

  #[error("server returned {status}: {body}")]
  Server { status: u16, body: String },

  #[error("could not parse vision reply: {0}")]
  Parse(String),

  #[error("detection failed: {0}")]
  Detection(String),

  #[error("local classifier failed: {0}")]
  Classifier(String),

  #[error("no dog or cat found in the image")]
  NoAnimal,

  #[error("backend unavailable: {0}")]
  BackendUnavailable(String),

  #[error("cloud vision failed ({cloud}) and the local fallback failed too: {fallback}")]
  Fallback {
    cloud:    String,
    fallback: Box<IdentifyError>,
  },
}

/// Substrings that mark a rate-limit or quota reply, compared lowercase.
const QUOTA_MARKERS: [&str; 3] = ["429", "quota", "resource_exhausted"];

fn mentions_quota(text: &str) -> bool {
  let text = text.to_lowercase();
  QUOTA_MARKERS.iter().any(|m| text.contains(m))
}

impl IdentifyError {
  /// Whether the failure was a quota/rate limit or the network, the two
  /// cases in which the local fallback is tried.
  pub fn is_quota_or_network(&self) -> bool {
    match self {
      Self::Http(e) => {
        e.is_connect()
          || e.is_timeout()
          || e.status().is_some_and(|s| s.as_u16() == 429)
      }
      Self::Server { status, body } => *status == 429 || mentions_quota(body),
      Self::Detection(message) => mentions_quota(message),
      _ => false,
    }
  }
}
