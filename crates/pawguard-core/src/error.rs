//! Error types for `pawguard-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::{lifecycle::TransitionError, submission::SubmissionError};

#[derive(Debug, Error)]
pub enum Error {
  #[error("animal not found: {0}")]
  AnimalNotFound(Uuid),

  #[error("report not found: {0}")]
  ReportNotFound(Uuid),

  #[error(transparent)]
  InvalidTransition(#[from] TransitionError),

  #[error(transparent)]
  Submission(#[from] SubmissionError),

  #[error("could not allocate a free system id after {0} attempts")]
  SystemIdExhausted(usize),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Box a backend error into [`Error::Store`].
  pub fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(err))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
