//! Citizen sighting submissions and the guards that run before anything is
//! written.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{
  animal::{Reporter, SightingLocation},
  identification::Identification,
  report::WeatherSnapshot,
};

/// Why a submission was refused. The messages are shown to the reporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubmissionError {
  #[error("Please add a photo of the animal")]
  MissingPhoto,

  #[error("Please run AI analysis before submitting")]
  MissingAnalysis,

  #[error("Please add the location where you saw the animal")]
  MissingLocation,
}

/// Everything a reporter sends when filing a sighting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SightingSubmission {
  /// URL of the already-stored photo. Empty when no photo was attached.
  #[serde(default)]
  pub photo_url:       String,
  #[serde(default)]
  pub identification:  Option<Identification>,
  pub reporter:        Reporter,
  #[serde(default)]
  pub reporter_phone:  Option<String>,
  pub location:        SightingLocation,
  #[serde(default)]
  pub notes:           Option<String>,
  #[serde(default)]
  pub condition:       Option<String>,
  /// Attach the sighting to this registry record instead of creating one.
  #[serde(default)]
  pub match_animal_id: Option<Uuid>,
  #[serde(default)]
  pub weather:         WeatherSnapshot,
}

impl SightingSubmission {
  /// Run the guards in order and hand back the identification on success.
  pub fn validate(&self) -> Result<&Identification, SubmissionError> {
    if self.photo_url.trim().is_empty() {
      return Err(SubmissionError::MissingPhoto);
    }
    self.validate_details()
  }

  /// The guards that do not look at the photo, so callers holding an inline
  /// image can run them before storing it.
  pub fn validate_details(&self) -> Result<&Identification, SubmissionError> {
    let identification = self
      .identification
      .as_ref()
      .ok_or(SubmissionError::MissingAnalysis)?;
    if self.location.address.trim().is_empty() {
      return Err(SubmissionError::MissingLocation);
    }
    Ok(identification)
  }
}
