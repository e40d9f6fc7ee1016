//! [`Identifier`]: backend selection and the cloud fallback policy.

use std::{sync::Arc, time::Duration};

use pawguard_core::identification::Identification;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::{info, warn};

use crate::{
  IdentifyError,
  cloud::CloudVisionClient,
  fallback::{LocalClassifier, identification_from},
  yolo::YoloClient,
};

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Backend {
  #[default]
  Cloud,
  Yolo,
}

/// Default request timeout for both vision backends.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Routes identification requests to the configured backends.
///
/// The cloud path falls back to the local classifier when, and only when,
/// the failure is a quota limit or a network error. The YOLO path never
/// falls back.
#[derive(Default)]
pub struct Identifier {
  default_backend: Backend,
  cloud:           Option<CloudVisionClient>,
  yolo:            Option<Arc<YoloClient>>,
  fallback:        Option<Arc<dyn LocalClassifier>>,
}

impl Identifier {
  pub fn new(default_backend: Backend) -> Self {
    Self {
      default_backend,
      ..Default::default()
    }
  }

  pub fn with_cloud(mut self, client: CloudVisionClient) -> Self {
    self.cloud = Some(client);
    self
  }

  pub fn with_yolo(mut self, client: Arc<YoloClient>) -> Self {
    self.yolo = Some(client);
    self
  }

  pub fn with_fallback(mut self, classifier: Arc<dyn LocalClassifier>) -> Self {
    self.fallback = Some(classifier);
    self
  }

  /// Identify the animal in `image` with `backend`, or the default backend.
  pub async fn identify(
    &self,
    image: &[u8],
    mime_type: &str,
    backend: Option<Backend>,
  ) -> Result<Identification, IdentifyError> {
    match backend.unwrap_or(self.default_backend) {
      Backend::Cloud => self.identify_cloud(image, mime_type).await,
      Backend::Yolo => {
        let yolo = self.yolo.as_ref().ok_or_else(|| {
          IdentifyError::BackendUnavailable("yolo backend is not configured".into())
        })?;
        yolo.identify(image).await
      }
    }
  }

  async fn identify_cloud(
    &self,
    image: &[u8],
    mime_type: &str,
  ) -> Result<Identification, IdentifyError> {
    let cloud = self.cloud.as_ref().ok_or_else(|| {
      IdentifyError::BackendUnavailable("cloud vision is not configured".into())
    })?;

    let err = match cloud.identify(image, mime_type).await {
      Ok(identification) => return Ok(identification),
      Err(e) => e,
    };
    let Some(fallback) = self.fallback.as_ref().filter(|_| err.is_quota_or_network()) else {
      return Err(err);
    };

    warn!(error = %err, "cloud vision unavailable, using local classifier");
    let result = fallback
      .classify(image)
      .await
      .and_then(identification_from)
      .map_err(|fe| IdentifyError::Fallback {
        cloud:    err.to_string(),
        fallback: Box::new(fe),
      })?;
    info!(
      species = %result.species,
      confidence = result.confidence,
      "local fallback identified animal"
    );
    Ok(result)
  }
}
