//! Self-hosted YOLO detection backend.
//!
//! `GET /health` is checked until it first succeeds; `POST /detect` takes
//! `{"image": <base64>}`. The detector only knows dogs and cats, so breed and
//! colour come back as placeholders.

use std::{
  sync::atomic::{AtomicBool, Ordering},
  time::Duration,
};

use base64::{Engine as _, engine::general_purpose::STANDARD};
use futures::future::BoxFuture;
use pawguard_core::{
  animal::Species,
  identification::{Detection, Identification, IdentificationSource},
};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::{
  IdentifyError,
  fallback::{Classification, LocalClassifier},
};

/// Breed and colour of every detector result.
const PLACEHOLDER: &str = "Unknown";

#[derive(Debug, Deserialize)]
pub struct DetectResponse {
  pub success:           bool,
  #[serde(default)]
  pub detections:        Vec<Detection>,
  #[serde(default)]
  pub dog_detected:      bool,
  #[serde(default)]
  pub cat_detected:      bool,
  #[serde(default)]
  pub primary_detection: Option<Detection>,
  #[serde(default)]
  pub embedding:         Option<Vec<f32>>,
  #[serde(default)]
  pub error:             Option<String>,
}

impl DetectResponse {
  /// Normalise a detector reply.
  pub fn into_identification(self) -> Result<Identification, IdentifyError> {
    if !self.success {
      return Err(IdentifyError::Detection(
        self.error.unwrap_or_else(|| "Detection failed".to_owned()),
      ));
    }

    let species = match &self.primary_detection {
      Some(primary) => Species::from_loose(&primary.class_name),
      None if self.dog_detected => Species::Dog,
      None if self.cat_detected => Species::Cat,
      None => Species::Unknown,
    };
    if !species.is_known() {
      return Err(IdentifyError::NoAnimal);
    }
    let confidence = self
      .primary_detection
      .as_ref()
      .map_or(0.0, |p| p.confidence);

    Ok(Identification {
      species,
      breed: PLACEHOLDER.to_owned(),
      color: PLACEHOLDER.to_owned(),
      distinctive_features: Vec::new(),
      confidence,
      is_emergency: false,
      health_notes: None,
      source: IdentificationSource::Yolo {
        detections: self.detections,
        embedding:  self.embedding,
      },
    })
  }
}

pub struct YoloClient {
  client:  reqwest::Client,
  base:    String,
  healthy: AtomicBool,
}

impl YoloClient {
  pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, IdentifyError> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    Ok(Self {
      client,
      base: base_url.into().trim_end_matches('/').to_owned(),
      healthy: AtomicBool::new(false),
    })
  }

  /// Check `GET /health`. A failed check is not remembered.
  pub async fn check_health(&self) -> Result<(), IdentifyError> {
    let url = format!("{}/health", self.base);
    let resp = self.client.get(&url).send().await.map_err(|e| {
      warn!(error = %e, "yolo backend unreachable");
      IdentifyError::BackendUnavailable(format!("{url}: {e}"))
    })?;
    if !resp.status().is_success() {
      return Err(IdentifyError::BackendUnavailable(format!(
        "{url} returned {}",
        resp.status()
      )));
    }
    self.healthy.store(true, Ordering::Relaxed);
    Ok(())
  }

  /// The raw detector reply.
  pub async fn detect(&self, image: &[u8]) -> Result<DetectResponse, IdentifyError> {
    if !self.healthy.load(Ordering::Relaxed) {
      self.check_health().await?;
    }

    let resp = self
      .client
      .post(format!("{}/detect", self.base))
      .json(&json!({ "image": STANDARD.encode(image) }))
      .send()
      .await?;
    let status = resp.status();
    if !status.is_success() {
      let body = resp.text().await.unwrap_or_default();
      return Err(IdentifyError::Server {
        status: status.as_u16(),
        body,
      });
    }
    Ok(resp.json().await?)
  }

  pub async fn identify(&self, image: &[u8]) -> Result<Identification, IdentifyError> {
    let identification = self.detect(image).await?.into_identification()?;
    info!(
      species = %identification.species,
      confidence = identification.confidence,
      "yolo identified animal"
    );
    Ok(identification)
  }
}

/// The detector doubles as the local classifier behind the cloud backend.
impl LocalClassifier for YoloClient {
  fn classify<'a>(
    &'a self,
    image: &'a [u8],
  ) -> BoxFuture<'a, Result<Vec<Classification>, IdentifyError>> {
    Box::pin(async move {
      let resp = self.detect(image).await?;
      if !resp.success {
        return Err(IdentifyError::Detection(
          resp.error.unwrap_or_else(|| "Detection failed".to_owned()),
        ));
      }
      Ok(
        resp
          .detections
          .into_iter()
          .map(|d| Classification {
            label:      d.class_name,
            confidence: d.confidence,
          })
          .collect(),
      )
    })
  }
}
