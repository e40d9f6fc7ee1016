//! Cloud vision backend.
//!
//! The function is prompted to answer in JSON but frequently wraps the
//! object in markdown fences or prose, so the reply is treated as text and
//! the outermost `{ … }` is parsed.

use std::time::Duration;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use pawguard_core::{
  animal::Species,
  identification::{DEFAULT_BREED, DEFAULT_COLOR, Identification, IdentificationSource},
};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::IdentifyError;

/// Confidence reported when the model gives none.
pub const DEFAULT_CONFIDENCE: f32 = 0.95;

pub struct CloudVisionClient {
  client: reqwest::Client,
  url:    String,
}

impl CloudVisionClient {
  pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, IdentifyError> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    Ok(Self {
      client,
      url: url.into(),
    })
  }

  /// One request, no retries.
  pub async fn identify(
    &self,
    image: &[u8],
    mime_type: &str,
  ) -> Result<Identification, IdentifyError> {
    let body = json!({
      "imageBase64": STANDARD.encode(image),
      "mimeType": mime_type,
    });

    debug!(url = %self.url, bytes = image.len(), "sending image to cloud vision");
    let resp = self.client.post(&self.url).json(&body).send().await?;
    let status = resp.status();
    let text = resp.text().await?;
    if !status.is_success() {
      return Err(IdentifyError::Server {
        status: status.as_u16(),
        body:   text,
      });
    }

    debug!(reply = %text, "cloud vision reply");
    let identification = parse_reply(&text)?;
    info!(
      species = %identification.species,
      breed = %identification.breed,
      confidence = identification.confidence,
      "cloud vision identified animal"
    );
    Ok(identification)
  }
}

// ─── Reply parsing ───────────────────────────────────────────────────────────

/// Strip markdown code fences and return the outermost `{ … }` span.
pub fn extract_json(text: &str) -> Option<String> {
  let cleaned = text.replace("```json", "").replace("```", "");
  let start = cleaned.find('{')?;
  let end = cleaned.rfind('}')?;
  (start < end).then(|| cleaned[start..=end].to_owned())
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Features {
  One(String),
  Many(Vec<String>),
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CloudReply {
  #[serde(default, alias = "animalType", alias = "animal_type")]
  species:              Option<String>,
  #[serde(default)]
  breed:                Option<String>,
  #[serde(default)]
  color:                Option<String>,
  #[serde(default)]
  distinctive_features: Option<Features>,
  #[serde(default, alias = "healthNotes")]
  health_status:        Option<String>,
  #[serde(default)]
  is_emergency:         Option<bool>,
  #[serde(default)]
  confidence:           Option<f32>,
}

fn non_empty(s: Option<String>) -> Option<String> {
  s.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty())
}

/// Parse a cloud vision reply, applying the field defaults.
pub fn parse_reply(text: &str) -> Result<Identification, IdentifyError> {
  let json = extract_json(text)
    .ok_or_else(|| IdentifyError::Parse("no JSON object in reply".into()))?;
  let reply: CloudReply =
    serde_json::from_str(&json).map_err(|e| IdentifyError::Parse(e.to_string()))?;

  let distinctive_features = match reply.distinctive_features {
    Some(Features::Many(list)) => list
      .into_iter()
      .map(|f| f.trim().to_owned())
      .filter(|f| !f.is_empty())
      .collect(),
    Some(Features::One(one)) => non_empty(Some(one)).into_iter().collect(),
    None => Vec::new(),
  };

  Ok(Identification {
    species: reply
      .species
      .as_deref()
      .map_or(Species::Unknown, Species::from_loose),
    breed: non_empty(reply.breed).unwrap_or_else(|| DEFAULT_BREED.to_owned()),
    color: non_empty(reply.color).unwrap_or_else(|| DEFAULT_COLOR.to_owned()),
    distinctive_features,
    confidence: reply.confidence.unwrap_or(DEFAULT_CONFIDENCE).clamp(0.0, 1.0),
    is_emergency: reply.is_emergency.unwrap_or(false),
    health_notes: non_empty(reply.health_status),
    source: IdentificationSource::CloudVision,
  })
}
