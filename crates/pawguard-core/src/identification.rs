//! The normalised result of running an image through a vision backend.
//!
//! Every backend builds the same [`Identification`]; what is specific to a
//! backend lives in the tagged [`IdentificationSource`].

use serde::{Deserialize, Serialize};

use crate::{animal::Species, hash::feature_hash};

/// Breed reported when a backend cannot tell.
pub const DEFAULT_BREED: &str = "Mixed";
/// Colour reported when a backend cannot tell.
pub const DEFAULT_COLOR: &str = "Unknown";

/// An axis-aligned box in pixel coordinates of the submitted image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
  pub x:      f32,
  pub y:      f32,
  pub width:  f32,
  pub height: f32,
}

/// One object found by a detection backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
  pub class_id:   u32,
  pub class_name: String,
  pub confidence: f32,
  pub bbox:       BoundingBox,
}

/// Which backend produced a result, plus anything only that backend knows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum IdentificationSource {
  /// Prompted cloud vision model.
  CloudVision,
  /// Bounding-box detector. Breed and colour are placeholders.
  Yolo {
    detections: Vec<Detection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    embedding:  Option<Vec<f32>>,
  },
  /// Generic classifier used when the cloud backend was unreachable.
  LocalFallback {
    /// The raw classifier label the species was inferred from.
    label: String,
  },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identification {
  pub species:              Species,
  pub breed:                String,
  pub color:                String,
  #[serde(default)]
  pub distinctive_features: Vec<String>,
  /// 0.0 ..= 1.0
  pub confidence:           f32,
  #[serde(default)]
  pub is_emergency:         bool,
  #[serde(default)]
  pub health_notes:         Option<String>,
  pub source:               IdentificationSource,
}

impl Identification {
  /// Embedding vector, when the backend returned one.
  pub fn embedding(&self) -> Option<&[f32]> {
    match &self.source {
      IdentificationSource::Yolo {
        embedding: Some(e), ..
      } => Some(e.as_slice()),
      _ => None,
    }
  }

  pub fn feature_hash(&self) -> String {
    feature_hash(self.species, &self.breed, &self.color)
  }

  pub fn is_fallback(&self) -> bool {
    matches!(self.source, IdentificationSource::LocalFallback { .. })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn source_is_tagged_by_backend() {
    let id = Identification {
      species:              Species::Cat,
      breed:                DEFAULT_BREED.into(),
      color:                DEFAULT_COLOR.into(),
      distinctive_features: vec![],
      confidence:           0.4,
      is_emergency:         false,
      health_notes:         None,
      source:               IdentificationSource::LocalFallback {
        label: "tabby".into(),
      },
    };
    let json = serde_json::to_value(&id).unwrap();
    assert_eq!(json["source"]["backend"], "local_fallback");
    assert_eq!(json["source"]["label"], "tabby");
    assert_eq!(json["species"], "cat");
    assert!(id.is_fallback());
    assert!(id.embedding().is_none());
  }

  #[test]
  fn yolo_embedding_is_exposed() {
    let id = Identification {
      species:              Species::Dog,
      breed:                "Unknown".into(),
      color:                DEFAULT_COLOR.into(),
      distinctive_features: vec![],
      confidence:           0.9,
      is_emergency:         false,
      health_notes:         None,
      source:               IdentificationSource::Yolo {
        detections: vec![],
        embedding:  Some(vec![0.1, 0.2]),
      },
    };
    assert_eq!(id.embedding(), Some(&[0.1_f32, 0.2][..]));
  }
}
