//! Local classification used when the cloud backend is over quota or
//! unreachable.
//!
//! A [`LocalClassifier`] returns generic labels (ImageNet-style "tabby",
//! "golden retriever", ...). The label is mapped to a species by keyword and
//! the result is tagged [`IdentificationSource::LocalFallback`] so callers
//! can tell it apart from a real analysis.

use futures::future::BoxFuture;
use pawguard_core::{
  animal::Species,
  identification::{DEFAULT_BREED, DEFAULT_COLOR, Identification, IdentificationSource},
};

use crate::IdentifyError;

const DOG_KEYWORDS: &[&str] = &[
  "dog",
  "puppy",
  "retriever",
  "terrier",
  "shepherd",
  "hound",
  "poodle",
  "bulldog",
  "labrador",
  "beagle",
  "husky",
  "spaniel",
  "pug",
  "collie",
  "chihuahua",
];

const CAT_KEYWORDS: &[&str] = &[
  "cat",
  "tabby",
  "siamese",
  "persian",
  "kitten",
  "tiger cat",
  "egyptian cat",
  "maine coon",
];

/// One label with its score.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
  pub label:      String,
  pub confidence: f32,
}

/// An image classifier that runs without the cloud backend.
pub trait LocalClassifier: Send + Sync {
  fn classify<'a>(
    &'a self,
    image: &'a [u8],
  ) -> BoxFuture<'a, Result<Vec<Classification>, IdentifyError>>;
}

/// Map a free-form classifier label to a species by keyword substring.
/// Dog keywords are checked first.
pub fn species_for_label(label: &str) -> Species {
  let label = label.to_lowercase();
  if DOG_KEYWORDS.iter().any(|k| label.contains(k)) {
    Species::Dog
  } else if CAT_KEYWORDS.iter().any(|k| label.contains(k)) {
    Species::Cat
  } else {
    Species::Unknown
  }
}

/// Build a fallback identification from classifier output.
///
/// The best-scoring label that names a dog or cat wins; failing that the
/// best label overall is kept with an unknown species. Confidence is the
/// classifier's own score.
pub fn identification_from(
  mut classifications: Vec<Classification>,
) -> Result<Identification, IdentifyError> {
  classifications.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

  let chosen = classifications
    .iter()
    .find(|c| species_for_label(&c.label).is_known())
    .or_else(|| classifications.first())
    .ok_or(IdentifyError::NoAnimal)?;

  Ok(Identification {
    species:              species_for_label(&chosen.label),
    breed:                DEFAULT_BREED.to_owned(),
    color:                DEFAULT_COLOR.to_owned(),
    distinctive_features: Vec::new(),
    confidence:           chosen.confidence.clamp(0.0, 1.0),
    is_emergency:         false,
    health_notes:         None,
    source:               IdentificationSource::LocalFallback {
      label: chosen.label.clone(),
    },
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn c(label: &str, confidence: f32) -> Classification {
    Classification {
      label: label.into(),
      confidence,
    }
  }

  #[test]
  fn keyword_mapping() {
    assert_eq!(species_for_label("Golden Retriever"), Species::Dog);
    assert_eq!(species_for_label("German shepherd"), Species::Dog);
    assert_eq!(species_for_label("tiger cat"), Species::Cat);
    assert_eq!(species_for_label("Egyptian Cat"), Species::Cat);
    assert_eq!(species_for_label("Maine Coon"), Species::Cat);
    assert_eq!(species_for_label("tabby"), Species::Cat);
    assert_eq!(species_for_label("sofa"), Species::Unknown);
  }

  #[test]
  fn best_animal_label_wins() {
    let id = identification_from(vec![
      c("sofa", 0.9),
      c("tabby", 0.6),
      c("Siamese", 0.7),
    ])
    .unwrap();
    assert_eq!(id.species, Species::Cat);
    assert_eq!(id.confidence, 0.7);
    assert!(id.is_fallback());
    assert_eq!(id.source, IdentificationSource::LocalFallback {
      label: "Siamese".into(),
    });
  }

  #[test]
  fn no_animal_label_keeps_best_guess() {
    let id = identification_from(vec![c("sofa", 0.4), c("lamp", 0.8)]).unwrap();
    assert_eq!(id.species, Species::Unknown);
    assert_eq!(id.confidence, 0.8);
  }

  #[test]
  fn empty_output() {
    assert!(matches!(
      identification_from(vec![]),
      Err(IdentifyError::NoAnimal)
    ));
  }
}
