//! The animal registry service.
//!
//! Wraps an [`AnimalStore`] with the rules the store itself does not know
//! about: system-ID allocation, feature hashing, the species default and the
//! similarity search.

use std::sync::Arc;

use chrono::{Datelike, Utc};
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
  Error, Result,
  animal::{
    AnimalIdentity, AnimalStatus, AnimalUpdate, CareEntryInput, NewAnimal, ReportEntryInput,
    Reporter, Species,
  },
  ids::{SYSTEM_ID_ATTEMPTS, generate_system_id},
  identification::Identification,
  matching::{SIMILAR_SEARCH_LIMIT, cosine_similarity, is_similar},
  store::{AnimalQuery, AnimalStore},
};

/// A stored record scored against a query embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingMatch {
  pub animal: AnimalIdentity,
  pub score:  f32,
}

pub struct Registry<S> {
  store: Arc<S>,
}

impl<S> Clone for Registry<S> {
  fn clone(&self) -> Self {
    Self {
      store: Arc::clone(&self.store),
    }
  }
}

impl<S: AnimalStore> Registry<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  pub fn store(&self) -> &Arc<S> { &self.store }

  /// Register a new animal from an identification result.
  ///
  /// An `unknown` species is stored as `dog`; the feature hash is computed
  /// from the species as identified.
  pub async fn create_animal_identity(
    &self,
    result: &Identification,
    image_url: &str,
    reporter: &Reporter,
    location: &str,
  ) -> Result<AnimalIdentity> {
    self
      .create_animal_identity_with_rng(result, image_url, reporter, location, &mut OsRng)
      .await
  }

  /// As [`Self::create_animal_identity`], drawing system IDs from `rng`.
  pub async fn create_animal_identity_with_rng<R: RngCore + Send>(
    &self,
    result: &Identification,
    image_url: &str,
    reporter: &Reporter,
    location: &str,
    rng: &mut R,
  ) -> Result<AnimalIdentity> {
    let now = Utc::now();
    let feature_hash = result.feature_hash();

    for attempt in 1..=SYSTEM_ID_ATTEMPTS {
      let system_id = generate_system_id(now.year(), rng);
      let input = NewAnimal {
        system_id:            system_id.clone(),
        species:              result.species.registry_species(),
        breed:                result.breed.clone(),
        color:                result.color.clone(),
        distinctive_features: result.distinctive_features.clone(),
        feature_hash:         feature_hash.clone(),
        primary_image_url:    image_url.to_owned(),
        reported_at:          now,
        reporter:             reporter.clone(),
        location:             location.to_owned(),
        embedding:            result.embedding().map(<[f32]>::to_vec),
      };

      match self.store.insert_animal(input).await.map_err(Error::store)? {
        Some(animal) => {
          info!(
            system_id = %animal.system_id,
            species = %animal.species,
            id = %animal.id,
            "registered animal"
          );
          return Ok(animal);
        }
        None => warn!(%system_id, attempt, "system id collision, retrying"),
      }
    }

    Err(Error::SystemIdExhausted(SYSTEM_ID_ATTEMPTS))
  }

  pub async fn get_animal_by_id(&self, id: Uuid) -> Result<AnimalIdentity> {
    self
      .store
      .get_animal(id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::AnimalNotFound(id))
  }

  /// Recent records of `species` whose breed or colour overlaps the query,
  /// optionally restricted to a region. Most recently seen first.
  pub async fn search_similar_animals(
    &self,
    species: Species,
    breed: &str,
    color: &str,
    region: Option<&str>,
  ) -> Result<Vec<AnimalIdentity>> {
    let query = AnimalQuery {
      species: Some(species),
      limit: Some(SIMILAR_SEARCH_LIMIT),
      ..Default::default()
    };
    let candidates = self.store.list_animals(&query).await.map_err(Error::store)?;
    Ok(
      candidates
        .into_iter()
        .filter(|a| is_similar(a, breed, color, region))
        .collect(),
    )
  }

  /// Records of `species` whose stored embedding scores at least `threshold`
  /// against `embedding`, best first.
  pub async fn match_by_embedding(
    &self,
    species: Species,
    embedding: &[f32],
    threshold: f32,
    limit: usize,
  ) -> Result<Vec<EmbeddingMatch>> {
    let stored = self
      .store
      .animal_embeddings(species)
      .await
      .map_err(Error::store)?;

    let mut scored: Vec<(Uuid, f32)> = stored
      .into_iter()
      .filter_map(|(id, v)| cosine_similarity(embedding, &v).map(|s| (id, s)))
      .filter(|(_, s)| *s >= threshold)
      .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(limit);

    let mut matches = Vec::with_capacity(scored.len());
    for (id, score) in scored {
      if let Some(animal) = self.store.get_animal(id).await.map_err(Error::store)? {
        matches.push(EmbeddingMatch { animal, score });
      }
    }
    Ok(matches)
  }

  pub async fn update_animal_status(
    &self,
    id: Uuid,
    update: AnimalUpdate,
  ) -> Result<AnimalIdentity> {
    let status = update.status;
    let animal = self
      .store
      .update_animal(id, update)
      .await
      .map_err(Error::store)?
      .ok_or(Error::AnimalNotFound(id))?;
    if let Some(status) = status {
      info!(system_id = %animal.system_id, %status, "animal status updated");
    }
    Ok(animal)
  }

  pub async fn add_care_entry(&self, id: Uuid, entry: CareEntryInput) -> Result<AnimalIdentity> {
    self
      .store
      .append_care_entry(id, entry)
      .await
      .map_err(Error::store)?
      .ok_or(Error::AnimalNotFound(id))
  }

  pub async fn add_report_to_animal(
    &self,
    id: Uuid,
    entry: ReportEntryInput,
  ) -> Result<AnimalIdentity> {
    self
      .store
      .append_report_entry(id, entry)
      .await
      .map_err(Error::store)?
      .ok_or(Error::AnimalNotFound(id))
  }

  pub async fn list_animals(
    &self,
    status: Option<AnimalStatus>,
    limit: Option<usize>,
  ) -> Result<Vec<AnimalIdentity>> {
    self.find_animals(AnimalQuery {
      status,
      limit,
      ..Default::default()
    })
    .await
  }

  pub async fn animals_by_user(&self, user_id: &str) -> Result<Vec<AnimalIdentity>> {
    self.find_animals(AnimalQuery {
      created_by: Some(user_id.to_owned()),
      ..Default::default()
    })
    .await
  }

  pub async fn animals_by_region(&self, region: &str) -> Result<Vec<AnimalIdentity>> {
    self.find_animals(AnimalQuery {
      region: Some(region.to_owned()),
      ..Default::default()
    })
    .await
  }

  /// Records matching every filter set on `query`, most recently seen first.
  pub async fn find_animals(&self, query: AnimalQuery) -> Result<Vec<AnimalIdentity>> {
    self.store.list_animals(&query).await.map_err(Error::store)
  }
}
