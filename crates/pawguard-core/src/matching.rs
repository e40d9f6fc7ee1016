//! Similarity and distance helpers shared by the registry and the report desk.

use crate::animal::{AnimalIdentity, Coordinates};

/// How many recent records of a species the similarity search inspects.
pub const SIMILAR_SEARCH_LIMIT: usize = 20;

/// Mean Earth radius used by [`haversine_km`].
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Cosine score an embedding match must reach when the caller gives none.
pub const DEFAULT_MATCH_THRESHOLD: f32 = 0.85;

/// Embedding matches returned when the caller gives no limit.
pub const DEFAULT_MATCH_LIMIT: usize = 5;

/// Either string contains the other, ignoring case.
fn contains_either(a: &str, b: &str) -> bool {
  let a = a.to_lowercase();
  let b = b.to_lowercase();
  a.contains(&b) || b.contains(&a)
}

/// The similarity filter applied to each candidate record.
///
/// A record matches when its breed or its colour overlaps the query. When a
/// region is given the record's last-seen location must also contain it.
/// Empty query strings match every record.
pub fn is_similar(
  animal: &AnimalIdentity,
  breed: &str,
  color: &str,
  region: Option<&str>,
) -> bool {
  let breed_match = contains_either(&animal.breed, breed);
  let color_match = contains_either(&animal.color, color);
  if !(breed_match || color_match) {
    return false;
  }
  match region {
    Some(region) => animal
      .last_seen_location
      .to_lowercase()
      .contains(&region.to_lowercase()),
    None => true,
  }
}

/// Cosine similarity in `-1.0 ..= 1.0`. `None` when the vectors differ in
/// length, are empty, or either has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
  if a.is_empty() || a.len() != b.len() {
    return None;
  }
  let (mut dot, mut na, mut nb) = (0.0_f64, 0.0_f64, 0.0_f64);
  for (x, y) in a.iter().zip(b) {
    let (x, y) = (f64::from(*x), f64::from(*y));
    dot += x * y;
    na += x * x;
    nb += y * y;
  }
  if na == 0.0 || nb == 0.0 {
    return None;
  }
  Some((dot / (na.sqrt() * nb.sqrt())) as f32)
}

/// Great-circle distance between two points.
pub fn haversine_km(a: Coordinates, b: Coordinates) -> f64 {
  let d_lat = (b.lat - a.lat).to_radians();
  let d_lng = (b.lng - a.lng).to_radians();
  let h = (d_lat / 2.0).sin().powi(2)
    + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
  2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}
