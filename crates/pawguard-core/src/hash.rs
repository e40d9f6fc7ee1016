//! Feature hash, a cheap deduplication hint over species, breed and colour.
//!
//! Not cryptographic and not perceptual: two differently-worded descriptions
//! of the same animal hash differently.

use crate::animal::Species;

/// `h = h * 31 + unit` over the UTF-16 code units of the lowercased
/// `"{species}-{breed}-{color}"`, in wrapping 32-bit signed arithmetic.
/// Rendered as the lowercase hex of the absolute value.
pub fn feature_hash(species: Species, breed: &str, color: &str) -> String {
  let features = format!("{species}-{breed}-{color}").to_lowercase();
  let mut hash: i32 = 0;
  for unit in features.encode_utf16() {
    hash = hash.wrapping_mul(31).wrapping_add(i32::from(unit));
  }
  format!("{:x}", i64::from(hash).abs())
}
