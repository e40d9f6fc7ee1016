//! Pre- and post-processing for ImageNet-style classifiers: a 224x224 RGB
//! input normalised per channel, and one score per class label out.

use crate::fallback::Classification;

/// Side of the square input image.
pub const INPUT_SIZE: u32 = 224;

const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Labels kept per image.
pub const TOP_K: usize = 5;

/// Interleaved RGB bytes to a normalised `[3, height, width]` planar buffer.
pub fn nchw_from_rgb(rgb: &[u8]) -> Vec<f32> {
  let pixels = rgb.len() / 3;
  let mut out = vec![0.0; pixels * 3];
  for (i, px) in rgb.chunks_exact(3).enumerate() {
    for c in 0..3 {
      out[c * pixels + i] = (f32::from(px[c]) / 255.0 - MEAN[c]) / STD[c];
    }
  }
  out
}

/// Turn raw model output into probabilities. Output that already sums to one
/// is passed through.
pub fn probabilities(scores: &[f32]) -> Vec<f32> {
  let sum: f32 = scores.iter().sum();
  if scores.iter().all(|s| (0.0..=1.0).contains(s)) && (sum - 1.0).abs() < 1e-3 {
    return scores.to_vec();
  }
  let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
  let exp: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
  let total: f32 = exp.iter().sum();
  exp.into_iter().map(|e| e / total).collect()
}

/// The `k` best-scoring labels, best first. Scores without a label are
/// skipped.
pub fn top_labels(scores: &[f32], labels: &[String], k: usize) -> Vec<Classification> {
  let mut ranked: Vec<(usize, f32)> = scores.iter().copied().enumerate().collect();
  ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
  ranked
    .into_iter()
    .filter_map(|(i, confidence)| {
      labels.get(i).map(|label| Classification {
        label: label.clone(),
        confidence,
      })
    })
    .take(k)
    .collect()
}

/// Parse a labels file with one class per line. A leading WordNet synset id
/// (`n01440764 tench, Tinca tinca`) is dropped.
pub fn parse_labels(text: &str) -> Vec<String> {
  text
    .lines()
    .map(str::trim)
    .filter(|l| !l.is_empty())
    .map(|line| match line.split_once(' ') {
      Some((id, rest)) if is_synset(id) => rest.trim().to_owned(),
      _ => line.to_owned(),
    })
    .collect()
}

fn is_synset(token: &str) -> bool {
  token.len() == 9
    && token.starts_with('n')
    && token[1..].bytes().all(|b| b.is_ascii_digit())
}
