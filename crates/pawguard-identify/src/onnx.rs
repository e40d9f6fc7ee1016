//! In-process [`LocalClassifier`] backed by ONNX Runtime.
//!
//! Loads an ImageNet classifier (ResNet, MobileNet, EfficientNet, ...) from a
//! directory containing `model.onnx` and `labels.txt`. Inference runs on the
//! blocking pool so it never stalls the async runtime.

use std::{
  path::Path,
  sync::{Arc, Mutex},
};

use futures::{FutureExt as _, future::BoxFuture};
use image::imageops::FilterType;
use ort::{session::Session, value::Tensor};
use tracing::{debug, info};

use crate::{
  IdentifyError,
  fallback::{Classification, LocalClassifier},
  imagenet::{INPUT_SIZE, TOP_K, nchw_from_rgb, parse_labels, probabilities, top_labels},
};

fn classifier_error(e: impl std::fmt::Display) -> IdentifyError {
  IdentifyError::Classifier(e.to_string())
}

/// An ONNX image classifier. Cheap to clone; clones share one session.
#[derive(Clone)]
pub struct OnnxClassifier {
  session: Arc<Mutex<Session>>,
  labels:  Arc<Vec<String>>,
}

impl OnnxClassifier {
  /// Load `model.onnx` and `labels.txt` from `model_dir`.
  pub fn load(model_dir: &Path) -> Result<Self, IdentifyError> {
    let model_path = model_dir.join("model.onnx");
    let labels_path = model_dir.join("labels.txt");

    let labels = std::fs::read_to_string(&labels_path)
      .map_err(|e| classifier_error(format!("{}: {e}", labels_path.display())))?;
    let labels = parse_labels(&labels);
    if labels.is_empty() {
      return Err(classifier_error(format!("{} has no labels", labels_path.display())));
    }

    let session = Session::builder()
      .map_err(classifier_error)?
      .commit_from_file(&model_path)
      .map_err(|e| classifier_error(format!("{}: {e}", model_path.display())))?;

    info!(labels = labels.len(), model = %model_path.display(), "loaded local classifier");
    Ok(Self {
      session: Arc::new(Mutex::new(session)),
      labels:  Arc::new(labels),
    })
  }

  fn run(&self, image: &[u8]) -> Result<Vec<Classification>, IdentifyError> {
    let rgb = image::load_from_memory(image)
      .map_err(classifier_error)?
      .resize_exact(INPUT_SIZE, INPUT_SIZE, FilterType::Triangle)
      .to_rgb8();
    let side = i64::from(INPUT_SIZE);
    let input = Tensor::from_array((
      [1, 3, side, side],
      nchw_from_rgb(rgb.as_raw()).into_boxed_slice(),
    ))
    .map_err(classifier_error)?;

    let mut session = self
      .session
      .lock()
      .map_err(|_| classifier_error("session lock poisoned"))?;
    let outputs = session.run(ort::inputs![input]).map_err(classifier_error)?;
    let (_, scores) = outputs[0]
      .try_extract_tensor::<f32>()
      .map_err(classifier_error)?;

    let top = top_labels(&probabilities(scores), &self.labels, TOP_K);
    debug!(best = ?top.first(), "local classification");
    Ok(top)
  }
}

impl LocalClassifier for OnnxClassifier {
  fn classify<'a>(
    &'a self,
    image: &'a [u8],
  ) -> BoxFuture<'a, Result<Vec<Classification>, IdentifyError>> {
    let this = self.clone();
    let image = image.to_vec();
    async move {
      tokio::task::spawn_blocking(move || this.run(&image))
        .await
        .map_err(classifier_error)?
    }
    .boxed()
  }
}
