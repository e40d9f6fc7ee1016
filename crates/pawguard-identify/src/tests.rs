//! Client tests against in-process fake vision servers.

use std::{
  sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
  },
  time::Duration,
};

use axum::{
  Json, Router,
  http::StatusCode,
  routing::{get, post},
};
use futures::future::BoxFuture;
use pawguard_core::{animal::Species, identification::IdentificationSource};
use serde_json::{Value, json};

use crate::{
  Backend, Identifier, IdentifyError,
  cloud::CloudVisionClient,
  fallback::{Classification, LocalClassifier},
  imagenet,
  yolo::YoloClient,
};

const TIMEOUT: Duration = Duration::from_secs(5);

/// Serve `router` on an ephemeral local port and return its base URL.
async fn serve(router: Router) -> String {
  let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  tokio::spawn(async move {
    axum::serve(listener, router).await.unwrap();
  });
  format!("http://{addr}")
}

/// A base URL nothing is listening on.
async fn dead_url() -> String {
  let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  drop(listener);
  format!("http://{addr}")
}

struct StubClassifier {
  calls:  AtomicUsize,
  output: Vec<Classification>,
}

impl StubClassifier {
  fn new() -> Arc<Self> {
    Self::returning(vec![Classification {
      label:      "golden retriever".into(),
      confidence: 0.62,
    }])
  }

  fn returning(output: Vec<Classification>) -> Arc<Self> {
    Arc::new(Self {
      calls: AtomicUsize::new(0),
      output,
    })
  }
}

impl LocalClassifier for StubClassifier {
  fn classify<'a>(
    &'a self,
    _image: &'a [u8],
  ) -> BoxFuture<'a, Result<Vec<Classification>, IdentifyError>> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    let output = self.output.clone();
    Box::pin(async move { Ok(output) })
  }
}

fn cloud_router(status: StatusCode, reply: &'static str) -> Router {
  Router::new().route(
    "/analyze",
    post(move |Json(body): Json<Value>| async move {
      assert!(body["imageBase64"].is_string());
      assert_eq!(body["mimeType"], "image/jpeg");
      (status, reply)
    }),
  )
}

async fn cloud_identifier(base: &str, fallback: Option<Arc<StubClassifier>>) -> Identifier {
  let client = CloudVisionClient::new(format!("{base}/analyze"), TIMEOUT).unwrap();
  let identifier = Identifier::new(Backend::Cloud).with_cloud(client);
  match fallback {
    Some(f) => identifier.with_fallback(f),
    None => identifier,
  }
}

// ─── Cloud ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn cloud_reply_is_normalised() {
  let base = serve(cloud_router(
    StatusCode::OK,
    "```json\n{\"species\":\"cat\",\"breed\":\"Persian\",\"color\":\"white\",\
     \"distinctiveFeatures\":\"blue eyes\",\"healthStatus\":\"healthy\"}\n```",
  ))
  .await;
  let identifier = cloud_identifier(&base, None).await;

  let id = identifier.identify(b"jpeg", "image/jpeg", None).await.unwrap();
  assert_eq!(id.species, Species::Cat);
  assert_eq!(id.breed, "Persian");
  assert_eq!(id.distinctive_features, vec!["blue eyes"]);
  assert_eq!(id.confidence, 0.95);
  assert_eq!(id.source, IdentificationSource::CloudVision);
}

#[tokio::test]
async fn quota_error_uses_fallback() {
  let base = serve(cloud_router(
    StatusCode::TOO_MANY_REQUESTS,
    r#"{"error":"RESOURCE_EXHAUSTED"}"#,
  ))
  .await;
  let stub = StubClassifier::new();
  let identifier = cloud_identifier(&base, Some(stub.clone())).await;

  let id = identifier.identify(b"jpeg", "image/jpeg", None).await.unwrap();
  assert_eq!(id.species, Species::Dog);
  assert_eq!(id.confidence, 0.62);
  assert!(id.is_fallback());
  assert_eq!(stub.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn network_error_uses_fallback() {
  let base = dead_url().await;
  let stub = StubClassifier::new();
  let identifier = cloud_identifier(&base, Some(stub.clone())).await;

  let id = identifier.identify(b"jpeg", "image/jpeg", None).await.unwrap();
  assert!(id.is_fallback());
  assert_eq!(stub.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn imagenet_labels_through_the_fallback() {
  let labels = imagenet::parse_labels(
    "n04344873 studio couch, day bed\n\
     n02123045 tabby, tabby cat\n\
     n02123159 tiger cat\n\
     n02099601 golden retriever\n",
  );
  let scores = imagenet::probabilities(&[0.35, 0.30, 0.20, 0.15]);
  let top = imagenet::top_labels(&scores, &labels, imagenet::TOP_K);
  assert_eq!(top[0].label, "studio couch, day bed");

  let stub = StubClassifier::returning(top);
  let identifier = cloud_identifier(&dead_url().await, Some(stub.clone())).await;

  let id = identifier.identify(b"jpeg", "image/jpeg", None).await.unwrap();
  assert_eq!(id.species, Species::Cat);
  assert_eq!(id.confidence, 0.30);
  assert_eq!(id.source, IdentificationSource::LocalFallback {
    label: "tabby, tabby cat".into(),
  });
  assert_eq!(stub.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn other_errors_do_not_fall_back() {
  let base = serve(cloud_router(
    StatusCode::INTERNAL_SERVER_ERROR,
    r#"{"error":"Gemini analysis failed"}"#,
  ))
  .await;
  let stub = StubClassifier::new();
  let identifier = cloud_identifier(&base, Some(stub.clone())).await;

  let err = identifier.identify(b"jpeg", "image/jpeg", None).await.unwrap_err();
  assert!(matches!(err, IdentifyError::Server { status: 500, .. }));
  assert_eq!(stub.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn quota_error_without_fallback_is_returned() {
  let base = serve(cloud_router(StatusCode::TOO_MANY_REQUESTS, "quota exceeded")).await;
  let identifier = cloud_identifier(&base, None).await;

  let err = identifier.identify(b"jpeg", "image/jpeg", None).await.unwrap_err();
  assert!(err.is_quota_or_network());
}

// ─── YOLO ────────────────────────────────────────────────────────────────────

fn yolo_router(detect: Value, health_hits: Arc<AtomicUsize>) -> Router {
  Router::new()
    .route(
      "/health",
      get(move || async move {
        health_hits.fetch_add(1, Ordering::SeqCst);
        Json(json!({ "status": "ok", "model": "yolov8n" }))
      }),
    )
    .route(
      "/detect",
      post(move |Json(body): Json<Value>| {
        let detect = detect.clone();
        async move {
          assert!(body["image"].is_string());
          Json(detect)
        }
      }),
    )
}

#[tokio::test]
async fn yolo_detection_keeps_embedding() {
  let hits = Arc::new(AtomicUsize::new(0));
  let base = serve(yolo_router(
    json!({
      "success": true,
      "detections": [{"class_id": 15, "class_name": "cat", "confidence": 0.88,
                      "bbox": {"x": 0, "y": 0, "width": 64, "height": 64}}],
      "dog_detected": false,
      "cat_detected": true,
      "primary_detection": {"class_id": 15, "class_name": "cat", "confidence": 0.88,
                            "bbox": {"x": 0, "y": 0, "width": 64, "height": 64}},
      "embedding": [0.1, 0.2, 0.3]
    }),
    hits.clone(),
  ))
  .await;
  let yolo = Arc::new(YoloClient::new(&base, TIMEOUT).unwrap());
  let identifier = Identifier::new(Backend::Cloud).with_yolo(yolo);

  let id = identifier
    .identify(b"png", "image/png", Some(Backend::Yolo))
    .await
    .unwrap();
  assert_eq!(id.species, Species::Cat);
  assert_eq!(id.confidence, 0.88);
  assert_eq!(id.embedding(), Some(&[0.1_f32, 0.2, 0.3][..]));

  // Health is checked once, then remembered.
  identifier
    .identify(b"png", "image/png", Some(Backend::Yolo))
    .await
    .unwrap();
  assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn yolo_failure_is_returned() {
  let hits = Arc::new(AtomicUsize::new(0));
  let base = serve(yolo_router(
    json!({ "success": false, "error": "model not loaded" }),
    hits,
  ))
  .await;
  let identifier =
    Identifier::new(Backend::Yolo).with_yolo(Arc::new(YoloClient::new(&base, TIMEOUT).unwrap()));

  let err = identifier.identify(b"png", "image/png", None).await.unwrap_err();
  assert!(matches!(err, IdentifyError::Detection(m) if m == "model not loaded"));
}

#[tokio::test]
async fn yolo_unreachable_is_unavailable() {
  let base = dead_url().await;
  let identifier =
    Identifier::new(Backend::Yolo).with_yolo(Arc::new(YoloClient::new(&base, TIMEOUT).unwrap()));

  let err = identifier.identify(b"png", "image/png", None).await.unwrap_err();
  assert!(matches!(err, IdentifyError::BackendUnavailable(_)));
}

#[tokio::test]
async fn unconfigured_backend() {
  let identifier = Identifier::new(Backend::Cloud);
  let err = identifier.identify(b"x", "image/jpeg", None).await.unwrap_err();
  assert!(matches!(err, IdentifyError::BackendUnavailable(_)));
}

#[tokio::test]
async fn yolo_as_local_classifier() {
  let hits = Arc::new(AtomicUsize::new(0));
  let yolo_base = serve(yolo_router(
    json!({
      "success": true,
      "detections": [{"class_id": 16, "class_name": "dog", "confidence": 0.7,
                      "bbox": {"x": 0, "y": 0, "width": 1, "height": 1}}],
      "dog_detected": true,
      "cat_detected": false,
      "primary_detection": null
    }),
    hits,
  ))
  .await;
  let cloud_base = dead_url().await;

  let identifier = Identifier::new(Backend::Cloud)
    .with_cloud(CloudVisionClient::new(format!("{cloud_base}/analyze"), TIMEOUT).unwrap())
    .with_fallback(Arc::new(YoloClient::new(&yolo_base, TIMEOUT).unwrap()));

  let id = identifier.identify(b"x", "image/jpeg", None).await.unwrap();
  assert_eq!(id.species, Species::Dog);
  assert_eq!(id.source, IdentificationSource::LocalFallback {
    label: "dog".into(),
  });
}
