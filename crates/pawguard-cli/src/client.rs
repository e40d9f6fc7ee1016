//! Async HTTP client wrapping the PawGuard JSON API.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use pawguard_core::{
  animal::{AnimalIdentity, AnimalStatus, Species},
  desk::Sighting,
  identification::Identification,
  report::{AnimalReport, ReportStatus, RescueOutcome, StatusChange, WelfareFlag},
};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use tracing::debug;
use uuid::Uuid;

/// Connection settings for the PawGuard API.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
  pub base_url: String,
  pub username: String,
  pub password: String,
}

#[derive(Deserialize)]
struct ErrorBody {
  error: String,
}

#[derive(Deserialize)]
struct Updated {
  updated: usize,
}

/// Async HTTP client for the PawGuard JSON REST API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(60))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!("{}/api{}", self.config.base_url.trim_end_matches('/'), path)
  }

  fn request(&self, method: Method, path: &str) -> RequestBuilder {
    debug!(%method, path, "api request");
    let req = self.client.request(method, self.url(path));
    if self.config.username.is_empty() {
      req
    } else {
      req.basic_auth(&self.config.username, Some(&self.config.password))
    }
  }

  /// Turn a non-2xx reply into an error carrying the server's message.
  async fn check(resp: Response, what: &str) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
      return Ok(resp);
    }
    let message = resp
      .json::<ErrorBody>()
      .await
      .map(|b| b.error)
      .unwrap_or_default();
    Err(anyhow!("{what} → {status}: {message}"))
  }

  async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
    let what = format!("GET {path}");
    let resp = self
      .request(Method::GET, path)
      .query(query)
      .send()
      .await
      .with_context(|| format!("{what} failed"))?;
    Self::check(resp, &what)
      .await?
      .json()
      .await
      .with_context(|| format!("deserialising {path}"))
  }

  async fn send<T: DeserializeOwned, B: Serialize + ?Sized>(
    &self,
    method: Method,
    path: &str,
    body: &B,
  ) -> Result<T> {
    let what = format!("{method} {path}");
    let resp = self
      .request(method, path)
      .json(body)
      .send()
      .await
      .with_context(|| format!("{what} failed"))?;
    Self::check(resp, &what)
      .await?
      .json()
      .await
      .with_context(|| format!("deserialising {path}"))
  }

  // ── Identification / submission ───────────────────────────────────────────

  /// `POST /api/identify`
  pub async fn identify(
    &self,
    image_base64: &str,
    mime_type: &str,
    backend: Option<&str>,
  ) -> Result<Identification> {
    let body = json!({
      "image_base64": image_base64,
      "mime_type": mime_type,
      "backend": backend,
    });
    self.send(Method::POST, "/identify", &body).await
  }

  /// `POST /api/sightings`
  pub async fn submit_sighting(&self, body: &Value) -> Result<Sighting> {
    self.send(Method::POST, "/sightings", body).await
  }

  // ── Animals ───────────────────────────────────────────────────────────────

  /// `GET /api/animals`
  pub async fn list_animals(
    &self,
    status: Option<AnimalStatus>,
    region: Option<&str>,
    limit: Option<usize>,
  ) -> Result<Vec<AnimalIdentity>> {
    let mut query = Vec::new();
    if let Some(s) = status {
      query.push(("status", s.to_string()));
    }
    if let Some(r) = region {
      query.push(("region", r.to_owned()));
    }
    if let Some(l) = limit {
      query.push(("limit", l.to_string()));
    }
    self.get("/animals", &query).await
  }

  /// `GET /api/animals/{id}`
  pub async fn get_animal(&self, id: Uuid) -> Result<AnimalIdentity> {
    self.get(&format!("/animals/{id}"), &[]).await
  }

  /// `GET /api/animals/search`
  pub async fn search_animals(
    &self,
    species: Species,
    breed: &str,
    color: &str,
    region: Option<&str>,
  ) -> Result<Vec<AnimalIdentity>> {
    let mut query = vec![
      ("species", species.to_string()),
      ("breed", breed.to_owned()),
      ("color", color.to_owned()),
    ];
    if let Some(r) = region {
      query.push(("region", r.to_owned()));
    }
    self.get("/animals/search", &query).await
  }

  // ── Reports ───────────────────────────────────────────────────────────────

  /// `GET /api/reports`
  pub async fn list_reports(
    &self,
    status: Option<ReportStatus>,
    disaster_mode: Option<bool>,
    reporter_id: Option<&str>,
    limit: Option<usize>,
  ) -> Result<Vec<AnimalReport>> {
    let mut query = Vec::new();
    if let Some(s) = status {
      query.push(("status", s.to_string()));
    }
    if let Some(d) = disaster_mode {
      query.push(("disaster_mode", d.to_string()));
    }
    if let Some(r) = reporter_id {
      query.push(("reporter_id", r.to_owned()));
    }
    if let Some(l) = limit {
      query.push(("limit", l.to_string()));
    }
    self.get("/reports", &query).await
  }

  /// `GET /api/reports/{id}`
  pub async fn get_report(&self, id: Uuid) -> Result<AnimalReport> {
    self.get(&format!("/reports/{id}"), &[]).await
  }

  /// `GET /api/reports/{id}/history`
  pub async fn report_history(&self, id: Uuid) -> Result<Vec<StatusChange>> {
    self.get(&format!("/reports/{id}/history"), &[]).await
  }

  /// `POST /api/reports/{id}/status`
  pub async fn set_status(
    &self,
    id: Uuid,
    status: ReportStatus,
    notes: Option<&str>,
  ) -> Result<AnimalReport> {
    let body = json!({ "status": status, "notes": notes });
    self.send(Method::POST, &format!("/reports/{id}/status"), &body).await
  }

  /// `POST /api/reports/{id}/assign`
  pub async fn assign(&self, id: Uuid) -> Result<AnimalReport> {
    self
      .send(Method::POST, &format!("/reports/{id}/assign"), &json!({}))
      .await
  }

  /// `POST /api/reports/{id}/welfare`
  pub async fn set_welfare(
    &self,
    id: Uuid,
    flag: WelfareFlag,
    value: bool,
    notes: Option<&str>,
  ) -> Result<AnimalReport> {
    let body = json!({ "flag": flag, "value": value, "notes": notes });
    self.send(Method::POST, &format!("/reports/{id}/welfare"), &body).await
  }

  /// `POST /api/reports/{id}/outcome`
  pub async fn set_outcome(&self, id: Uuid, outcome: RescueOutcome) -> Result<AnimalReport> {
    let body = json!({ "outcome": outcome });
    self.send(Method::POST, &format!("/reports/{id}/outcome"), &body).await
  }

  /// `PUT /api/reports/{id}/notes`
  pub async fn set_notes(&self, id: Uuid, notes: &str) -> Result<AnimalReport> {
    let body = json!({ "notes": notes });
    self.send(Method::PUT, &format!("/reports/{id}/notes"), &body).await
  }

  // ── Zones ─────────────────────────────────────────────────────────────────

  /// `GET /api/reports/zone`
  pub async fn reports_in_zone(
    &self,
    lat: f64,
    lng: f64,
    radius_km: f64,
    disaster_only: bool,
  ) -> Result<Vec<AnimalReport>> {
    let query = [
      ("lat", lat.to_string()),
      ("lng", lng.to_string()),
      ("radius_km", radius_km.to_string()),
      ("disaster_only", disaster_only.to_string()),
    ];
    self.get("/reports/zone", &query).await
  }

  /// `POST /api/reports/zone/disaster-mode`; returns how many reports changed.
  pub async fn set_disaster_mode(
    &self,
    lat: f64,
    lng: f64,
    radius_km: f64,
    enabled: bool,
  ) -> Result<usize> {
    let body = json!({ "lat": lat, "lng": lng, "radius_km": radius_km, "enabled": enabled });
    let result: Updated = self
      .send(Method::POST, "/reports/zone/disaster-mode", &body)
      .await?;
    Ok(result.updated)
  }

  // ── Events ────────────────────────────────────────────────────────────────

  /// Follow `GET /api/reports/events`, calling `on_event` with the name and
  /// JSON payload of each event until the server closes the stream.
  pub async fn watch_events(&self, mut on_event: impl FnMut(&str, &str)) -> Result<()> {
    let resp = self
      .client
      .get(self.url("/reports/events"))
      .send()
      .await
      .context("GET /reports/events failed")?;
    let mut resp = Self::check(resp, "GET /reports/events").await?;

    let mut parser = SseParser::default();
    while let Some(chunk) = resp.chunk().await.context("reading event stream")? {
      for (name, data) in parser.push(&String::from_utf8_lossy(&chunk)) {
        on_event(&name, &data);
      }
    }
    Ok(())
  }
}

/// Incremental `text/event-stream` parser. Only `event:` and `data:` fields
/// are kept; comments (keep-alives) are dropped.
#[derive(Default)]
pub struct SseParser {
  buffer: String,
  event:  Option<String>,
  data:   Vec<String>,
}

impl SseParser {
  /// Feed a chunk and return every event it completed.
  pub fn push(&mut self, chunk: &str) -> Vec<(String, String)> {
    self.buffer.push_str(chunk);
    let mut done = Vec::new();

    while let Some(pos) = self.buffer.find('\n') {
      let line: String = self.buffer.drain(..=pos).collect();
      let line = line.trim_end_matches(['\n', '\r']);

      if line.is_empty() {
        if !self.data.is_empty() {
          let name = self.event.take().unwrap_or_else(|| "message".to_owned());
          done.push((name, self.data.join("\n")));
          self.data.clear();
        }
        self.event = None;
      } else if let Some(v) = line.strip_prefix("event:") {
        self.event = Some(v.trim_start().to_owned());
      } else if let Some(v) = line.strip_prefix("data:") {
        self.data.push(v.strip_prefix(' ').unwrap_or(v).to_owned());
      }
    }
    done
  }
}
