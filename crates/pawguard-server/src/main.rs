//! pawguard-server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), opens the SQLite
//! store, wires the vision backends, and serves the JSON API under `/api`.
//!
//! # Password hash generation
//!
//! To generate the argon2 PHC string for an NGO account's `password_hash`:
//!
//! ```
//! cargo run -p pawguard-server -- --hash-password
//! ```

mod settings;

use std::{path::Path, sync::Arc, time::Duration};

use anyhow::Context as _;
use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use axum::{Router, routing::get};
use clap::Parser;
use pawguard_api::{AppState, ImageStore};
use pawguard_core::desk::ReportDesk;
use pawguard_identify::{
  Identifier,
  cloud::CloudVisionClient,
  fallback::LocalClassifier,
  yolo::YoloClient,
};
use pawguard_store_sqlite::SqliteStore;
use rand_core::OsRng;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::EnvFilter;

use crate::settings::{IdentifyConfig, ServerConfig, expand_tilde};

#[derive(Parser)]
#[command(author, version, about = "PawGuard stray animal registry server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: std::path::PathBuf,

  /// Print the argon2 hash for a password entered on stdin and exit.
  #[arg(long)]
  hash_password: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  if cli.hash_password {
    let password = read_password()?;
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?
      .to_string();
    println!("{hash}");
    return Ok(());
  }

  let cfg = ServerConfig::load(&cli.config).context("failed to read configuration")?;

  let store_path = expand_tilde(&cfg.store_path);
  if let Some(parent) = store_path.parent() {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  if cfg.ngo_accounts.is_empty() {
    warn!("no NGO accounts configured; NGO endpoints will reject every request");
  }

  let state = AppState {
    desk:       ReportDesk::new(Arc::new(store)),
    identifier: Arc::new(build_identifier(&cfg.identify)?),
    accounts:   Arc::new(cfg.ngo_accounts.clone()),
    images:     Arc::new(ImageStore::new(
      expand_tilde(&cfg.image_dir),
      &cfg.public_base_url(),
    )),
  };

  let app = Router::new()
    .route("/health", get(|| async { "ok" }))
    .nest("/api", pawguard_api::api_router(state))
    .layer(TraceLayer::new_for_http());
  let address = format!("{}:{}", cfg.host, cfg.port);

  info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Build the identifier from config. With `fallback` on, an in-process model
/// from `local_model_dir` backs up cloud vision, or failing that YOLO.
fn build_identifier(cfg: &IdentifyConfig) -> anyhow::Result<Identifier> {
  let timeout = Duration::from_secs(cfg.timeout_secs);
  let mut identifier = Identifier::new(cfg.backend);

  if let Some(url) = &cfg.cloud_url {
    let cloud = CloudVisionClient::new(url.as_str(), timeout)
      .context("failed to build cloud vision client")?;
    identifier = identifier.with_cloud(cloud);
  }
  if let Some(url) = &cfg.yolo_url {
    let yolo = Arc::new(
      YoloClient::new(url.as_str(), timeout).context("failed to build yolo client")?,
    );
    identifier = identifier.with_yolo(yolo.clone());
    if cfg.fallback && cfg.local_model_dir.is_none() {
      warn!("using the remote YOLO service as the cloud fallback; it fails along with the network");
      identifier = identifier.with_fallback(yolo);
    }
  }
  if cfg.fallback
    && let Some(dir) = &cfg.local_model_dir
  {
    identifier = identifier.with_fallback(local_classifier(&expand_tilde(dir))?);
  }

  info!(
    backend = %cfg.backend,
    cloud = cfg.cloud_url.is_some(),
    yolo = cfg.yolo_url.is_some(),
    local_model = cfg.local_model_dir.is_some(),
    "vision backends configured"
  );
  Ok(identifier)
}

#[cfg(feature = "onnx")]
fn local_classifier(dir: &Path) -> anyhow::Result<Arc<dyn LocalClassifier>> {
  let classifier = pawguard_identify::onnx::OnnxClassifier::load(dir)
    .with_context(|| format!("failed to load local classifier from {dir:?}"))?;
  Ok(Arc::new(classifier))
}

#[cfg(not(feature = "onnx"))]
fn local_classifier(dir: &Path) -> anyhow::Result<Arc<dyn LocalClassifier>> {
  anyhow::bail!("local_model_dir is set to {dir:?} but this build lacks the `onnx` feature")
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\n', '\r']).to_string())
}
