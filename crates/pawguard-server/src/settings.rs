//! Runtime configuration, deserialised from `config.toml` layered with
//! `PAWGUARD_*` environment variables.

use std::path::{Path, PathBuf};

use pawguard_api::NgoAccount;
use pawguard_identify::Backend;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:            String,
  #[serde(default = "default_port")]
  pub port:            u16,
  /// Prefix of stored image URLs. Defaults to `http://<host>:<port>`.
  pub public_base_url: Option<String>,
  #[serde(default = "default_store_path")]
  pub store_path:      PathBuf,
  #[serde(default = "default_image_dir")]
  pub image_dir:       PathBuf,
  #[serde(default)]
  pub identify:        IdentifyConfig,
  #[serde(default)]
  pub ngo_accounts:    Vec<NgoAccount>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdentifyConfig {
  #[serde(default)]
  pub backend:         Backend,
  pub cloud_url:       Option<String>,
  pub yolo_url:        Option<String>,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs:    u64,
  /// Try a local classifier when cloud vision is over quota or unreachable.
  #[serde(default = "default_true")]
  pub fallback:        bool,
  /// Directory holding `model.onnx` and `labels.txt` for the in-process
  /// classifier. Without it the YOLO backend is the fallback.
  pub local_model_dir: Option<PathBuf>,
}

impl Default for IdentifyConfig {
  fn default() -> Self {
    Self {
      backend:         Backend::default(),
      cloud_url:       None,
      yolo_url:        None,
      timeout_secs:    default_timeout_secs(),
      fallback:        true,
      local_model_dir: None,
    }
  }
}

fn default_host() -> String { "127.0.0.1".to_owned() }
fn default_port() -> u16 { 8080 }
fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/pawguard/pawguard.db") }
fn default_image_dir() -> PathBuf { PathBuf::from("~/.local/share/pawguard/images") }
fn default_timeout_secs() -> u64 { 30 }
fn default_true() -> bool { true }

impl ServerConfig {
  /// Load `path` (optional) and the environment.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("PAWGUARD")
          .prefix_separator("_")
          .separator("__"),
      )
      .build()?
      .try_deserialize()
  }

  pub fn public_base_url(&self) -> String {
    self
      .public_base_url
      .clone()
      .unwrap_or_else(|| format!("http://{}:{}", self.host, self.port))
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn parse(toml: &str) -> ServerConfig {
    config::Config::builder()
      .add_source(config::File::from_str(toml, config::FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap()
  }

  #[test]
  fn empty_file_uses_defaults() {
    let cfg = parse("");
    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.public_base_url(), "http://127.0.0.1:8080");
    assert_eq!(cfg.identify.backend, Backend::Cloud);
    assert!(cfg.identify.fallback);
    assert_eq!(cfg.identify.timeout_secs, 30);
    assert!(cfg.identify.local_model_dir.is_none());
    assert!(cfg.ngo_accounts.is_empty());
  }

  #[test]
  fn full_file() {
    let cfg = parse(
      r#"
        host = "0.0.0.0"
        port = 9000
        public_base_url = "https://pawguard.example.org"
        store_path = "/var/lib/pawguard/db.sqlite"
        image_dir = "/var/lib/pawguard/images"

        [identify]
        backend = "yolo"
        yolo_url = "http://localhost:5001"
        fallback = false
        local_model_dir = "~/models/mobilenet"

        [[ngo_accounts]]
        ngo_id = "ngo-1"
        ngo_name = "Paws Rescue"
        username = "paws"
        password_hash = "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA"
      "#,
    );
    assert_eq!(cfg.port, 9000);
    assert_eq!(cfg.public_base_url(), "https://pawguard.example.org");
    assert_eq!(cfg.identify.backend, Backend::Yolo);
    assert_eq!(cfg.identify.yolo_url.as_deref(), Some("http://localhost:5001"));
    assert!(cfg.identify.cloud_url.is_none());
    assert!(!cfg.identify.fallback);
    assert_eq!(
      cfg.identify.local_model_dir.as_deref(),
      Some(Path::new("~/models/mobilenet"))
    );
    assert_eq!(cfg.ngo_accounts.len(), 1);
    assert_eq!(cfg.ngo_accounts[0].ngo_name, "Paws Rescue");
  }

  #[test]
  fn tilde_expansion() {
    let Ok(home) = std::env::var("HOME") else {
      return;
    };
    assert_eq!(
      expand_tilde(Path::new("~/pawguard.db")),
      PathBuf::from(home).join("pawguard.db")
    );
    assert_eq!(expand_tilde(Path::new("/abs/db")), PathBuf::from("/abs/db"));
  }
}
