//! Connection settings: flags override the config file, which overrides
//! defaults.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::client::ApiConfig;

pub const DEFAULT_URL: &str = "http://localhost:8080";

/// Shape of the optional TOML config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
  #[serde(default)]
  pub url:      String,
  #[serde(default)]
  pub username: String,
  #[serde(default)]
  pub password: String,
}

impl ConfigFile {
  pub fn read(path: &Path) -> Result<Self> {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")
  }
}

fn non_empty(s: String) -> Option<String> { (!s.is_empty()).then_some(s) }

pub fn resolve(
  url: Option<String>,
  user: Option<String>,
  password: Option<String>,
  file: ConfigFile,
) -> ApiConfig {
  ApiConfig {
    base_url: url
      .or_else(|| non_empty(file.url))
      .unwrap_or_else(|| DEFAULT_URL.to_owned()),
    username: user.or_else(|| non_empty(file.username)).unwrap_or_default(),
    password: password.or_else(|| non_empty(file.password)).unwrap_or_default(),
  }
}
