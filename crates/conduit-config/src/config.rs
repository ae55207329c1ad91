use std::collections::HashMap;
use std::path::{Path, PathBuf};

use conduit_component::{ComponentContext, InjectedSecrets};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "CONDUIT_CONFIG";

const CONFIG_FILE: &str = "config.json";

/// Errors reading the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("failed to read config file {}: {source}", path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse config file {}: {source}", path.display())]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("could not determine home directory")]
  NoHomeDir,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ConduitConfig {
  /// Tracing filter directive, used when `RUST_LOG` is unset.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub log_filter: Option<String>,

  /// Definition id -> credential field -> injected value.
  #[serde(default)]
  pub secrets: HashMap<String, HashMap<String, String>>,
}

impl ConduitConfig {
  /// Load the configuration.
  ///
  /// An explicit path wins, then `CONDUIT_CONFIG`, then `config.json` in the
  /// data directory. Only the last may be missing, in which case the
  /// default configuration is used.
  pub fn load(explicit: Option<&Path>, data_dir: &Path) -> Result<Self, ConfigError> {
    if let Some(path) = explicit {
      return Self::from_file(path);
    }

    if let Some(path) = std::env::var_os(CONFIG_ENV) {
      return Self::from_file(Path::new(&path));
    }

    let path = data_dir.join(CONFIG_FILE);
    if !path.exists() {
      debug!(path = %path.display(), "no config file, using defaults");
      return Ok(Self::default());
    }
    Self::from_file(&path)
  }

  pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;

    serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })
  }

  /// The context handed to every component at construction.
  pub fn component_context(&self) -> ComponentContext {
    self
      .secrets
      .iter()
      .fold(ComponentContext::new(), |ctx, (id, fields)| {
        ctx.with_secrets(id.clone(), InjectedSecrets::from(fields.clone()))
      })
  }
}

/// `~/.conduit`
pub fn default_data_dir() -> Result<PathBuf, ConfigError> {
  dirs::home_dir()
    .map(|home| home.join(".conduit"))
    .ok_or(ConfigError::NoHomeDir)
}
