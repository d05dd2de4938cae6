use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Errors raised while loading configuration or constructing a client.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("config file not found: {0}")]
  FileNotFound(String),

  #[error(
    "no configuration file found; create one at ~/.config/gigbook/config.yaml\n\
     See config.example.yaml for the format."
  )]
  NoConfigFile,

  #[error("failed to read config file {path}: {source}")]
  Io {
    path: String,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse config file {path}: {source}")]
  Parse {
    path: String,
    #[source]
    source: serde_yaml::Error,
  },

  #[error("invalid store url: {0}")]
  InvalidUrl(String),

  #[error("failed to build store client: {0}")]
  Client(String),

  #[error("anon API key not found; set GIGBOOK_ANON_KEY or SUPABASE_ANON_KEY")]
  MissingAnonKey,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub store: StoreConfig,
  /// Bucket used for image/pdf uploads when the caller doesn't pick one.
  pub default_bucket: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
  /// Base URL of the remote store, e.g. https://xyzcompany.supabase.co
  pub url: String,
  /// Per-request timeout in seconds.
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
  30
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./gigbook.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/gigbook/config.yaml
  /// 4. ~/.config/gigbook/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self, ConfigError> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(ConfigError::FileNotFound(p.display().to_string()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(ConfigError::NoConfigFile),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("gigbook.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("gigbook").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
      path: path.display().to_string(),
      source: e,
    })?;

    let config: Config = serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
      path: path.display().to_string(),
      source: e,
    })?;

    Ok(config)
  }

  /// Get the store anon API key from environment variables.
  ///
  /// Checks GIGBOOK_ANON_KEY first, then SUPABASE_ANON_KEY as fallback.
  pub fn get_anon_key() -> Result<String, ConfigError> {
    std::env::var("GIGBOOK_ANON_KEY")
      .or_else(|_| std::env::var("SUPABASE_ANON_KEY"))
      .map_err(|_| ConfigError::MissingAnonKey)
  }
}
