use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub storage: StorageConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub sync: SyncConfig,
  #[serde(default)]
  pub remote: RemoteConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
  /// Database path override; defaults to the platform data directory.
  pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// TTL applied to read-through cache entries.
  #[serde(default = "default_cache_ttl_secs")]
  pub default_ttl_secs: u64,
  /// How often the sweep evicts expired entries.
  #[serde(default = "default_sweep_interval_secs")]
  pub sweep_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
  /// Delay between a reconnect signal and the sync it triggers.
  #[serde(default = "default_debounce_ms")]
  pub debounce_ms: u64,
  /// Pacing of the periodic pending-work safety-net check.
  #[serde(default = "default_poll_interval_secs")]
  pub poll_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
  /// Base URL of the remote order service.
  pub url: Option<String>,
  /// Client-side timeout for remote calls.
  #[serde(default = "default_remote_timeout_secs")]
  pub timeout_secs: u64,
}

fn default_cache_ttl_secs() -> u64 {
  300
}

fn default_sweep_interval_secs() -> u64 {
  3600
}

fn default_debounce_ms() -> u64 {
  1000
}

fn default_poll_interval_secs() -> u64 {
  60
}

fn default_remote_timeout_secs() -> u64 {
  30
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      default_ttl_secs: default_cache_ttl_secs(),
      sweep_interval_secs: default_sweep_interval_secs(),
    }
  }
}

impl Default for SyncConfig {
  fn default() -> Self {
    Self {
      debounce_ms: default_debounce_ms(),
      poll_interval_secs: default_poll_interval_secs(),
    }
  }
}

impl Default for RemoteConfig {
  fn default() -> Self {
    Self {
      url: None,
      timeout_secs: default_remote_timeout_secs(),
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./fieldsync.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/fieldsync/config.yaml
  /// 4. ~/.config/fieldsync/config.yaml
  ///
  /// A missing file is not an error; every section has defaults.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("fieldsync.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("fieldsync").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  /// Get the remote API token from environment variables.
  ///
  /// Checks FIELDSYNC_API_TOKEN first, then FIELD_API_TOKEN as fallback.
  pub fn get_api_token() -> Result<String> {
    std::env::var("FIELDSYNC_API_TOKEN")
      .or_else(|_| std::env::var("FIELD_API_TOKEN"))
      .map_err(|_| {
        eyre!("API token not found. Set FIELDSYNC_API_TOKEN or FIELD_API_TOKEN environment variable.")
      })
  }
}
