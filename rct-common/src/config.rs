//! Configuration file resolution and TOML loading
//!
//! Config file lookup follows a fixed priority order:
//! 1. Explicit path (caller-supplied, highest priority)
//! 2. Environment variable (`RCT_RECON_CONFIG` by default)
//! 3. User config directory (`~/.config/rct-recon/config.toml` on Linux)
//! 4. System config (`/etc/rct-recon/config.toml`, Linux only)
//! 5. Compiled defaults (no file)
//!
//! A missing file is never fatal. A file that exists but cannot be read or
//! parsed is an error: silently falling back would hide a broken config.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Default environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "RCT_RECON_CONFIG";

/// Application directory name under the platform config dir
pub const APP_DIR_NAME: &str = "rct-recon";

/// Where a resolved config path came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigOrigin {
    Explicit,
    Environment,
    UserConfigDir,
    SystemConfigDir,
}

impl std::fmt::Display for ConfigOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Explicit => write!(f, "explicit path"),
            Self::Environment => write!(f, "environment variable"),
            Self::UserConfigDir => write!(f, "user config directory"),
            Self::SystemConfigDir => write!(f, "system config directory"),
        }
    }
}

/// Resolves the config file path following the documented priority order
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    explicit: Option<PathBuf>,
    app_dir_name: String,
}

impl Default for ConfigResolver {
    fn default() -> Self {
        Self::new(APP_DIR_NAME)
    }
}

impl ConfigResolver {
    /// Create a resolver for the given application directory name
    pub fn new(app_dir_name: &str) -> Self {
        Self {
            explicit: None,
            app_dir_name: app_dir_name.to_string(),
        }
    }

    /// Use an explicit config path (takes priority over everything else)
    pub fn with_explicit_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit = Some(path.into());
        self
    }

    /// Resolve the config path, or `None` when only compiled defaults apply
    ///
    /// Explicit and environment paths are returned even if the file does not
    /// exist, so the loader can warn about the specific missing file.
    pub fn resolve(&self) -> Option<(PathBuf, ConfigOrigin)> {
        if let Some(path) = &self.explicit {
            return Some((path.clone(), ConfigOrigin::Explicit));
        }

        if let Ok(value) = std::env::var(CONFIG_ENV_VAR) {
            if !value.trim().is_empty() {
                return Some((PathBuf::from(value), ConfigOrigin::Environment));
            }
        }

        if let Some(user) = dirs::config_dir().map(|d| d.join(&self.app_dir_name).join("config.toml")) {
            if user.exists() {
                return Some((user, ConfigOrigin::UserConfigDir));
            }
        }

        if cfg!(target_os = "linux") {
            let system = PathBuf::from("/etc").join(&self.app_dir_name).join("config.toml");
            if system.exists() {
                return Some((system, ConfigOrigin::SystemConfigDir));
            }
        }

        None
    }

    /// Resolve and load a config document, falling back to `T::default()`
    ///
    /// Missing file → warning + defaults. Unreadable or malformed file → error.
    pub fn load_or_default<T>(&self) -> Result<T>
    where
        T: DeserializeOwned + Default,
    {
        match self.resolve() {
            Some((path, origin)) => {
                if !path.exists() {
                    warn!(
                        "Config file {} (from {}) not found, using compiled defaults",
                        path.display(),
                        origin
                    );
                    return Ok(T::default());
                }
                info!("Loading config from {} ({})", path.display(), origin);
                load_toml_file(&path)
            }
            None => {
                debug!("No config file found, using compiled defaults");
                Ok(T::default())
            }
        }
    }
}

/// Read and deserialize a TOML file
pub fn load_toml_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)?;
    parse_toml(&content, &path.display().to_string())
}

/// Deserialize a TOML document, labelling errors with `origin`
pub fn parse_toml<T: DeserializeOwned>(content: &str, origin: &str) -> Result<T> {
    toml::from_str(content).map_err(|e| Error::Parse {
        path: origin.to_string(),
        message: e.to_string(),
    })
}
