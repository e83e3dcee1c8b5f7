//! # Settings
//!
//! Directory settings for the CLI, from a TOML file and command-line flags.
//!
//! ```toml
//! data_dir = "/isis/data"
//! config_dir = "/opt/kernql/db"
//! cache_dir = "/var/cache/kernql"
//! ```
//!
//! Every field is optional. Flags override the file, the file overrides the
//! environment variables `kernql_core::locations` reads.

use kernql_core::locations::{cache_directory, config_directory, data_directory};
use kernql_core::{KernqlError, Locations};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Maximum settings file size (1 MB).
const MAX_SETTINGS_FILE_SIZE: u64 = 1024 * 1024;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub data_dir: Option<PathBuf>,
    pub config_dir: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
}

impl Settings {
    /// Read a settings file.
    pub fn load(path: &Path) -> Result<Self, KernqlError> {
        let metadata = fs::metadata(path).map_err(|e| {
            KernqlError::IoError(format!("Cannot read settings {}: {}", path.display(), e))
        })?;
        if metadata.len() > MAX_SETTINGS_FILE_SIZE {
            return Err(KernqlError::SerializationError(format!(
                "Settings file size {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_SETTINGS_FILE_SIZE
            )));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            KernqlError::IoError(format!("Cannot read settings {}: {}", path.display(), e))
        })?;
        let settings = toml::from_str(&content).map_err(|e| {
            KernqlError::SerializationError(format!("{}: {}", path.display(), e))
        })?;
        debug!(path = %path.display(), "settings loaded");
        Ok(settings)
    }

    /// Field by field, `self` where set, else `fallback`.
    #[must_use]
    pub fn or(self, fallback: Settings) -> Settings {
        Settings {
            data_dir: self.data_dir.or(fallback.data_dir),
            config_dir: self.config_dir.or(fallback.config_dir),
            cache_dir: self.cache_dir.or(fallback.cache_dir),
        }
    }

    pub fn data_dir<F>(&self, lookup: &F) -> Result<PathBuf, KernqlError>
    where
        F: Fn(&str) -> Option<String>,
    {
        match &self.data_dir {
            Some(dir) => existing_dir(dir, "data"),
            None => data_directory(lookup),
        }
    }

    pub fn config_dir<F>(&self, lookup: &F) -> Result<PathBuf, KernqlError>
    where
        F: Fn(&str) -> Option<String>,
    {
        match &self.config_dir {
            Some(dir) => existing_dir(dir, "configuration"),
            None => config_directory(lookup),
        }
    }

    /// The cache directory, created if needed.
    pub fn cache_dir<F>(&self, lookup: &F) -> Result<PathBuf, KernqlError>
    where
        F: Fn(&str) -> Option<String>,
    {
        match &self.cache_dir {
            Some(dir) => {
                fs::create_dir_all(dir).map_err(|e| {
                    KernqlError::IoError(format!(
                        "Failed to create cache directory {}: {}",
                        dir.display(),
                        e
                    ))
                })?;
                Ok(dir.clone())
            }
            None => cache_directory(lookup),
        }
    }

    pub fn locations<F>(&self, lookup: &F) -> Result<Locations, KernqlError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Locations {
            data_dir: self.data_dir(lookup)?,
            config_dir: self.config_dir(lookup)?,
            cache_dir: self.cache_dir(lookup)?,
        })
    }
}

fn existing_dir(dir: &Path, what: &str) -> Result<PathBuf, KernqlError> {
    if dir.is_dir() {
        Ok(dir.to_path_buf())
    } else {
        Err(KernqlError::IoError(format!(
            "The {} directory {} does not exist",
            what,
            dir.display()
        )))
    }
}
