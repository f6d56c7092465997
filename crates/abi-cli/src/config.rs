// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! CLI preferences: a storage port, a JSON service over it and a filesystem
//! adapter rooted at the platform config dir (or an explicit file).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use abi_core::ConversionMode;
use directories::ProjectDirs;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

/// Key the preferences are stored under.
pub const PREFS_KEY: &str = "abi-cli";

/// Storage port for raw config blobs (keyed by logical name).
pub trait ConfigStore {
    /// Load a raw config blob. Returns `NotFound` when missing.
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError>;
    /// Persist a raw config blob.
    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError>;
}

/// Error type for config operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Key not present in store.
    #[error("not found")]
    NotFound,
    /// I/O error while reading/writing.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    /// Malformed config file.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    /// The platform has no config directory.
    #[error("could not resolve config dir")]
    NoConfigDir,
}

/// Serializes values as JSON and delegates storage to a [`ConfigStore`].
pub struct ConfigService<S> {
    store: S,
}

impl<S: ConfigStore> ConfigService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Load the value for `key`; `Ok(None)` if it was never saved.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        match self.store.load_raw(key) {
            Ok(bytes) if bytes.is_empty() => Ok(None),
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(ConfigError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<(), ConfigError> {
        let data = serde_json::to_vec_pretty(value)?;
        self.store.save_raw(key, &data)
    }
}

/// Where [`FsConfigStore`] keeps its files.
#[derive(Debug, Clone)]
enum Location {
    /// One `<key>.json` per key inside a directory.
    Dir(PathBuf),
    /// Every key maps to this file.
    File(PathBuf),
}

/// JSON files on disk.
#[derive(Debug, Clone)]
pub struct FsConfigStore {
    location: Location,
}

impl FsConfigStore {
    /// Store rooted at the user config directory (e.g. `~/.config/abi-cli`).
    /// Nothing is created until the first save.
    pub fn new() -> Result<Self, ConfigError> {
        let proj = ProjectDirs::from("dev", "flyingrobots", "abi-cli")
            .ok_or(ConfigError::NoConfigDir)?;
        Ok(Self {
            location: Location::Dir(proj.config_dir().to_path_buf()),
        })
    }

    /// Store backed by a single explicit file.
    pub fn at_file(path: impl Into<PathBuf>) -> Self {
        Self {
            location: Location::File(path.into()),
        }
    }

    /// File that holds `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        match &self.location {
            Location::Dir(base) => base.join(format!("{key}.json")),
            Location::File(path) => path.clone(),
        }
    }
}

impl ConfigStore for FsConfigStore {
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError> {
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Err(ConfigError::NotFound),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, data)?;
        Ok(())
    }
}

/// User preferences for the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliPrefs {
    /// Struct key matching when `--reorderable` is not given.
    pub default_mode: ConversionMode,
    /// `tracing` filter used when `RUST_LOG` is unset.
    pub log_filter: String,
    /// Pretty-print JSON output.
    pub pretty: bool,
}

impl Default for CliPrefs {
    fn default() -> Self {
        Self {
            default_mode: ConversionMode::Strict,
            log_filter: "warn".into(),
            pretty: false,
        }
    }
}

/// Store for `--config <path>` if given, else the platform default.
pub fn open_store(explicit: Option<&Path>) -> Result<FsConfigStore, ConfigError> {
    match explicit {
        Some(path) => Ok(FsConfigStore::at_file(path)),
        None => FsConfigStore::new(),
    }
}
