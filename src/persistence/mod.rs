//! JSON file persistence
//!
//! Features:
//! - Pretty-printed JSON on disk
//! - Atomic replace (write to `.tmp`, then rename over the old file)
//! - Missing or corrupt files fall back to defaults with a log line

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed data in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StorageError {
    /// The file simply isn't there yet
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::Io { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}

pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, StorageError> {
    let json = fs::read_to_string(path).map_err(|source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&json).map_err(|source| StorageError::Json {
        path: path.to_path_buf(),
        source,
    })
}

pub fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    let io_err = |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    };

    let json = serde_json::to_string_pretty(value).map_err(|source| StorageError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let tmp = path.with_extension("tmp");
    fs::write(&tmp, json).map_err(io_err)?;
    fs::rename(&tmp, path).map_err(io_err)?;
    Ok(())
}

/// Load `path`, or fall back to `T::default()` if it is missing or unreadable
pub fn load_or_default<T: DeserializeOwned + Default>(path: &Path, what: &str) -> T {
    match load_json(path) {
        Ok(value) => {
            log::info!("Loaded {} from {}", what, path.display());
            value
        }
        Err(err) if err.is_not_found() => {
            log::info!("No {} found, using defaults", what);
            T::default()
        }
        Err(err) => {
            log::warn!("Ignoring {}: {}", what, err);
            T::default()
        }
    }
}

#[cfg(test)]
pub(crate) fn scratch_path(name: &str) -> PathBuf {
    std::env::temp_dir()
        .join(format!("pop-rush-test-{}", std::process::id()))
        .join(name)
}
