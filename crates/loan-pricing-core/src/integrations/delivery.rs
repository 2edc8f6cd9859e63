//! Hand-off of exported bytes to wherever the user retrieves them.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Where a delivered export can be retrieved from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "location", rename_all = "snake_case")]
pub enum DeliveryLocation {
    Path(PathBuf),
    Url(String),
}

impl fmt::Display for DeliveryLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryLocation::Path(p) => write!(f, "{}", p.display()),
            DeliveryLocation::Url(u) => f.write_str(u),
        }
    }
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Rejected filename '{0}'")]
    InvalidFilename(String),

    #[error("Delivery I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Delivery service error: {0}")]
    Service(String),
}

pub trait ExportDelivery {
    fn deliver(&self, bytes: &[u8], filename: &str) -> Result<DeliveryLocation, DeliveryError>;
}

/// `memo_<epoch-seconds>.<ext>`
pub fn suggested_filename(epoch_seconds: i64, ext: &str) -> String {
    format!("memo_{epoch_seconds}.{}", ext.trim_start_matches('.'))
}

pub fn suggested_filename_now(ext: &str) -> String {
    suggested_filename(Utc::now().timestamp(), ext)
}

/// Writes exports into a local directory, creating it on first use.
#[derive(Debug, Clone)]
pub struct LocalDirectoryDelivery {
    dir: PathBuf,
}

impl LocalDirectoryDelivery {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        LocalDirectoryDelivery { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ExportDelivery for LocalDirectoryDelivery {
    fn deliver(&self, bytes: &[u8], filename: &str) -> Result<DeliveryLocation, DeliveryError> {
        let name = Path::new(filename);
        if filename.is_empty()
            || name.components().count() != 1
            || name.file_name().map(|n| n != name.as_os_str()).unwrap_or(true)
        {
            return Err(DeliveryError::InvalidFilename(filename.to_string()));
        }
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(name);
        fs::write(&path, bytes)?;
        info!(path = %path.display(), bytes = bytes.len(), "export delivered");
        Ok(DeliveryLocation::Path(path))
    }
}
