use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

use crate::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_STORAGE_PATH: &str = ".scissor/session.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Memory,
    File,
}

impl FromStr for StorageKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(StorageKind::Memory),
            "file" => Ok(StorageKind::File),
            other => Err(Error::Config(format!("Unknown storage type: {}", other))),
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageKind::Memory => f.write_str("memory"),
            StorageKind::File => f.write_str("file"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: Url,
    pub storage: StorageKind,
    pub storage_path: PathBuf,
    /// `None` leaves the transport default in place.
    pub timeout: Option<Duration>,
    /// Log out when an authenticated profile call answers 401/403.
    pub clear_session_on_unauthorized: bool,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            base_url: Url::parse(base_url)?,
            ..Self::default()
        })
    }

    pub fn with_storage(mut self, storage: StorageKind, path: Option<PathBuf>) -> Self {
        self.storage = storage;
        if let Some(path) = path {
            self.storage_path = path;
        }
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_clear_session_on_unauthorized(mut self, clear: bool) -> Self {
        self.clear_session_on_unauthorized = clear;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid"),
            storage: StorageKind::File,
            storage_path: PathBuf::from(DEFAULT_STORAGE_PATH),
            timeout: None,
            clear_session_on_unauthorized: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_kind_from_str() {
        assert_eq!("memory".parse::<StorageKind>().unwrap(), StorageKind::Memory);
        assert_eq!(" FILE ".parse::<StorageKind>().unwrap(), StorageKind::File);
        assert!("redis".parse::<StorageKind>().is_err());
    }

    #[test]
    fn test_config_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url.as_str(), "http://localhost:8080/");
        assert_eq!(config.storage, StorageKind::File);
        assert!(config.timeout.is_none());
        assert!(!config.clear_session_on_unauthorized);
    }

    #[test]
    fn test_config_rejects_bad_url() {
        assert!(matches!(ClientConfig::new("not a url"), Err(Error::InvalidUrl(_))));
    }
}
