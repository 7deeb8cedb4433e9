use async_trait::async_trait;
use sc_core::{Error, KeyValueStorage, Result};
use serde_json::{Map, Value};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Storage backed by a single JSON object on disk.
///
/// Every write rewrites the whole file; the mutex serializes read-modify-write
/// cycles within this process.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| Error::Storage(format!("Failed to create storage directory: {}", e)))?;
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Map<String, Value>> {
        let data = match tokio::fs::read_to_string(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(Error::Io(e)),
        };

        if data.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str::<Value>(&data) {
            Ok(Value::Object(entries)) => Ok(entries),
            Ok(_) | Err(_) => {
                tracing::warn!("Ignoring unreadable storage file {}", self.path.display());
                Ok(Map::new())
            }
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Writes the whole map to a sibling temp file created owner-only, then
    /// renames it over the target. Readers see either the old or new file.
    async fn save(&self, entries: &Map<String, Value>) -> Result<()> {
        let json = serde_json::to_string_pretty(entries)?;
        let temp = self.temp_path();

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let written = async {
            let mut file = options.open(&temp).await?;
            file.write_all(json.as_bytes()).await?;
            file.sync_all().await?;
            tokio::fs::rename(&temp, &self.path).await
        }
        .await;

        if let Err(e) = written {
            if let Err(cleanup) = tokio::fs::remove_file(&temp).await {
                if cleanup.kind() != ErrorKind::NotFound {
                    tracing::warn!("Failed to remove {}: {}", temp.display(), cleanup);
                }
            }
            return Err(Error::Storage(format!(
                "Failed to write {}: {}",
                self.path.display(),
                e
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl KeyValueStorage for FileStorage {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock().await;
        let entries = self.load().await?;
        Ok(entries.get(key).and_then(Value::as_str).map(str::to_string))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;
        entries.insert(key.to_string(), Value::String(value.to_string()));
        self.save(&entries).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;
        if entries.remove(key).is_some() {
            self.save(&entries).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sc_core::TOKEN_KEY;
    use tempfile::TempDir;

    fn test_path(dir: &TempDir) -> PathBuf {
        dir.path().join("nested").join("session.json")
    }

    #[tokio::test]
    async fn test_file_storage_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = test_path(&dir);

        let storage = FileStorage::open(&path).await.unwrap();
        assert_eq!(storage.get(TOKEN_KEY).await.unwrap(), None);
        storage.set(TOKEN_KEY, "abc").await.unwrap();
        storage.set("theme", "dark").await.unwrap();

        let reopened = FileStorage::open(&path).await.unwrap();
        assert_eq!(reopened.get(TOKEN_KEY).await.unwrap(), Some("abc".to_string()));
        assert_eq!(reopened.get("theme").await.unwrap(), Some("dark".to_string()));
    }

    #[tokio::test]
    async fn test_remove_keeps_other_keys() {
        let dir = TempDir::new().unwrap();
        let path = test_path(&dir);
        let storage = FileStorage::open(&path).await.unwrap();

        storage.set(TOKEN_KEY, "abc").await.unwrap();
        storage.set("theme", "dark").await.unwrap();
        storage.remove(TOKEN_KEY).await.unwrap();
        storage.remove(TOKEN_KEY).await.unwrap();

        assert_eq!(storage.get(TOKEN_KEY).await.unwrap(), None);
        assert_eq!(storage.get("theme").await.unwrap(), Some("dark".to_string()));

        storage.remove("theme").await.unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert_eq!(serde_json::from_str::<Value>(&raw).unwrap(), Value::Object(Map::new()));
    }

    #[tokio::test]
    async fn test_corrupt_file_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "not json").unwrap();

        let storage = FileStorage::open(&path).await.unwrap();
        assert_eq!(storage.get(TOKEN_KEY).await.unwrap(), None);
        storage.set(TOKEN_KEY, "fresh").await.unwrap();
        assert_eq!(storage.get(TOKEN_KEY).await.unwrap(), Some("fresh".to_string()));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_existing_readable_file_is_replaced_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, r#"{"theme":"dark"}"#).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let storage = FileStorage::open(&path).await.unwrap();
        storage.set(TOKEN_KEY, "abc").await.unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(storage.get("theme").await.unwrap(), Some("dark".to_string()));
        assert!(!dir.path().join("session.json.tmp").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_file_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        let storage = FileStorage::open(&path).await.unwrap();
        storage.set(TOKEN_KEY, "abc").await.unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
