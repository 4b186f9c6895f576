use std::path::{Path, PathBuf};

use anyhow::Result;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Directory-backed blob store keyed by filename-safe identifiers, with a
/// public base URL under which every key is served.
#[derive(Clone, Debug)]
pub struct LocalFileStorage {
    base_dir: PathBuf,
    base_url: String,
}

impl LocalFileStorage {
    pub fn new(base_dir: PathBuf, base_url: String) -> Self {
        Self { base_dir, base_url }
    }

    pub async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.resolve_path(key);
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Write a blob and flush it to disk before returning. Records referencing
    /// a key must only be created after `put` has returned.
    pub async fn put(&self, key: &str, data: &[u8]) -> Result<()> {
        let path = self.resolve_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let mut file = fs::File::create(&path).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        Ok(())
    }

    pub async fn exists(&self, key: &str) -> Result<bool> {
        let path = self.resolve_path(key);
        match fs::metadata(path).await {
            Ok(_) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    pub fn public_url(&self, key: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let key = key.trim_start_matches('/');
        format!("{base}/{key}")
    }

    pub fn resolve_path(&self, key: &str) -> PathBuf {
        let normalized = key.trim_start_matches('/');
        self.base_dir.join(Path::new(normalized))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_storage() -> (LocalFileStorage, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(
            dir.path().join("stored_images"),
            "http://localhost:5000/api/stored-image".to_string(),
        );
        (storage, dir)
    }

    #[tokio::test]
    async fn put_get_round_trip() {
        let (storage, _dir) = temp_storage();
        storage.put("original_x.png", b"bytes").await.unwrap();
        assert_eq!(
            storage.get("original_x.png").await.unwrap(),
            Some(b"bytes".to_vec())
        );
    }

    #[tokio::test]
    async fn missing_key_is_none_and_absent() {
        let (storage, _dir) = temp_storage();
        assert_eq!(storage.get("nope.png").await.unwrap(), None);
        assert!(!storage.exists("nope.png").await.unwrap());
    }

    #[tokio::test]
    async fn exists_after_put() {
        let (storage, _dir) = temp_storage();
        storage.put("generated_y.png", b"data").await.unwrap();
        assert!(storage.exists("generated_y.png").await.unwrap());
    }

    #[test]
    fn public_url_joins_cleanly() {
        let storage = LocalFileStorage::new(
            PathBuf::from("/tmp/x"),
            "http://host/api/stored-image/".to_string(),
        );
        assert_eq!(
            storage.public_url("/generated_y.png"),
            "http://host/api/stored-image/generated_y.png"
        );
    }
}
