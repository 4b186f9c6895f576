use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::prompt::RoomType;
use crate::store::LocalFileStorage;

/// Durable row linking an original/generated image pair to its style and
/// room-type inputs. Never updated in place; validity is rechecked against
/// blob storage on every read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub id: u64,
    pub original_image: String,
    pub generated_image: String,
    pub style: String,
    pub room_type: RoomType,
    pub timestamp: DateTime<Utc>,
}

/// Record table persisted as one JSON document per record. Blob storage is
/// the source of truth: records whose blobs are gone are pruned on read.
pub struct RecordStore {
    records_dir: PathBuf,
    storage: Arc<LocalFileStorage>,
}

impl RecordStore {
    pub fn new(records_dir: PathBuf, storage: Arc<LocalFileStorage>) -> Self {
        Self {
            records_dir,
            storage,
        }
    }

    /// Insert a record for an image pair. Returns `Ok(false)` without writing
    /// when either referenced blob is missing from storage at call time.
    pub async fn insert(
        &self,
        original_image: &str,
        generated_image: &str,
        style: &str,
        room_type: RoomType,
    ) -> Result<bool> {
        let original_exists = self.storage.exists(original_image).await?;
        let generated_exists = self.storage.exists(generated_image).await?;
        if !(original_exists && generated_exists) {
            warn!(
                original_image,
                generated_image, "not recording generation, referenced image files are missing"
            );
            return Ok(false);
        }

        let record = GenerationRecord {
            id: self.next_id().await?,
            original_image: original_image.to_string(),
            generated_image: generated_image.to_string(),
            style: style.to_string(),
            room_type,
            timestamp: Utc::now(),
        };

        fs::create_dir_all(&self.records_dir).await?;
        let payload = serde_json::to_vec_pretty(&record)?;
        let mut file = fs::File::create(self.record_path(record.id)).await?;
        file.write_all(&payload).await?;
        file.sync_all().await?;
        Ok(true)
    }

    /// All valid records, most recent first. Records referencing missing
    /// blobs are pruned as a side effect.
    pub async fn list_recent(&self) -> Result<Vec<GenerationRecord>> {
        let mut records = self.sweep().await?;
        records.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(records)
    }

    /// Delete records referencing missing blobs. Idempotent; a racing insert
    /// may be transiently missed but is never corrupted.
    pub async fn prune(&self) -> Result<()> {
        self.sweep().await?;
        Ok(())
    }

    pub async fn delete(&self, id: u64) -> Result<bool> {
        match fs::remove_file(self.record_path(id)).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    async fn sweep(&self) -> Result<Vec<GenerationRecord>> {
        let mut dir = match fs::read_dir(&self.records_dir).await {
            Ok(dir) => dir,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut records = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let bytes = fs::read(&path).await?;
            let Ok(record) = serde_json::from_slice::<GenerationRecord>(&bytes) else {
                continue;
            };

            let original_exists = self.storage.exists(&record.original_image).await?;
            let generated_exists = self.storage.exists(&record.generated_image).await?;
            if original_exists && generated_exists {
                records.push(record);
            } else {
                info!(id = record.id, "pruning record with missing image files");
                self.delete(record.id).await?;
            }
        }
        Ok(records)
    }

    async fn next_id(&self) -> Result<u64> {
        let mut dir = match fs::read_dir(&self.records_dir).await {
            Ok(dir) => dir,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(1),
            Err(err) => return Err(err.into()),
        };

        let mut max_id = 0;
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            if let Some(id) = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| stem.parse::<u64>().ok())
            {
                max_id = max_id.max(id);
            }
        }
        Ok(max_id + 1)
    }

    fn record_path(&self, id: u64) -> PathBuf {
        self.records_dir.join(format!("{id:08}.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn temp_store() -> (RecordStore, Arc<LocalFileStorage>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(LocalFileStorage::new(
            dir.path().join("stored_images"),
            "http://localhost:5000/api/stored-image".to_string(),
        ));
        let store = RecordStore::new(dir.path().join("records"), storage.clone());
        (store, storage, dir)
    }

    async fn put_pair(storage: &LocalFileStorage, original: &str, generated: &str) {
        storage.put(original, b"original bytes").await.unwrap();
        storage.put(generated, b"generated bytes").await.unwrap();
    }

    #[tokio::test]
    async fn insert_rejects_missing_blobs() {
        let (store, storage, _dir) = temp_store().await;
        storage.put("original_a.png", b"only one").await.unwrap();
        let inserted = store
            .insert("original_a.png", "generated_a.png", "industrial", RoomType::Kitchen)
            .await
            .unwrap();
        assert!(!inserted);
        assert!(store.list_recent().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn insert_and_list() {
        let (store, storage, _dir) = temp_store().await;
        put_pair(&storage, "original_a.png", "generated_a.png").await;
        let inserted = store
            .insert("original_a.png", "generated_a.png", "bohemian", RoomType::Bedroom)
            .await
            .unwrap();
        assert!(inserted);

        let records = store.list_recent().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, 1);
        assert_eq!(records[0].style, "bohemian");
        assert_eq!(records[0].room_type, RoomType::Bedroom);
    }

    #[tokio::test]
    async fn ids_increment_and_listing_is_most_recent_first() {
        let (store, storage, _dir) = temp_store().await;
        put_pair(&storage, "original_a.png", "generated_a.png").await;
        put_pair(&storage, "original_b.png", "generated_b.png").await;

        store
            .insert("original_a.png", "generated_a.png", "industrial", RoomType::Kitchen)
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        store
            .insert("original_b.png", "generated_b.png", "scandinavian", RoomType::LivingRoom)
            .await
            .unwrap();

        let records = store.list_recent().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, 2);
        assert_eq!(records[0].original_image, "original_b.png");
        assert_eq!(records[1].id, 1);
    }

    #[tokio::test]
    async fn listing_prunes_records_with_deleted_blobs() {
        let (store, storage, _dir) = temp_store().await;
        put_pair(&storage, "original_a.png", "generated_a.png").await;
        store
            .insert("original_a.png", "generated_a.png", "contemporary", RoomType::LivingRoom)
            .await
            .unwrap();

        std::fs::remove_file(storage.resolve_path("generated_a.png")).unwrap();

        assert!(store.list_recent().await.unwrap().is_empty());
        // The table itself no longer holds the row.
        assert!(!store.delete(1).await.unwrap());
    }

    #[tokio::test]
    async fn prune_is_idempotent() {
        let (store, storage, _dir) = temp_store().await;
        put_pair(&storage, "original_a.png", "generated_a.png").await;
        store
            .insert("original_a.png", "generated_a.png", "luxury classic", RoomType::Bedroom)
            .await
            .unwrap();

        std::fs::remove_file(storage.resolve_path("original_a.png")).unwrap();
        store.prune().await.unwrap();
        store.prune().await.unwrap();
        assert!(store.list_recent().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_missing_record_returns_false() {
        let (store, _storage, _dir) = temp_store().await;
        assert!(!store.delete(42).await.unwrap());
    }
}
