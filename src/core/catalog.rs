//! The per-kind record collection and its persistence collaborator.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{CoreError, CoreResult, ResourceKind, ResourceRecord};
use crate::utils::paths::normalize_separators;

/// An ordered, owned collection of records of one resource kind.
///
/// Insertion order is kept for display; nothing else depends on it.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    kind: ResourceKind,
    records: Vec<ResourceRecord>,
}

impl Catalog {
    pub fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            records: Vec::new(),
        }
    }

    pub fn from_records(kind: ResourceKind, records: Vec<ResourceRecord>) -> Self {
        Self { kind, records }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[ResourceRecord] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut [ResourceRecord] {
        &mut self.records
    }

    pub fn find(&self, id: &str) -> Option<&ResourceRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Finds a record by path, ignoring the separator style.
    pub fn find_by_path(&self, path: &str) -> Option<&ResourceRecord> {
        let wanted = normalize_separators(path);
        self.records
            .iter()
            .find(|r| normalize_separators(&r.file_path) == wanted)
    }

    fn find_mut(&mut self, id: &str) -> CoreResult<&mut ResourceRecord> {
        self.records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| CoreError::RecordNotFound(id.to_string()))
    }

    pub fn insert(&mut self, record: ResourceRecord) {
        tracing::debug!("Adding {} record {} ({})", self.kind, record.name, record.file_path);
        self.records.push(record);
    }

    pub fn remove(&mut self, id: &str) -> CoreResult<ResourceRecord> {
        let idx = self
            .records
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| CoreError::RecordNotFound(id.to_string()))?;
        Ok(self.records.remove(idx))
    }

    /// Points an existing record at a new location and marks it present again.
    pub fn update_path(&mut self, id: &str, new_path: &str) -> CoreResult<&ResourceRecord> {
        let record = self.find_mut(id)?;
        tracing::info!(
            "Updating path of {} from {} to {}",
            record.name,
            record.file_path,
            new_path
        );
        record.file_path = new_path.to_string();
        record.file_exists = true;
        Ok(record)
    }

    pub fn set_rating(&mut self, id: &str, rating: u8) -> CoreResult<()> {
        if !(1..=5).contains(&rating) {
            return Err(CoreError::InvalidRating(rating));
        }
        self.find_mut(id)?.rating = Some(rating);
        Ok(())
    }

    pub fn clear_rating(&mut self, id: &str) -> CoreResult<()> {
        self.find_mut(id)?.rating = None;
        Ok(())
    }

    /// Flips the favorite flag and returns the new value.
    pub fn toggle_favorite(&mut self, id: &str) -> CoreResult<bool> {
        let record = self.find_mut(id)?;
        record.is_favorite = !record.is_favorite;
        Ok(record.is_favorite)
    }

    pub fn missing_count(&self) -> usize {
        self.records.iter().filter(|r| !r.file_exists).count()
    }
}

/// Durable key-value storage of catalogs, keyed by resource kind.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn load(&self, kind: ResourceKind) -> CoreResult<Vec<ResourceRecord>>;
    async fn save(&self, kind: ResourceKind, records: &[ResourceRecord]) -> CoreResult<()>;
}

/// Stores each catalog as a pretty-printed JSON array in `<dir>/<kind>.json`.
///
/// Writes of one kind are serialized; clones share the same locks.
#[derive(Debug, Clone)]
pub struct JsonCatalogStore {
    dir: PathBuf,
    write_locks: Arc<HashMap<ResourceKind, Mutex<()>>>,
}

impl JsonCatalogStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_locks: Arc::new(
                ResourceKind::ALL
                    .into_iter()
                    .map(|kind| (kind, Mutex::new(())))
                    .collect(),
            ),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.dir
    }

    pub fn file_for(&self, kind: ResourceKind) -> PathBuf {
        self.dir.join(format!("{}.json", kind.as_str()))
    }
}

#[async_trait]
impl CatalogStore for JsonCatalogStore {
    async fn load(&self, kind: ResourceKind) -> CoreResult<Vec<ResourceRecord>> {
        let path = self.file_for(kind);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No {} catalog at {:?}, starting empty", kind, path);
                return Ok(Vec::new());
            }
            Err(e) => return Err(CoreError::io(e, path)),
        };
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        let records: Vec<ResourceRecord> = serde_json::from_str(&content)?;
        tracing::info!("Loaded {} {} records from {:?}", records.len(), kind, path);
        Ok(records)
    }

    async fn save(&self, kind: ResourceKind, records: &[ResourceRecord]) -> CoreResult<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| CoreError::io(e, &self.dir))?;

        let path = self.file_for(kind);
        let tmp = path.with_extension(format!("json.{}.tmp", uuid::Uuid::new_v4().simple()));
        let json = serde_json::to_string_pretty(records)?;

        let _guard = match self.write_locks.get(&kind) {
            Some(lock) => Some(lock.lock().await),
            None => None,
        };
        // Write-then-rename so a crash never leaves a truncated catalog behind.
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| CoreError::io(e, &tmp))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| CoreError::io(e, &path))?;

        tracing::info!("Saved {} {} records to {:?}", records.len(), kind, path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> Catalog {
        let mut catalog = Catalog::new(ResourceKind::Video);
        catalog.insert(ResourceRecord::new("Trip", "C:\\Videos\\trip.mp4"));
        catalog.insert(ResourceRecord::new("Party", "C:/Videos/party.mkv"));
        catalog
    }

    #[test]
    fn find_by_path_ignores_separator_style() {
        let catalog = sample();
        assert_eq!(
            catalog.find_by_path("C:/Videos/trip.mp4").map(|r| r.name.as_str()),
            Some("Trip")
        );
        assert!(catalog.find_by_path("C:/Videos/other.mp4").is_none());
    }

    #[test]
    fn update_path_marks_record_present() {
        let mut catalog = sample();
        let id = catalog.records()[0].id.clone();
        catalog.records_mut()[0].file_exists = false;

        let updated = catalog.update_path(&id, "D:/Moved/trip.mp4").unwrap();
        assert_eq!(updated.file_path, "D:/Moved/trip.mp4");
        assert!(updated.file_exists);
    }

    #[test]
    fn mutations_on_unknown_id_fail() {
        let mut catalog = sample();
        assert!(matches!(
            catalog.update_path("nope", "x"),
            Err(CoreError::RecordNotFound(_))
        ));
        assert!(catalog.toggle_favorite("nope").is_err());
        assert!(catalog.remove("nope").is_err());
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn rating_is_validated() {
        let mut catalog = sample();
        let id = catalog.records()[1].id.clone();
        assert!(matches!(
            catalog.set_rating(&id, 6),
            Err(CoreError::InvalidRating(6))
        ));
        catalog.set_rating(&id, 4).unwrap();
        assert_eq!(catalog.find(&id).unwrap().rating, Some(4));
        catalog.clear_rating(&id).unwrap();
        assert_eq!(catalog.find(&id).unwrap().rating, None);
    }

    #[test]
    fn toggle_favorite_flips() {
        let mut catalog = sample();
        let id = catalog.records()[0].id.clone();
        assert!(catalog.toggle_favorite(&id).unwrap());
        assert!(!catalog.toggle_favorite(&id).unwrap());
    }

    #[tokio::test]
    async fn json_store_round_trips_and_keeps_unknown_fields() {
        let dir = tempdir().unwrap();
        let store = JsonCatalogStore::new(dir.path().join("catalogs"));

        let mut record = ResourceRecord::new("Song", "/music/song.mp3");
        record
            .extra
            .insert("artist".into(), serde_json::json!("Someone"));
        store.save(ResourceKind::Audio, &[record.clone()]).await.unwrap();

        let loaded = store.load(ResourceKind::Audio).await.unwrap();
        assert_eq!(loaded, vec![record]);
        assert!(store.load(ResourceKind::Game).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_saves_of_one_kind_all_succeed() {
        let dir = tempdir().unwrap();
        let store = JsonCatalogStore::new(dir.path());

        let mut tasks = Vec::new();
        for writer in 0..4 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                for round in 0..25 {
                    let record = ResourceRecord::new(format!("w{writer}-r{round}"), "/a.mp3");
                    store.save(ResourceKind::Audio, &[record]).await?;
                }
                Ok::<_, CoreError>(())
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(store.load(ResourceKind::Audio).await.unwrap().len(), 1);
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn json_store_accepts_folder_path_field() {
        let dir = tempdir().unwrap();
        let store = JsonCatalogStore::new(dir.path());
        let legacy = r#"[{
            "id": "1",
            "name": "Album",
            "folderPath": "C:/Comics/Album",
            "addedDate": "2024-05-01T10:00:00Z",
            "pagesCount": 12
        }]"#;
        std::fs::write(store.file_for(ResourceKind::Image), legacy).unwrap();

        let loaded = store.load(ResourceKind::Image).await.unwrap();
        assert_eq!(loaded[0].file_path, "C:/Comics/Album");
        assert!(loaded[0].file_exists);
        assert_eq!(loaded[0].extra["pagesCount"], serde_json::json!(12));
    }

    #[tokio::test]
    async fn corrupt_catalog_is_a_serialization_error() {
        let dir = tempdir().unwrap();
        let store = JsonCatalogStore::new(dir.path());
        std::fs::write(store.file_for(ResourceKind::Novel), "{not json").unwrap();
        assert!(matches!(
            store.load(ResourceKind::Novel).await,
            Err(CoreError::Serialization(_))
        ));
    }
}
