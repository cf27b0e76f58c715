use std::{io::ErrorKind, path::PathBuf, sync::Arc};

use futures::future::BoxFuture;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::dao::{
    models::HistoryEntryEntity,
    storage::{StorageError, StorageResult},
};

/// Most entries a history keeps; older ones are dropped.
pub const HISTORY_LIMIT: usize = 100;

/// Receives every committed draw and every absence correction.
pub trait HistoryStore: Send + Sync {
    /// Prepend `entry`, trimming the history to [`HISTORY_LIMIT`].
    fn record(&self, entry: HistoryEntryEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Entries, newest first.
    fn list(&self) -> BoxFuture<'static, StorageResult<Vec<HistoryEntryEntity>>>;
    /// Verify the store can be read.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}

/// History kept in memory for the lifetime of the process.
#[derive(Debug, Default, Clone)]
pub struct MemoryHistoryStore {
    entries: Arc<Mutex<Vec<HistoryEntryEntity>>>,
}

impl MemoryHistoryStore {
    /// Empty history.
    pub fn new() -> Self {
        Self::default()
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn record(&self, entry: HistoryEntryEntity) -> BoxFuture<'static, StorageResult<()>> {
        let entries = Arc::clone(&self.entries);
        Box::pin(async move {
            let mut entries = entries.lock().await;
            entries.insert(0, entry);
            entries.truncate(HISTORY_LIMIT);
            Ok(())
        })
    }

    fn list(&self) -> BoxFuture<'static, StorageResult<Vec<HistoryEntryEntity>>> {
        let entries = Arc::clone(&self.entries);
        Box::pin(async move { Ok(entries.lock().await.clone()) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

/// History persisted as a JSON array in a single file.
#[derive(Debug, Clone)]
pub struct JsonFileHistoryStore {
    path: Arc<PathBuf>,
    // serialises read-modify-write cycles
    write_lock: Arc<Mutex<()>>,
}

impl JsonFileHistoryStore {
    /// Store backed by `path`; the file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        info!(path = %path.display(), "using JSON file history store");
        Self {
            path: Arc::new(path),
            write_lock: Arc::new(Mutex::new(())),
        }
    }
}

async fn read_entries(path: &PathBuf) -> StorageResult<Vec<HistoryEntryEntity>> {
    let contents = match tokio::fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => {
            return Err(StorageError::unavailable(
                format!("failed to read history file {}", path.display()),
                err,
            ));
        }
    };
    if contents.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(&contents).map_err(|err| {
        StorageError::corrupted(format!("invalid history file {}", path.display()), err)
    })
}

async fn write_entries(path: &PathBuf, entries: &[HistoryEntryEntity]) -> StorageResult<()> {
    let encoded = serde_json::to_vec_pretty(entries)
        .map_err(|err| StorageError::corrupted("failed to encode history".into(), err))?;

    if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(|err| {
            StorageError::unavailable(format!("failed to create {}", parent.display()), err)
        })?;
    }

    let staging = path.with_extension("json.tmp");
    tokio::fs::write(&staging, encoded).await.map_err(|err| {
        StorageError::unavailable(format!("failed to write {}", staging.display()), err)
    })?;
    tokio::fs::rename(&staging, path).await.map_err(|err| {
        StorageError::unavailable(format!("failed to replace {}", path.display()), err)
    })
}

impl HistoryStore for JsonFileHistoryStore {
    fn record(&self, entry: HistoryEntryEntity) -> BoxFuture<'static, StorageResult<()>> {
        let path = Arc::clone(&self.path);
        let write_lock = Arc::clone(&self.write_lock);
        Box::pin(async move {
            let _guard = write_lock.lock().await;
            let mut entries = read_entries(&path).await?;
            entries.insert(0, entry);
            entries.truncate(HISTORY_LIMIT);
            write_entries(&path, &entries).await?;
            debug!(path = %path.display(), count = entries.len(), "history entry recorded");
            Ok(())
        })
    }

    fn list(&self) -> BoxFuture<'static, StorageResult<Vec<HistoryEntryEntity>>> {
        let path = Arc::clone(&self.path);
        let write_lock = Arc::clone(&self.write_lock);
        Box::pin(async move {
            let _guard = write_lock.lock().await;
            read_entries(&path).await
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let list = self.list();
        Box::pin(async move { list.await.map(|_| ()) })
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::dao::models::DrawOutcomeEntity;

    fn entry(index: usize) -> HistoryEntryEntity {
        HistoryEntryEntity::now(
            format!("prize {index}"),
            (index % 8) as u8 + 1,
            format!("winner {index}"),
            DrawOutcomeEntity::Won,
        )
    }

    #[tokio::test]
    async fn memory_store_keeps_newest_first_and_caps() {
        let store = MemoryHistoryStore::new();
        for index in 0..(HISTORY_LIMIT + 5) {
            store.record(entry(index)).await.unwrap();
        }

        let entries = store.list().await.unwrap();
        assert_eq!(entries.len(), HISTORY_LIMIT);
        assert_eq!(entries[0].prize, format!("prize {}", HISTORY_LIMIT + 4));
        assert_eq!(entries.last().unwrap().prize, "prize 5");
    }

    #[tokio::test]
    async fn json_store_round_trips_through_disk() {
        let dir = std::env::temp_dir().join(format!("raffle-history-{}", Uuid::new_v4()));
        let path = dir.join("history.json");
        let store = JsonFileHistoryStore::new(&path);

        assert!(store.list().await.unwrap().is_empty());
        store.record(entry(1)).await.unwrap();
        let mut absent = entry(2);
        absent.outcome = DrawOutcomeEntity::Absent;
        store.record(absent.clone()).await.unwrap();

        let reopened = JsonFileHistoryStore::new(&path);
        let entries = reopened.list().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], absent);
        assert_eq!(entries[1].winner, "winner 1");
        reopened.health_check().await.unwrap();

        let _ = tokio::fs::remove_dir_all(dir).await;
    }

    #[tokio::test]
    async fn corrupted_file_is_reported() {
        let path = std::env::temp_dir().join(format!("raffle-history-{}.json", Uuid::new_v4()));
        tokio::fs::write(&path, "{not json").await.unwrap();

        let store = JsonFileHistoryStore::new(&path);
        assert!(matches!(
            store.list().await,
            Err(StorageError::Corrupted { .. })
        ));

        let _ = tokio::fs::remove_file(path).await;
    }
}
