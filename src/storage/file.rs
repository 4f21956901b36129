//! JSON-lines file store

use super::{PersistenceGateway, StorageError, StorageResult};
use crate::types::{LogRecord, StoredRecord};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::Mutex;

/// Appends one JSON document per record to `<dir>/<collection>.jsonl`
pub struct FileStore {
    path: PathBuf,
    writer: Mutex<Option<BufWriter<tokio::fs::File>>>,
}

impl FileStore {
    /// Open (creating if needed) the collection file
    pub async fn open(output_directory: &Path, collection: &str) -> StorageResult<Self> {
        tokio::fs::create_dir_all(output_directory)
            .await
            .map_err(|e| StorageError::Connect(format!("{}: {}", output_directory.display(), e)))?;

        let path = output_directory.join(format!("{}.jsonl", collection));
        let writer = Self::create_file_writer(&path)
            .await
            .map_err(|e| StorageError::Connect(format!("{}: {}", path.display(), e)))?;

        Ok(Self {
            path,
            writer: Mutex::new(Some(writer)),
        })
    }

    /// Path of the collection file
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn create_file_writer(file_path: &Path) -> std::io::Result<BufWriter<tokio::fs::File>> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(file_path)
            .await?;
        Ok(BufWriter::new(file))
    }
}

#[async_trait]
impl PersistenceGateway for FileStore {
    async fn insert(&self, record: LogRecord) -> StorageResult<()> {
        let line = StoredRecord::stamp(record).to_json()?;

        let mut guard = self.writer.lock().await;
        let writer = guard
            .as_mut()
            .ok_or_else(|| StorageError::Write("store is closed".to_string()))?;
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        Ok(())
    }

    async fn close(&self) -> StorageResult<()> {
        if let Some(mut writer) = self.writer.lock().await.take() {
            writer
                .shutdown()
                .await
                .map_err(|e| StorageError::Close(e.to_string()))?;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::tempdir;

    async fn read_records(store: &FileStore) -> Vec<StoredRecord> {
        let content = tokio::fs::read_to_string(store.path()).await.unwrap();
        content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_insert_appends_json_line() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path(), "logs").await.unwrap();

        store
            .insert(LogRecord::new("auth", "login-ok"))
            .await
            .unwrap();
        store
            .insert(LogRecord::new("auth", "logout"))
            .await
            .unwrap();

        assert_eq!(store.path(), dir.path().join("logs.jsonl"));
        let records = read_records(&store).await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "auth");
        assert_eq!(records[0].data, "login-ok");
        assert_eq!(records[1].data, "logout");
        assert_ne!(records[0].id, records[1].id);
    }

    #[tokio::test]
    async fn test_reopen_appends() {
        let dir = tempdir().unwrap();
        {
            let store = FileStore::open(dir.path(), "logs").await.unwrap();
            store.insert(LogRecord::new("a", "1")).await.unwrap();
            store.close().await.unwrap();
        }
        let store = FileStore::open(dir.path(), "logs").await.unwrap();
        store.insert(LogRecord::new("a", "2")).await.unwrap();

        assert_eq!(read_records(&store).await.len(), 2);
    }

    #[tokio::test]
    async fn test_insert_after_close_fails() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path(), "logs").await.unwrap();
        store.close().await.unwrap();

        let result = store.insert(LogRecord::new("late", "write")).await;
        assert!(matches!(result, Err(StorageError::Write(_))));
        // closing twice is harmless
        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_inserts_do_not_interleave() {
        let dir = tempdir().unwrap();
        let store = Arc::new(FileStore::open(dir.path(), "logs").await.unwrap());

        let mut handles = vec![];
        for i in 0..20 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .insert(LogRecord::new("worker", format!("message {}", i)))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let mut data: Vec<String> = read_records(&store)
            .await
            .into_iter()
            .map(|r| r.data)
            .collect();
        data.sort();
        let mut expected: Vec<String> = (0..20).map(|i| format!("message {}", i)).collect();
        expected.sort();
        assert_eq!(data, expected);
    }
}
