//! In-process store

use super::{PersistenceGateway, StorageResult};
use crate::types::{LogRecord, StoredRecord};
use async_trait::async_trait;
use parking_lot::Mutex;

/// Keeps every inserted record in memory
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Vec<StoredRecord>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of stored records in insert order
    pub fn records(&self) -> Vec<StoredRecord> {
        self.records.lock().clone()
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Whether nothing has been stored
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

#[async_trait]
impl PersistenceGateway for MemoryStore {
    async fn insert(&self, record: LogRecord) -> StorageResult<()> {
        self.records.lock().push(StoredRecord::stamp(record));
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
