//! Persistence gateway: the only way listeners reach storage.
//!
//! Every listener holds the same `Arc<dyn PersistenceGateway>` (through
//! [`crate::server::ServiceConfig`]) and calls [`PersistenceGateway::insert`]
//! once per well-formed request. Implementations must tolerate concurrent
//! callers without outside locking.

pub mod file;
pub mod memory;
#[cfg(feature = "mongo")]
pub mod mongo;

use crate::config::{StorageBackendKind, StorageSettings};
use crate::types::LogRecord;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

pub use file::FileStore;
pub use memory::MemoryStore;
#[cfg(feature = "mongo")]
pub use mongo::MongoStore;

/// Storage collaborator errors. Listeners treat all of them as opaque.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Could not establish the storage connection
    #[error("connect failed: {0}")]
    Connect(String),
    /// The store rejected or failed a write
    #[error("write failed: {0}")]
    Write(String),
    /// Releasing the connection failed
    #[error("close failed: {0}")]
    Close(String),
    /// Record could not be serialized
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    /// I/O failure
    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Write capability of the storage collaborator
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Accept one record for write
    async fn insert(&self, record: LogRecord) -> StorageResult<()>;

    /// Release the underlying connection
    async fn close(&self) -> StorageResult<()> {
        Ok(())
    }

    /// Short adapter label used in logs
    fn name(&self) -> &'static str;
}

/// Connect the adapter selected by `settings`.
///
/// The caller is responsible for bounding this with a timeout.
pub async fn connect(settings: &StorageSettings) -> StorageResult<Arc<dyn PersistenceGateway>> {
    match settings.backend {
        StorageBackendKind::File => {
            let store = FileStore::open(&settings.output_directory, &settings.collection).await?;
            Ok(Arc::new(store))
        }
        StorageBackendKind::Memory => Ok(Arc::new(MemoryStore::new())),
        #[cfg(feature = "mongo")]
        StorageBackendKind::Mongo => Ok(Arc::new(MongoStore::connect(settings).await?)),
        #[cfg(not(feature = "mongo"))]
        StorageBackendKind::Mongo => Err(StorageError::Connect(
            "mongo backend requires the `mongo` feature".to_string(),
        )),
    }
}
