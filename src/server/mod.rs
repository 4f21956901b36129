//! loggate server implementation

pub mod http;
pub mod legacy;
pub mod lifecycle;
pub mod rpc;

use crate::storage::{PersistenceGateway, StorageResult};
use crate::types::LogRecord;
use std::sync::Arc;
use tracing::{debug, error};

pub use http::HttpListener;
pub use legacy::LegacyListener;
pub use lifecycle::{shutdown_signal, LifecycleState, LogServer, RunningServer, StateHandle};
pub use rpc::RpcListener;

/// Process-wide service state handed to every listener.
///
/// Built once after storage connects and never mutated afterwards, so clones
/// share the gateway without locking.
#[derive(Clone)]
pub struct ServiceConfig {
    gateway: Arc<dyn PersistenceGateway>,
}

impl ServiceConfig {
    /// Wrap a connected gateway
    pub fn new(gateway: Arc<dyn PersistenceGateway>) -> Self {
        Self { gateway }
    }

    /// The shared persistence gateway
    pub fn gateway(&self) -> &Arc<dyn PersistenceGateway> {
        &self.gateway
    }

    /// Hand one record to storage. Failures are logged and returned, never retried.
    pub async fn submit(&self, record: LogRecord, protocol: &'static str) -> StorageResult<()> {
        debug!(protocol, %record, "Submitting log record");
        let result = self.gateway.insert(record).await;
        if let Err(e) = &result {
            error!(protocol, "Failed to store log record: {}", e);
        }
        result
    }
}


#[cfg(test)]
mod tests {
    use super::testing::FailingStore;
    use super::*;
    use crate::storage::MemoryStore;

    #[tokio::test]
    async fn test_clones_share_one_gateway() {
        let store = Arc::new(MemoryStore::new());
        let service = ServiceConfig::new(store.clone());
        let other = service.clone();

        let first = LogRecord::new("a", "1");
        let second = LogRecord::new("b", "2");
        service.submit(first, "test").await.unwrap();
        other.submit(second, "test").await.unwrap();

        assert_eq!(store.len(), 2);
        assert!(Arc::ptr_eq(service.gateway(), other.gateway()));
    }

    #[tokio::test]
    async fn test_submit_returns_storage_error() {
        let store = Arc::new(FailingStore::default());
        let service = ServiceConfig::new(store.clone());

        let result = service.submit(LogRecord::new("a", "1"), "test").await;
        assert!(result.is_err());
        assert_eq!(store.calls(), 1);
    }
}
