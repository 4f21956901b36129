//! # loggate - Multi-Protocol Log Ingestion Gateway
//!
//! loggate accepts structured log records (`{name, data}`) over three independent
//! wire protocols and forwards every record to a single shared store.
//!
//! ## Listeners
//!
//! - **HTTP**: `POST /log` with a JSON body
//! - **gRPC**: `logs.LogService/WriteLog`
//! - **Legacy RPC**: length-delimited bincode call/response frames over raw TCP
//!
//! Storage is reached only through the [`storage::PersistenceGateway`] capability,
//! which is connected before any listener accepts traffic and closed within a
//! bounded time at shutdown.
//!
//! ## Quick Start
//!
//! ### Server
//! ```no_run
//! use loggate::config::GatewayConfig;
//! use loggate::server::LogServer;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GatewayConfig::load("config/gateway.toml")?;
//!     let server = LogServer::new(config)?.start().await?;
//!     server.serve_until(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     }).await?;
//!     Ok(())
//! }
//! ```
//!
//! ### Legacy client
//! ```no_run
//! use loggate::client::LegacyClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = LegacyClient::connect("127.0.0.1:5001").await?;
//!     let reply = client.log_info("auth", "login-ok").await?;
//!     assert_eq!(reply, "logged");
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod proto;
pub mod server;
pub mod storage;
pub mod types;

/// Common error types used throughout loggate
pub mod error {
    use crate::storage::StorageError;
    use thiserror::Error;

    /// Gateway error types
    #[derive(Debug, Error)]
    pub enum GatewayError {
        /// I/O operation failed
        #[error("I/O error: {0}")]
        Io(#[from] std::io::Error),

        /// Configuration error
        #[error("Configuration error: {0}")]
        Config(String),

        /// Storage collaborator error
        #[error("Storage error: {0}")]
        Storage(#[from] StorageError),

        /// A listener could not bind its port
        #[error("Failed to bind {listener} listener on {addr}: {source}")]
        Bind {
            /// Which listener failed
            listener: &'static str,
            /// Address it tried to bind
            addr: String,
            /// Underlying socket error
            #[source]
            source: std::io::Error,
        },

        /// Storage did not connect within the configured bound
        #[error("Storage connect timed out after {0:?}")]
        ConnectTimeout(std::time::Duration),

        /// Storage did not close within the configured bound
        #[error("Storage shutdown timed out after {0:?}")]
        ShutdownTimeout(std::time::Duration),

        /// A running listener stopped
        #[error("Listener error: {0}")]
        Listener(String),

        /// gRPC transport error
        #[error("Transport error: {0}")]
        Transport(#[from] tonic::transport::Error),

        /// Wire encoding or decoding failed
        #[error("Protocol error: {0}")]
        Protocol(String),

        /// The remote side answered with an error
        #[error("Remote error: {0}")]
        Remote(String),
    }

    impl GatewayError {
        pub(crate) fn bind(listener: &'static str, addr: String, source: std::io::Error) -> Self {
            GatewayError::Bind {
                listener,
                addr,
                source,
            }
        }
    }

    impl From<::config::ConfigError> for GatewayError {
        fn from(err: ::config::ConfigError) -> Self {
            GatewayError::Config(err.to_string())
        }
    }

    /// Result type alias for gateway operations
    pub type Result<T> = std::result::Result<T, GatewayError>;
}

pub use error::{GatewayError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::client::{LegacyClient, LogServiceClient};
    pub use crate::config::{ClientConfig, GatewayConfig};
    pub use crate::server::{LifecycleState, LogServer, RunningServer, ServiceConfig};
    pub use crate::storage::{PersistenceGateway, StorageError};
    pub use crate::types::{LogPayload, LogRecord, StoredRecord};
    pub use crate::{GatewayError, Result};
}
