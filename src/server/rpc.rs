//! gRPC listener for `logs.LogService`

use super::ServiceConfig;
use crate::proto::log_service_server::{LogService, LogServiceServer};
use crate::proto::{LogRequest, LogResponse};
use crate::types::{LogRecord, RESULT_FAILED, RESULT_LOGGED};
use crate::Result;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::metadata::MetadataValue;
use tonic::transport::Server;
use tokio_util::sync::CancellationToken;
use tonic::{Request, Response, Status};
use tracing::info;

/// Metadata key carrying the result string on failed calls
pub const RESULT_METADATA_KEY: &str = "x-log-result";

/// Handler for every operation declared by `LogService`
pub struct RpcListener {
    service: ServiceConfig,
}

impl RpcListener {
    /// Create a handler bound to the shared service state
    pub fn new(service: ServiceConfig) -> Self {
        Self { service }
    }

    /// Serve calls on an already bound socket until `shutdown` is cancelled
    pub async fn serve(self, listener: TcpListener, shutdown: CancellationToken) -> Result<()> {
        info!("gRPC listener started on {}", listener.local_addr()?);
        Server::builder()
            .add_service(LogServiceServer::new(self))
            .serve_with_incoming_shutdown(
                TcpListenerStream::new(listener),
                shutdown.cancelled_owned(),
            )
            .await?;
        info!("gRPC listener stopped");
        Ok(())
    }
}

#[tonic::async_trait]
impl LogService for RpcListener {
    async fn write_log(
        &self,
        request: Request<LogRequest>,
    ) -> std::result::Result<Response<LogResponse>, Status> {
        let entry = request
            .into_inner()
            .log_entry
            .ok_or_else(|| Status::invalid_argument("log entry is required"))?;

        match self.service.submit(LogRecord::from(entry), "rpc").await {
            Ok(()) => Ok(Response::new(LogResponse {
                result: RESULT_LOGGED.to_string(),
            })),
            Err(e) => {
                let mut status = Status::internal(e.to_string());
                let failed = MetadataValue::from_static(RESULT_FAILED);
                status.metadata_mut().insert(RESULT_METADATA_KEY, failed);
                Err(status)
            }
        }
    }
}
