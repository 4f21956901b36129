//! Legacy RPC listener
//!
//! Raw TCP with length-delimited bincode envelopes (see [`crate::types::envelope`]).
//! Every accepted connection is served by its own task for as long as the peer
//! keeps it open; there is no connection limit. Connection tasks belong to the
//! listener and are aborted when it stops.

use super::ServiceConfig;
use crate::types::{CallRequest, CallResponse, LOG_INFO_METHOD, RESULT_FAILED, RESULT_LOGGED};
use crate::{GatewayError, Result};
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use std::io;
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tokio_util::codec::{Framed, LengthDelimitedCodec};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Accept loop for legacy RPC clients
pub struct LegacyListener {
    service: ServiceConfig,
}

impl LegacyListener {
    /// Create a listener bound to the shared service state
    pub fn new(service: ServiceConfig) -> Self {
        Self { service }
    }

    /// Accept connections until `shutdown` is cancelled, then drop every open
    /// connection. Accept errors are logged and skipped.
    pub async fn serve(self, listener: TcpListener, shutdown: CancellationToken) -> Result<()> {
        info!("Legacy RPC listener started on {}", listener.local_addr()?);
        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = listener.accept() => self.admit(accepted, &mut connections),
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
            }
        }

        debug!("Dropping {} legacy RPC connections", connections.len());
        connections.shutdown().await;
        info!("Legacy RPC listener stopped");
        Ok(())
    }

    fn admit(&self, accepted: io::Result<(TcpStream, SocketAddr)>, connections: &mut JoinSet<()>) {
        match accepted {
            Ok((stream, peer)) => {
                let service = self.service.clone();
                connections.spawn(async move {
                    debug!(%peer, "Legacy RPC connection opened");
                    if let Err(e) = Self::handle_connection(stream, service).await {
                        debug!(%peer, "Legacy RPC connection ended: {}", e);
                    }
                });
            }
            Err(e) => {
                warn!("Failed to accept legacy RPC connection: {}", e);
            }
        }
    }

    /// Answer calls on one connection until the peer closes it
    pub(crate) async fn handle_connection<S>(stream: S, service: ServiceConfig) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut framed = Framed::new(stream, LengthDelimitedCodec::new());

        while let Some(frame) = framed.next().await {
            let frame = frame?;
            let response = Self::dispatch(&service, &frame).await;
            let bytes = response
                .encode()
                .map_err(|e| GatewayError::Protocol(e.to_string()))?;
            framed.send(Bytes::from(bytes)).await?;
        }

        Ok(())
    }

    async fn dispatch(service: &ServiceConfig, frame: &[u8]) -> CallResponse {
        let request = match CallRequest::decode(frame) {
            Ok(request) => request,
            Err(e) => {
                warn!("Rejected malformed legacy RPC frame: {}", e);
                return CallResponse::err(0, "", "", e.to_string());
            }
        };

        if request.method != LOG_INFO_METHOD {
            let reason = format!("rpc: can't find method {}", request.method);
            return CallResponse::err(request.seq, request.method, "", reason);
        }

        let CallRequest {
            seq,
            method,
            payload,
        } = request;
        match service.submit(payload.into(), "legacy").await {
            Ok(()) => CallResponse::ok(seq, method, RESULT_LOGGED),
            Err(e) => CallResponse::err(seq, method, RESULT_FAILED, e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::testing::FailingStore;
    use crate::storage::MemoryStore;
    use crate::types::LogPayload;
    use std::sync::Arc;
    use tokio::io::DuplexStream;
    use tokio::time::{timeout, Duration};

    type ClientFrames = Framed<DuplexStream, LengthDelimitedCodec>;

    fn spawn_handler(
        service: ServiceConfig,
    ) -> (ClientFrames, tokio::task::JoinHandle<Result<()>>) {
        let (client, server) = tokio::io::duplex(64 * 1024);
        let handle = tokio::spawn(LegacyListener::handle_connection(server, service));
        (Framed::new(client, LengthDelimitedCodec::new()), handle)
    }

    async fn call<S>(frames: &mut Framed<S, LengthDelimitedCodec>, bytes: Vec<u8>) -> CallResponse
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        frames.send(Bytes::from(bytes)).await.unwrap();
        let frame = timeout(Duration::from_secs(2), frames.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        CallResponse::decode(&frame).unwrap()
    }

    fn log_info(seq: u64, name: &str, data: &str) -> Vec<u8> {
        CallRequest::log_info(seq, LogPayload::new(name, data))
            .encode()
            .unwrap()
    }

    #[tokio::test]
    async fn test_sequential_calls_on_one_connection() {
        let store = Arc::new(MemoryStore::new());
        let (mut frames, handle) = spawn_handler(ServiceConfig::new(store.clone()));

        for seq in 1..=3 {
            let data = format!("event {}", seq);
            let response = call(&mut frames, log_info(seq, "auth", &data)).await;
            assert_eq!(response.seq, seq);
            assert_eq!(response.method, LOG_INFO_METHOD);
            assert_eq!(response.reply, "logged");
            assert!(response.error.is_none());
        }

        drop(frames);
        let result = timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
        assert_eq!(store.len(), 3);
    }

    #[tokio::test]
    async fn test_storage_failure_reported_and_connection_survives() {
        let store = Arc::new(FailingStore::default());
        let (mut frames, _handle) = spawn_handler(ServiceConfig::new(store.clone()));

        for seq in 1..=2 {
            let response = call(&mut frames, log_info(seq, "auth", "login-ok")).await;
            assert_eq!(response.seq, seq);
            assert_eq!(response.reply, "failed");
            assert!(response.error.unwrap().contains("storage unavailable"));
        }
        assert_eq!(store.calls(), 2);
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let store = Arc::new(FailingStore::default());
        let (mut frames, _handle) = spawn_handler(ServiceConfig::new(store.clone()));

        let request = CallRequest {
            seq: 9,
            method: "LogServer.Drop".to_string(),
            payload: LogPayload::new("a", "b"),
        };
        let response = call(&mut frames, request.encode().unwrap()).await;

        assert_eq!(response.seq, 9);
        assert!(response.error.unwrap().contains("LogServer.Drop"));
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn test_malformed_frame_then_valid_call() {
        let store = Arc::new(MemoryStore::new());
        let (mut frames, _handle) = spawn_handler(ServiceConfig::new(store.clone()));

        let response = call(&mut frames, vec![0xff, 0xff, 0xff]).await;
        assert_eq!(response.seq, 0);
        assert!(response.error.is_some());
        assert!(store.is_empty());

        let response = call(&mut frames, log_info(1, "valid", "after invalid")).await;
        assert_eq!(response.reply, "logged");
        assert_eq!(store.records()[0].data, "after invalid");
    }

    #[tokio::test]
    async fn test_accept_loop_serves_overlapping_connections() {
        let store = Arc::new(MemoryStore::new());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = CancellationToken::new();
        let legacy = LegacyListener::new(ServiceConfig::new(store.clone()));
        let server = tokio::spawn(legacy.serve(listener, shutdown.clone()));

        // an idle connection must not block the next accept
        let _idle = TcpStream::connect(addr).await.unwrap();

        let stream = TcpStream::connect(addr).await.unwrap();
        let mut frames = Framed::new(stream, LengthDelimitedCodec::new());
        let response = call(&mut frames, log_info(1, "second", "connection")).await;

        assert_eq!(response.reply, "logged");
        assert_eq!(store.len(), 1);

        shutdown.cancel();
        let stopped = timeout(Duration::from_secs(2), server).await.unwrap();
        assert!(stopped.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_cancel_drops_open_connections() {
        let store = Arc::new(MemoryStore::new());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = CancellationToken::new();
        let legacy = LegacyListener::new(ServiceConfig::new(store.clone()));
        let server = tokio::spawn(legacy.serve(listener, shutdown.clone()));

        let stream = TcpStream::connect(addr).await.unwrap();
        let mut frames = Framed::new(stream, LengthDelimitedCodec::new());
        let response = call(&mut frames, log_info(1, "before", "cancel")).await;
        assert_eq!(response.reply, "logged");

        shutdown.cancel();
        timeout(Duration::from_secs(2), server)
            .await
            .unwrap()
            .unwrap()
            .unwrap();

        // the connection task is gone, so the peer sees the socket close
        let request = Bytes::from(log_info(2, "after", "cancel"));
        let _ = frames.send(request).await;
        let next = timeout(Duration::from_secs(2), frames.next())
            .await
            .unwrap();
        assert!(!matches!(next, Some(Ok(_))));
        assert_eq!(store.len(), 1);
        assert!(TcpStream::connect(addr).await.is_err());
    }

    #[tokio::test]
    async fn test_accept_error_is_skipped() {
        let store = Arc::new(MemoryStore::new());
        let legacy = LegacyListener::new(ServiceConfig::new(store.clone()));
        let mut connections = JoinSet::new();

        let refused = io::Error::new(io::ErrorKind::Other, "too many open files");
        legacy.admit(Err(refused), &mut connections);
        assert!(connections.is_empty());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let client = TcpStream::connect(listener.local_addr().unwrap());
        let (client, accepted) = tokio::join!(client, listener.accept());
        legacy.admit(accepted, &mut connections);
        assert_eq!(connections.len(), 1);

        let mut frames = Framed::new(client.unwrap(), LengthDelimitedCodec::new());
        let response = call(&mut frames, log_info(1, "after", "accept error")).await;
        assert_eq!(response.reply, "logged");
        assert_eq!(store.len(), 1);
    }
}
