//! Client for the legacy RPC listener

use crate::config::ClientConfig;
use crate::types::{CallRequest, CallResponse, LogPayload, LOG_INFO_METHOD};
use crate::{GatewayError, Result};
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::{timeout, Duration};
use tokio_util::codec::{Framed, LengthDelimitedCodec};

/// Issues sequential calls over one legacy RPC connection
#[derive(Clone)]
pub struct LegacyClient {
    connection: Arc<Mutex<Option<Framed<TcpStream, LengthDelimitedCodec>>>>,
    next_seq: Arc<AtomicU64>,
}

impl LegacyClient {
    /// Connect to a legacy listener with default settings
    pub async fn connect(addr: &str) -> Result<Self> {
        let config = ClientConfig {
            legacy_addr: addr.to_string(),
            ..Default::default()
        };
        Self::with_config(config).await
    }

    /// Connect with custom configuration
    pub async fn with_config(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let stream = timeout(
            Duration::from_secs(config.timeout_seconds),
            TcpStream::connect(&config.legacy_addr),
        )
        .await
        .map_err(|_| GatewayError::Remote("Connection timeout".to_string()))??;

        Ok(Self {
            connection: Arc::new(Mutex::new(Some(Framed::new(
                stream,
                LengthDelimitedCodec::new(),
            )))),
            next_seq: Arc::new(AtomicU64::new(1)),
        })
    }

    /// Send one call and wait for its response
    pub async fn call(&self, method: &str, payload: LogPayload) -> Result<CallResponse> {
        let request = CallRequest {
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            method: method.to_string(),
            payload,
        };
        let bytes = request
            .encode()
            .map_err(|e| GatewayError::Protocol(e.to_string()))?;

        let mut guard = self.connection.lock().await;
        let framed = guard
            .as_mut()
            .ok_or_else(|| GatewayError::Remote("Connection closed".to_string()))?;

        framed.send(Bytes::from(bytes)).await?;
        let frame = framed
            .next()
            .await
            .ok_or_else(|| GatewayError::Remote("Connection closed by server".to_string()))??;

        let response =
            CallResponse::decode(&frame).map_err(|e| GatewayError::Protocol(e.to_string()))?;
        if response.seq != request.seq {
            return Err(GatewayError::Protocol(format!(
                "Response seq {} does not match request seq {}",
                response.seq, request.seq
            )));
        }
        Ok(response)
    }

    /// Submit a record through `LogServer.LogInfo` and return the result string
    pub async fn log_info(&self, name: &str, data: &str) -> Result<String> {
        let response = self
            .call(LOG_INFO_METHOD, LogPayload::new(name, data))
            .await?;
        match response.error {
            Some(reason) => Err(GatewayError::Remote(reason)),
            None => Ok(response.reply),
        }
    }

    /// Close the connection to the server
    pub async fn close(&self) -> Result<()> {
        let mut guard = self.connection.lock().await;
        if let Some(mut framed) = guard.take() {
            SinkExt::<Bytes>::close(&mut framed).await?;
        }
        Ok(())
    }
}
