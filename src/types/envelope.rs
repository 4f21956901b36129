//! Call/response envelope of the legacy RPC listener.
//!
//! Each frame on the wire is a 4-byte big-endian length prefix followed by a
//! bincode-encoded envelope:
//! ```text
//! request:  CallRequest  { seq, method, payload: {name, data} }
//! response: CallResponse { seq, method, error, reply }
//! ```
//! Calls on one connection are answered in order; `seq` echoes the request.

use super::LogPayload;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The only method registered on the legacy listener
pub const LOG_INFO_METHOD: &str = "LogServer.LogInfo";

/// Envelope encoding errors
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// Encoding failed
    #[error("failed to encode envelope: {0}")]
    Encode(String),
    /// Frame did not contain a valid envelope
    #[error("malformed envelope: {0}")]
    Decode(String),
}

/// A legacy RPC call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRequest {
    /// Client-chosen sequence number, echoed in the response
    pub seq: u64,
    /// Registered method name, e.g. `LogServer.LogInfo`
    pub method: String,
    /// Record to submit
    pub payload: LogPayload,
}

/// Reply to a legacy RPC call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallResponse {
    /// Sequence number of the request, 0 when the request was undecodable
    pub seq: u64,
    /// Method that was called
    pub method: String,
    /// Failure reason, if any
    pub error: Option<String>,
    /// Method result
    pub reply: String,
}

impl CallRequest {
    /// Build a `LogServer.LogInfo` call
    pub fn log_info(seq: u64, payload: LogPayload) -> Self {
        Self {
            seq,
            method: LOG_INFO_METHOD.to_string(),
            payload,
        }
    }

    /// Serialize to binary wire format
    pub fn encode(&self) -> Result<Vec<u8>, EnvelopeError> {
        encode(self)
    }

    /// Deserialize from binary wire format
    pub fn decode(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        decode(bytes)
    }
}

impl CallResponse {
    /// Successful call
    pub fn ok(seq: u64, method: impl Into<String>, reply: impl Into<String>) -> Self {
        Self {
            seq,
            method: method.into(),
            error: None,
            reply: reply.into(),
        }
    }

    /// Failed call
    pub fn err(
        seq: u64,
        method: impl Into<String>,
        reply: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            seq,
            method: method.into(),
            error: Some(error.into()),
            reply: reply.into(),
        }
    }

    /// Serialize to binary wire format
    pub fn encode(&self) -> Result<Vec<u8>, EnvelopeError> {
        encode(self)
    }

    /// Deserialize from binary wire format
    pub fn decode(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        decode(bytes)
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, EnvelopeError> {
    bincode::serde::encode_to_vec(value, bincode::config::standard())
        .map_err(|e| EnvelopeError::Encode(e.to_string()))
}

fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, EnvelopeError> {
    let (value, _) = bincode::serde::decode_from_slice(bytes, bincode::config::standard())
        .map_err(|e| EnvelopeError::Decode(e.to_string()))?;
    Ok(value)
}
