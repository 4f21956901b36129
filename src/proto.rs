//! Wire types and generated glue for the `logs.LogService` gRPC service.
//!
//! Equivalent schema:
//! ```text
//! package logs;
//!
//! message Log { string name = 1; string data = 2; }
//! message LogRequest { Log logEntry = 1; }
//! message LogResponse { string result = 1; }
//!
//! service LogService {
//!     rpc WriteLog(LogRequest) returns (LogResponse);
//! }
//! ```
#![allow(missing_docs)]

use crate::types::LogRecord;

#[derive(Clone, PartialEq, prost::Message)]
pub struct Log {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub data: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct LogRequest {
    #[prost(message, optional, tag = "1")]
    pub log_entry: Option<Log>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct LogResponse {
    #[prost(string, tag = "1")]
    pub result: String,
}

impl From<Log> for LogRecord {
    fn from(log: Log) -> Self {
        LogRecord::new(log.name, log.data)
    }
}

impl LogRequest {
    /// Build a request carrying one entry
    pub fn new(name: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            log_entry: Some(Log {
                name: name.into(),
                data: data.into(),
            }),
        }
    }
}

include!(concat!(env!("OUT_DIR"), "/logs.LogService.rs"));
