//! Log record types and utilities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Result string returned to callers when a record was accepted for write
pub const RESULT_LOGGED: &str = "logged";

/// Result string returned to callers when the store rejected a record
pub const RESULT_FAILED: &str = "failed";

/// The canonical unit of submitted log data.
///
/// Built by a listener from a decoded request and moved into the
/// persistence gateway on insert. Fields cannot be changed after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    name: String,
    data: String,
}

impl LogRecord {
    /// Create a new record
    pub fn new(name: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    /// Category or tag of the record
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Free-form payload
    pub fn data(&self) -> &str {
        &self.data
    }

    /// Split the record into `(name, data)`
    pub fn into_parts(self) -> (String, String) {
        (self.name, self.data)
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.data)
    }
}

/// `{name, data}` as it travels over JSON and the legacy envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogPayload {
    /// Category or tag
    pub name: String,
    /// Free-form payload
    pub data: String,
}

impl LogPayload {
    /// Create a new payload
    pub fn new(name: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }
}

impl From<LogPayload> for LogRecord {
    fn from(payload: LogPayload) -> Self {
        LogRecord::new(payload.name, payload.data)
    }
}

/// JSON reply body of the HTTP listener
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogReply {
    /// `"logged"` or `"failed"`
    pub result: String,
    /// Reason for a failure, absent on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LogReply {
    /// Successful reply
    pub fn logged() -> Self {
        Self {
            result: RESULT_LOGGED.to_string(),
            error: None,
        }
    }

    /// Failure reply carrying the reason
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            result: RESULT_FAILED.to_string(),
            error: Some(reason.into()),
        }
    }
}

/// A record as the bundled storage adapters persist it.
///
/// Identity and timestamps are assigned by the storage layer at insert time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    /// Identifier assigned on insert
    pub id: Uuid,
    /// Category or tag
    pub name: String,
    /// Free-form payload
    pub data: String,
    /// Insert time
    pub created_at: DateTime<Utc>,
    /// Last update time, equal to `created_at` for fresh records
    pub updated_at: DateTime<Utc>,
}

impl StoredRecord {
    /// Stamp a record for storage
    pub fn stamp(record: LogRecord) -> Self {
        let now = Utc::now();
        let (name, data) = record.into_parts();
        Self {
            id: Uuid::new_v4(),
            name,
            data,
            created_at: now,
            updated_at: now,
        }
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
