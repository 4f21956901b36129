//! Data model shared by the listeners and the storage adapters

pub mod envelope;
pub mod log_record;

pub use envelope::{CallRequest, CallResponse, EnvelopeError, LOG_INFO_METHOD};
pub use log_record::{LogPayload, LogRecord, LogReply, StoredRecord, RESULT_FAILED, RESULT_LOGGED};
