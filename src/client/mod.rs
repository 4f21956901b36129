//! Clients for the gateway's RPC listeners

pub mod legacy;

pub use crate::proto::log_service_client::LogServiceClient;
pub use legacy::LegacyClient;
