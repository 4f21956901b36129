//! Configuration management for loggate

pub mod settings;

pub use settings::{
    ClientConfig, GatewayConfig, ListenerSettings, StorageBackendKind, StorageSettings, ENV_PREFIX,
};
