//! Configuration structures for loggate

use crate::{GatewayError, Result};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "LOGGATE";

/// Gateway configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Listener settings
    pub server: ListenerSettings,
    /// Storage configuration
    pub storage: StorageSettings,
}

/// Listener ports and bind host
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenerSettings {
    /// Host all three listeners bind to
    pub host: String,
    /// JSON/HTTP port
    pub http_port: u16,
    /// gRPC port
    pub rpc_port: u16,
    /// Legacy RPC port
    pub legacy_port: u16,
}

/// Storage backend selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackendKind {
    /// JSON lines on the local filesystem
    File,
    /// Process memory, lost on exit
    Memory,
    /// MongoDB (requires the `mongo` feature)
    Mongo,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Which adapter to connect
    pub backend: StorageBackendKind,
    /// Connection string for network stores
    pub uri: String,
    /// Credential user name
    pub username: String,
    /// Credential password
    pub password: String,
    /// Database name
    pub database: String,
    /// Collection (or file stem) records are written to
    pub collection: String,
    /// Directory for the file adapter
    pub output_directory: PathBuf,
    /// Bound on both storage connect and storage shutdown, in seconds
    pub timeout_seconds: u64,
}

/// Legacy RPC client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Address of the legacy listener
    pub legacy_addr: String,
    /// Connection timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for ListenerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            http_port: 80,
            rpc_port: 50001,
            legacy_port: 5001,
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: StorageBackendKind::File,
            uri: "mongodb://mongo:27017".to_string(),
            username: "admin".to_string(),
            password: "password".to_string(),
            database: "logs".to_string(),
            collection: "logs".to_string(),
            output_directory: PathBuf::from("/var/log/loggate"),
            timeout_seconds: 15,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            legacy_addr: "127.0.0.1:5001".to_string(),
            timeout_seconds: 5,
        }
    }
}

impl ListenerSettings {
    /// `host:port` for one listener. Hostnames are resolved when the listener binds.
    pub fn endpoint(&self, port: u16) -> String {
        match self.host.parse::<IpAddr>() {
            Ok(ip) => SocketAddr::new(ip, port).to_string(),
            Err(_) => format!("{}:{}", self.host, port),
        }
    }

    /// HTTP listener address
    pub fn http_addr(&self) -> String {
        self.endpoint(self.http_port)
    }

    /// gRPC listener address
    pub fn rpc_addr(&self) -> String {
        self.endpoint(self.rpc_port)
    }

    /// Legacy RPC listener address
    pub fn legacy_addr(&self) -> String {
        self.endpoint(self.legacy_port)
    }
}

fn is_hostname(host: &str) -> bool {
    host.split('.').all(is_host_label)
}

fn is_host_label(label: &str) -> bool {
    !label.is_empty() && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

impl StorageSettings {
    /// Connect/disconnect bound
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl GatewayConfig {
    /// Load configuration from defaults, an optional file, and `LOGGATE__*` env vars.
    ///
    /// The file format is inferred from its extension. A missing file is not an error.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config: GatewayConfig = ::config::Config::builder()
            .add_source(::config::Config::try_from(&GatewayConfig::default())?)
            .add_source(::config::File::from(path.as_ref()).required(false))
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let host = &self.server.host;
        if host.is_empty() {
            return Err(GatewayError::Config("Listener host cannot be empty".to_string()));
        }
        if host.parse::<IpAddr>().is_err() && !is_hostname(host) {
            return Err(GatewayError::Config(format!(
                "Listener host is neither an IP address nor a hostname: {}",
                host
            )));
        }

        let ports = [
            ("http", self.server.http_port),
            ("rpc", self.server.rpc_port),
            ("legacy", self.server.legacy_port),
        ];
        for (i, (name, port)) in ports.iter().enumerate() {
            if *port == 0 {
                continue;
            }
            if let Some((other, _)) = ports[i + 1..].iter().find(|(_, p)| p == port) {
                return Err(GatewayError::Config(format!(
                    "{} and {} listeners share port {}",
                    name, other, port
                )));
            }
        }

        if self.storage.collection.is_empty() {
            return Err(GatewayError::Config("Storage collection cannot be empty".to_string()));
        }
        if self.storage.timeout_seconds == 0 {
            return Err(GatewayError::Config("Storage timeout must be positive".to_string()));
        }
        Ok(())
    }
}

impl ClientConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.legacy_addr.is_empty() {
            return Err(GatewayError::Config("Legacy address cannot be empty".to_string()));
        }
        if self.timeout_seconds == 0 {
            return Err(GatewayError::Config("Client timeout must be positive".to_string()));
        }
        Ok(())
    }
}
