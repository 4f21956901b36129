//! Startup and shutdown sequencing.
//!
//! ```text
//! Unstarted -> ConnectingStorage -> Ready -> Degraded | ShuttingDown -> Stopped
//! ```
//! Storage connects before any listener binds. A connect failure or a bind
//! failure stops startup with an error. Once running, the first listener exit
//! (`Degraded`) or the shutdown signal (`ShuttingDown`) cancels every listener.
//! Legacy connections are dropped at once; HTTP and gRPC connections close
//! after their current request. Listeners still running after the storage
//! bound are aborted. Storage is closed last, within the same bound used for
//! connecting, so nothing is accepted once the state reads `Stopped`.

use super::{HttpListener, LegacyListener, RpcListener, ServiceConfig};
use crate::config::{GatewayConfig, ListenerSettings};
use crate::storage::{self, PersistenceGateway, StorageResult};
use crate::{GatewayError, Result};
use parking_lot::Mutex;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::{JoinError, JoinSet};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Where the process is in its single-shot lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Nothing has happened yet
    Unstarted,
    /// Waiting for the storage connection
    ConnectingStorage,
    /// Storage connected, listeners bound
    Ready,
    /// A listener stopped unexpectedly
    Degraded,
    /// Shutdown signal received
    ShuttingDown,
    /// Storage released; terminal
    Stopped,
}

/// Shared, observable lifecycle state
#[derive(Debug, Clone)]
pub struct StateHandle(Arc<Mutex<LifecycleState>>);

impl StateHandle {
    fn new() -> Self {
        Self(Arc::new(Mutex::new(LifecycleState::Unstarted)))
    }

    /// Current state
    pub fn get(&self) -> LifecycleState {
        *self.0.lock()
    }

    fn set(&self, next: LifecycleState) {
        let prev = std::mem::replace(&mut *self.0.lock(), next);
        info!("Lifecycle: {:?} -> {:?}", prev, next);
    }
}

/// Gateway process before it has started
pub struct LogServer {
    config: GatewayConfig,
    storage_timeout: Duration,
    state: StateHandle,
}

/// Gateway with storage connected and all three listeners bound
pub struct RunningServer {
    service: ServiceConfig,
    http: TcpListener,
    rpc: TcpListener,
    legacy: TcpListener,
    http_addr: SocketAddr,
    rpc_addr: SocketAddr,
    legacy_addr: SocketAddr,
    storage_timeout: Duration,
    state: StateHandle,
}

/// Name of a listener task and how it ended
type ListenerExit = (&'static str, Result<()>);

impl LogServer {
    /// Create a new gateway with the given configuration
    pub fn new(config: GatewayConfig) -> Result<Self> {
        config.validate()?;
        let storage_timeout = config.storage.timeout();
        Ok(Self {
            config,
            storage_timeout,
            state: StateHandle::new(),
        })
    }

    /// Override the storage connect/disconnect bound
    pub fn with_storage_timeout(mut self, storage_timeout: Duration) -> Self {
        self.storage_timeout = storage_timeout;
        self
    }

    /// Handle for observing lifecycle transitions
    pub fn state(&self) -> StateHandle {
        self.state.clone()
    }

    /// Connect the configured storage adapter, then bind the listeners
    pub async fn start(self) -> Result<RunningServer> {
        let settings = self.config.storage.clone();
        self.start_with(async move { storage::connect(&settings).await })
            .await
    }

    /// Start with a caller-supplied storage connection
    pub async fn start_with<F>(self, connect: F) -> Result<RunningServer>
    where
        F: Future<Output = StorageResult<Arc<dyn PersistenceGateway>>>,
    {
        self.state.set(LifecycleState::ConnectingStorage);

        let gateway = match timeout(self.storage_timeout, connect).await {
            Ok(Ok(gateway)) => gateway,
            Ok(Err(e)) => {
                error!("Failed to connect storage: {}", e);
                self.state.set(LifecycleState::Stopped);
                return Err(e.into());
            }
            Err(_) => {
                error!("Storage connect exceeded {:?}", self.storage_timeout);
                self.state.set(LifecycleState::Stopped);
                return Err(GatewayError::ConnectTimeout(self.storage_timeout));
            }
        };
        info!("Connected to {} storage", gateway.name());

        let (http, rpc, legacy) = match bind_listeners(&self.config.server).await {
            Ok(listeners) => listeners,
            Err(e) => {
                error!("{}", e);
                self.state.set(LifecycleState::Stopped);
                return Err(e);
            }
        };

        let running = RunningServer {
            service: ServiceConfig::new(gateway),
            http_addr: http.local_addr()?,
            rpc_addr: rpc.local_addr()?,
            legacy_addr: legacy.local_addr()?,
            http,
            rpc,
            legacy,
            storage_timeout: self.storage_timeout,
            state: self.state,
        };
        running.state.set(LifecycleState::Ready);
        Ok(running)
    }

    /// Start and serve until SIGINT/SIGTERM
    pub async fn run(self) -> Result<()> {
        self.start().await?.serve_until(shutdown_signal()).await
    }
}

async fn bind_listeners(
    settings: &ListenerSettings,
) -> Result<(TcpListener, TcpListener, TcpListener)> {
    let http = bind("http", settings.http_addr()).await?;
    let rpc = bind("rpc", settings.rpc_addr()).await?;
    let legacy = bind("legacy", settings.legacy_addr()).await?;
    Ok((http, rpc, legacy))
}

async fn bind(listener: &'static str, addr: String) -> Result<TcpListener> {
    match TcpListener::bind(addr.as_str()).await {
        Ok(bound) => Ok(bound),
        Err(e) => Err(GatewayError::bind(listener, addr, e)),
    }
}

impl RunningServer {
    /// Bound HTTP address
    pub fn http_addr(&self) -> SocketAddr {
        self.http_addr
    }

    /// Bound gRPC address
    pub fn rpc_addr(&self) -> SocketAddr {
        self.rpc_addr
    }

    /// Bound legacy RPC address
    pub fn legacy_addr(&self) -> SocketAddr {
        self.legacy_addr
    }

    /// Shared service state
    pub fn service(&self) -> &ServiceConfig {
        &self.service
    }

    /// Handle for observing lifecycle transitions
    pub fn state(&self) -> StateHandle {
        self.state.clone()
    }

    /// Serve all listeners until `shutdown` resolves or one of them stops
    pub async fn serve_until<S>(self, shutdown: S) -> Result<()>
    where
        S: Future<Output = ()>,
    {
        let RunningServer {
            service,
            http,
            rpc,
            legacy,
            storage_timeout,
            state,
            ..
        } = self;

        let stop = CancellationToken::new();
        let mut listeners = JoinSet::new();

        let http_server = HttpListener::new(service.clone());
        let rpc_server = RpcListener::new(service.clone());
        let legacy_server = LegacyListener::new(service.clone());

        let serve = http_server.serve(http, stop.clone());
        listeners.spawn(named("http", serve));
        let serve = rpc_server.serve(rpc, stop.clone());
        listeners.spawn(named("rpc", serve));
        let serve = legacy_server.serve(legacy, stop.clone());
        listeners.spawn(named("legacy", serve));

        supervise(listeners, stop, shutdown, &service, storage_timeout, &state).await
    }
}

async fn named<F>(listener: &'static str, serve: F) -> ListenerExit
where
    F: Future<Output = Result<()>>,
{
    (listener, serve.await)
}

/// Wait for the shutdown signal or the first listener exit, stop every
/// listener, then close storage.
async fn supervise<S>(
    mut listeners: JoinSet<ListenerExit>,
    stop: CancellationToken,
    shutdown: S,
    service: &ServiceConfig,
    bound: Duration,
    state: &StateHandle,
) -> Result<()>
where
    S: Future<Output = ()>,
{
    let outcome = tokio::select! {
        Some(joined) = listeners.join_next() => Err(listener_exit(joined)),
        _ = shutdown => Ok(()),
    };

    match &outcome {
        Ok(()) => state.set(LifecycleState::ShuttingDown),
        Err(e) => {
            error!("Listener failure: {}", e);
            state.set(LifecycleState::Degraded);
        }
    }

    stop_listeners(&mut listeners, &stop, bound).await;
    let closed = close_storage(service, bound).await;
    state.set(LifecycleState::Stopped);

    outcome.and(closed)
}

fn listener_exit(joined: std::result::Result<ListenerExit, JoinError>) -> GatewayError {
    match joined {
        Ok((listener, Ok(()))) => GatewayError::Listener(format!("{} listener stopped", listener)),
        Ok((_, Err(e))) => e,
        Err(e) => GatewayError::Listener(format!("listener task failed: {}", e)),
    }
}

async fn stop_listeners(
    listeners: &mut JoinSet<ListenerExit>,
    stop: &CancellationToken,
    bound: Duration,
) {
    stop.cancel();

    let drained = timeout(bound, async {
        while let Some(joined) = listeners.join_next().await {
            if let Ok((listener, Err(e))) = joined {
                warn!("{} listener stopped with error: {}", listener, e);
            }
        }
    })
    .await;

    if drained.is_err() {
        warn!("Listeners still running after {:?}, aborting", bound);
        listeners.shutdown().await;
    }
}

async fn close_storage(service: &ServiceConfig, bound: Duration) -> Result<()> {
    match timeout(bound, service.gateway().close()).await {
        Ok(Ok(())) => {
            info!("Storage connection closed");
            Ok(())
        }
        Ok(Err(e)) => {
            error!("Failed to close storage: {}", e);
            Err(e.into())
        }
        Err(_) => {
            error!("Storage shutdown exceeded {:?}", bound);
            Err(GatewayError::ShutdownTimeout(bound))
        }
    }
}

/// Resolves on SIGINT, or SIGTERM on unix
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("Shutdown signal received");
}
