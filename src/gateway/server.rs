//! Gateway server

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{info, warn};

use super::router::{AppState, create_internal_router, create_public_router};
use crate::config::Config;
use crate::{Error, Result};

/// Token gateway server: one public and one internal listener.
pub struct Gateway {
    /// Configuration
    config: Config,
    /// Shared state for both routers
    state: Arc<AppState>,
}

impl Gateway {
    /// Create a new gateway
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or a component
    /// cannot be built.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let state = Arc::new(AppState::from_config(&config)?);
        Ok(Self { config, state })
    }

    /// Run the gateway until a shutdown signal arrives
    ///
    /// # Errors
    ///
    /// Returns an error if a listener cannot be bound or a server fails.
    pub async fn run(self) -> Result<()> {
        let server = &self.config.server;
        let public_addr = socket_addr(&server.host, server.port)?;
        let internal_addr = socket_addr(&server.internal_host, server.internal_port)?;

        let (shutdown_tx, _) = broadcast::channel(1);

        let public_listener = TcpListener::bind(public_addr).await?;
        let internal_listener = TcpListener::bind(internal_addr).await?;

        info!("============================================================");
        info!("TOKENGATE v{}", env!("CARGO_PKG_VERSION"));
        info!("============================================================");
        info!(addr = %public_addr, "Public listener");
        info!("  POST /login         (credential gate)");
        info!("  POST /proxy         (allowlist forwarder)");
        info!("  GET  /token/verify  (bearer verification)");
        info!(addr = %internal_addr, "Internal listener");
        info!("  POST /login         (trusted origin)");
        info!(
            backend = ?self.config.secrets.backend,
            key = %self.config.secrets.key,
            "Signing secret source"
        );
        info!(
            allowed = self.state.forwarder.allowlist().len(),
            "Forwarder allowlist loaded"
        );
        if !internal_addr.ip().is_loopback() {
            warn!(addr = %internal_addr, "Internal listener is not bound to loopback; anyone who reaches it gets a token");
        }
        info!("============================================================");

        let public = axum::serve(
            public_listener,
            create_public_router(Arc::clone(&self.state))
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(wait_for_shutdown(shutdown_tx.subscribe()));

        let internal = axum::serve(
            internal_listener,
            create_internal_router(Arc::clone(&self.state)).into_make_service(),
        )
        .with_graceful_shutdown(wait_for_shutdown(shutdown_tx.subscribe()));

        let mut drain_rx = shutdown_tx.subscribe();
        let drain_timeout = server.shutdown_timeout;
        tokio::spawn(shutdown_signal(shutdown_tx));

        let servers = async { tokio::try_join!(public.into_future(), internal.into_future()) };
        let drain_deadline = async {
            let _ = drain_rx.recv().await;
            tokio::time::sleep(drain_timeout).await;
        };

        tokio::select! {
            result = servers => {
                result.map_err(|e| Error::Internal(e.to_string()))?;
            }
            () = drain_deadline => {
                warn!(timeout = ?drain_timeout, "In-flight requests did not drain in time");
            }
        }

        info!("Gateway stopped");
        Ok(())
    }
}

fn socket_addr(host: &str, port: u16) -> Result<SocketAddr> {
    let ip = host
        .parse()
        .map_err(|e| Error::Config(format!("Invalid host '{host}': {e}")))?;
    Ok(SocketAddr::new(ip, port))
}

async fn wait_for_shutdown(mut rx: broadcast::Receiver<()>) {
    let _ = rx.recv().await;
}

/// Shutdown signal handler
async fn shutdown_signal(shutdown_tx: broadcast::Sender<()>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
    let _ = shutdown_tx.send(());
}
