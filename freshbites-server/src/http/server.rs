//! Axum server setup
//!
//! Server skeleton with:
//! - Permissive CORS by default, localhost-only on request
//! - Tracing middleware
//! - Graceful shutdown on SIGTERM/Ctrl+C

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use axum::Router;
use freshbites_core::GatewayConfig;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::routes;
use crate::db::{PoolRegistry, QueryGateway};

/// Origins allowed when CORS is restricted to a local frontend.
const LOCAL_ORIGINS: [&str; 4] = [
    "http://localhost:3000",
    "http://localhost:5173",
    "http://127.0.0.1:3000",
    "http://127.0.0.1:5173",
];

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to (default: 0.0.0.0:3001)
    pub bind_addr: SocketAddr,

    /// Allow any CORS origin (default: true, the gateway fronts a
    /// separately served dashboard)
    pub cors_permissive: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], freshbites_core::config::DEFAULT_LISTEN_PORT)),
            cors_permissive: true,
        }
    }
}

impl ServerConfig {
    pub fn from_gateway(config: &GatewayConfig) -> Result<Self, ServerError> {
        let bind_addr = format!("{}:{}", config.bind_host, config.listen_port).parse()?;
        Ok(Self {
            bind_addr,
            cors_permissive: config.cors_permissive,
        })
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub gateway: QueryGateway,
}

impl AppState {
    pub fn new(gateway: QueryGateway) -> Self {
        Self { gateway }
    }

    /// Registry and gateway for `config`. No connection is opened here.
    pub fn from_config(config: &GatewayConfig) -> Self {
        let registry = Arc::new(PoolRegistry::from_config(config));
        Self::new(QueryGateway::new(registry, config.allow_raw_sql))
    }
}

fn cors_layer(permissive: bool) -> CorsLayer {
    if permissive {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(LOCAL_ORIGINS.map(HeaderValue::from_static))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Every endpoint under `/api`, with CORS and request tracing.
pub fn build_router(state: AppState, cors_permissive: bool) -> Router {
    let api = Router::new()
        .merge(routes::health::router())
        .merge(routes::connection::router())
        .merge(routes::query::router())
        .merge(routes::schema::router())
        .merge(routes::feedback::router())
        .merge(routes::export::router());

    Router::new()
        .nest("/api", api)
        .layer(cors_layer(cors_permissive))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Run the HTTP server until Ctrl+C or SIGTERM.
///
/// # Example
///
/// ```ignore
/// let config = GatewayConfig::from_env();
/// let state = AppState::from_config(&config);
/// run_server(state, ServerConfig::from_gateway(&config)?).await?;
/// ```
pub async fn run_server(state: AppState, config: ServerConfig) -> Result<(), ServerError> {
    if config.cors_permissive {
        tracing::warn!("CORS: Permissive mode enabled - all origins allowed");
    }
    if !state.gateway.allows_raw_sql() {
        tracing::info!("Raw SQL disabled - /api/erp-data will refuse queries");
    }

    let registry = Arc::clone(state.gateway.registry());
    let app = build_router(state, config.cors_permissive);

    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let stats = registry.stats();
    tracing::info!(
        ephemeral_created = stats.ephemeral_created,
        ephemeral_disposed = stats.ephemeral_disposed,
        "Server shutdown complete"
    );
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting shutdown");
        }
    }
}

/// Server error type
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid bind address: {0}")]
    Addr(#[from] std::net::AddrParseError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), 3001);
        assert!(config.cors_permissive);
    }

    #[test]
    fn config_follows_gateway_settings() {
        let mut gateway = GatewayConfig::default();
        gateway.bind_host = "127.0.0.1".into();
        gateway.listen_port = 8088;
        gateway.cors_permissive = false;

        let config = ServerConfig::from_gateway(&gateway).unwrap();
        assert_eq!(config.bind_addr, SocketAddr::from(([127, 0, 0, 1], 8088)));
        assert!(!config.cors_permissive);
    }

    #[test]
    fn bad_bind_host_is_an_error() {
        let mut gateway = GatewayConfig::default();
        gateway.bind_host = "not an address".into();
        assert!(matches!(
            ServerConfig::from_gateway(&gateway),
            Err(ServerError::Addr(_))
        ));
    }
}
