//! Pool registry: the process-wide default pool and per-request ephemeral pools
//!
//! Pools are built with `connect_lazy_with`, so construction never touches
//! the network; connection failures surface on the first query.
//!
//! The driver retries refused connections until the acquire timeout and
//! then reports only `PoolTimedOut`. [`PoolRegistry::explain`] makes one
//! direct attempt so callers see the actual cause.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use freshbites_core::{ConnectionDescriptor, ConnectionTarget, GatewayConfig, PoolConfig};
use once_cell::sync::OnceCell;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::{ConnectOptions, Connection, PgPool};

use super::error::GatewayError;

/// `application_name` reported to the server for every connection.
const APPLICATION_NAME: &str = "freshbites-gateway";

/// Translate a validated target into driver connect options.
pub fn connect_options(target: &ConnectionTarget) -> PgConnectOptions {
    let ssl_mode = if target.use_tls {
        PgSslMode::Require
    } else {
        PgSslMode::Disable
    };

    PgConnectOptions::new()
        .host(&target.host)
        .port(target.port)
        .username(&target.username)
        .password(&target.password)
        .database(&target.database)
        .ssl_mode(ssl_mode)
        .application_name(APPLICATION_NAME)
}

fn pool_options(settings: &PoolConfig) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(settings.acquire_timeout)
}

/// Ephemeral pools serve one request, so nothing queues behind the first
/// connection and waiting longer than a connect attempt gains nothing.
fn ephemeral_pool_options(settings: &PoolConfig) -> PgPoolOptions {
    pool_options(settings).acquire_timeout(settings.acquire_timeout.min(settings.connect_timeout))
}

#[derive(Debug, Default)]
struct Counters {
    created: AtomicU64,
    disposed: AtomicU64,
}

/// Ephemeral pool bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub ephemeral_created: u64,
    pub ephemeral_disposed: u64,
}

impl PoolStats {
    /// Ephemeral pools created but not yet released.
    pub fn ephemeral_live(&self) -> u64 {
        self.ephemeral_created.saturating_sub(self.ephemeral_disposed)
    }
}

/// Owns the default pool and builds ephemeral ones.
pub struct PoolRegistry {
    default_target: ConnectionTarget,
    settings: PoolConfig,
    default_pool: OnceCell<PgPool>,
    counters: Arc<Counters>,
}

impl PoolRegistry {
    pub fn new(default_target: ConnectionTarget, settings: PoolConfig) -> Self {
        Self {
            default_target,
            settings,
            default_pool: OnceCell::new(),
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(config.database.clone(), config.pool.clone())
    }

    /// The single process-wide pool, built on first use.
    ///
    /// Must be called from within a tokio runtime.
    pub fn default_pool(&self) -> &PgPool {
        self.default_pool.get_or_init(|| {
            tracing::info!(
                db = %self.default_target.label(),
                tls = self.default_target.use_tls,
                max_connections = self.settings.max_connections,
                "Initializing default pool"
            );
            pool_options(&self.settings).connect_lazy_with(connect_options(&self.default_target))
        })
    }

    /// Build a pool bound to a caller-supplied descriptor.
    ///
    /// The returned guard must be released with [`EphemeralPool::dispose`].
    pub fn create_pool(&self, descriptor: &ConnectionDescriptor) -> Result<EphemeralPool, GatewayError> {
        let target = descriptor.validate()?;
        let pool = ephemeral_pool_options(&self.settings).connect_lazy_with(connect_options(&target));

        let created = self.counters.created.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(db = %target.label(), created, "Created ephemeral pool");

        Ok(EphemeralPool {
            pool,
            label: target.label(),
            released: false,
            counters: Arc::clone(&self.counters),
        })
    }

    /// Replace a bare pool timeout with the error a direct connection
    /// attempt to the same server produces.
    ///
    /// Any other error, or a direct attempt that succeeds or also runs
    /// out of time, is returned unchanged.
    pub async fn explain(&self, pool: &PgPool, error: GatewayError) -> GatewayError {
        if !matches!(error, GatewayError::Connection(sqlx::Error::PoolTimedOut)) {
            return error;
        }

        let options = pool.connect_options();
        match tokio::time::timeout(self.settings.connect_timeout, options.connect()).await {
            Ok(Err(cause)) => {
                tracing::debug!(error = %cause, "Pool timeout explained by direct connect");
                GatewayError::Connection(cause)
            }
            Ok(Ok(conn)) => {
                if let Err(e) = conn.close().await {
                    tracing::debug!(error = %e, "Closing diagnostic connection failed");
                }
                error
            }
            Err(_) => error,
        }
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            ephemeral_created: self.counters.created.load(Ordering::SeqCst),
            ephemeral_disposed: self.counters.disposed.load(Ordering::SeqCst),
        }
    }
}

/// A pool that lives for exactly one request.
///
/// `dispose` closes it. Dropping an undisposed guard (a cancelled request
/// future) schedules the close on the current runtime instead.
pub struct EphemeralPool {
    pool: PgPool,
    label: String,
    released: bool,
    counters: Arc<Counters>,
}

impl EphemeralPool {
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Release every connection and mark the pool closed.
    pub async fn dispose(mut self) {
        self.mark_released("disposed");
        self.pool.close().await;
    }

    fn mark_released(&mut self, how: &'static str) {
        self.released = true;
        let disposed = self.counters.disposed.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(db = %self.label, disposed, how, "Released ephemeral pool");
    }
}

impl Drop for EphemeralPool {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.mark_released("dropped");
        let pool = self.pool.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move { pool.close().await });
            }
            Err(_) => tracing::warn!(db = %self.label, "No runtime to close dropped pool"),
        }
    }
}
