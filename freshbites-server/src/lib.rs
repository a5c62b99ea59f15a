//! freshbites-server: HTTP gateway in front of PostgreSQL
//!
//! Runs caller SQL against a process-wide default pool or against a pool
//! built for a single request from a posted connection descriptor, and
//! serves the forecast ledger endpoints (feedback, export, accuracy).

pub mod db;
pub mod http;

pub use db::{GatewayError, LedgerRepo, PoolRegistry, PoolStats, QueryGateway, QueryParam, QueryResult};
pub use http::{build_router, run_server, AppState, ServerConfig, ServerError};
