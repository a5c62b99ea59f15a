//! Database layer - pool registry, query gateway and fixed-statement consumers
//!
//! # Design Principles
//!
//! - One lazily built default pool per process, never closed by a request
//! - One ephemeral pool per descriptor-carrying request, closed on every path
//! - Caller SQL runs verbatim; no parsing, no retries, no statement timeout

pub mod decode;
pub mod error;
pub mod gateway;
pub mod ledger;
pub mod pool;
pub mod probe;
pub mod schema;

pub use error::GatewayError;
pub use gateway::{execute, QueryGateway, QueryParam, QueryResult};
pub use ledger::LedgerRepo;
pub use pool::{EphemeralPool, PoolRegistry, PoolStats};
pub use probe::server_time;
pub use schema::{introspect, ColumnInfo, Schema};
