//! API routes, all nested under `/api`

pub mod connection;
pub mod export;
pub mod feedback;
pub mod health;
pub mod query;
pub mod schema;
