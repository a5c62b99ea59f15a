//! freshbites-core: the database-free half of the FreshBites ERP gateway.
//!
//! Connection descriptors and environment configuration for the pool
//! registry, plus the forecast ledger maths the derived endpoints use.

pub mod accuracy;
pub mod config;
pub mod csv;
pub mod descriptor;
pub mod error;
pub mod forecast;
pub mod lenient;

pub use accuracy::{mape, AccuracyReport, Observation};
pub use config::{load_dotenv, log_dotenv, GatewayConfig, PoolConfig};
pub use csv::{to_csv, Row};
pub use descriptor::{ConnectionDescriptor, ConnectionTarget};
pub use error::{CoreError, Result};
pub use forecast::{week_number, FeedbackEntry, FeedbackRequest, Product, StockStatus};
