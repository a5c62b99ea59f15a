//! Connectivity probe used by `test-connection` and `freshbites ping`

use freshbites_core::ConnectionDescriptor;
use serde_json::Value;

use super::error::GatewayError;
use super::gateway::QueryGateway;

pub const SERVER_TIME_SQL: &str = "SELECT NOW() AS server_time";

/// Ask the target database for its clock.
///
/// Going through the gateway means a descriptor-built pool is disposed
/// before this returns, whether or not the server answered.
pub async fn server_time(
    gateway: &QueryGateway,
    target: Option<&ConnectionDescriptor>,
) -> Result<Value, GatewayError> {
    let result = gateway.run(target, SERVER_TIME_SQL, &[]).await?;
    Ok(result
        .rows
        .first()
        .and_then(|row| row.get("server_time"))
        .cloned()
        .unwrap_or(Value::Null))
}
