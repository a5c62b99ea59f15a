//! Connection check against the configured default database

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;

use freshbites_core::GatewayConfig;
use freshbites_server::db::server_time;
use freshbites_server::http::AppState;

/// Arguments for the ping command
#[derive(Parser, Debug)]
pub struct PingArgs {}

pub async fn run_ping(_args: PingArgs) -> Result<()> {
    let config = GatewayConfig::from_env();
    let state = AppState::from_config(&config);

    let time = server_time(&state.gateway, None)
        .await
        .with_context(|| format!("Connection to {} failed", config.database.label()))?;

    let time = match time {
        Value::String(s) => s,
        other => other.to_string(),
    };
    println!("Connection successful: {} (server time {})", config.database.label(), time);
    Ok(())
}
