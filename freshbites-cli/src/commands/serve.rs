//! HTTP server command
//!
//! Environment configuration (DB_*, PORT, BIND_HOST, ALLOW_RAW_SQL,
//! CORS_PERMISSIVE) is read first; flags override it.

use anyhow::{Context, Result};
use clap::Parser;

use freshbites_core::GatewayConfig;
use freshbites_server::db::LedgerRepo;
use freshbites_server::http::{run_server, AppState, ServerConfig};

/// Arguments for the serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Host or IP to bind to (default: BIND_HOST or 0.0.0.0)
    #[arg(long, short = 'b')]
    pub bind: Option<String>,

    /// Port to listen on (default: PORT or 3001)
    #[arg(long, short = 'p')]
    pub port: Option<u16>,

    /// Refuse caller-supplied SQL on /api/erp-data
    #[arg(long)]
    pub no_raw_sql: bool,

    /// Restrict CORS to local development origins
    #[arg(long)]
    pub cors_localhost: bool,

    /// Create the baseline_forecast ledger table if it is missing
    #[arg(long)]
    pub init_ledger: bool,
}

impl ServeArgs {
    fn apply(&self, config: &mut GatewayConfig) {
        if let Some(bind) = &self.bind {
            config.bind_host = bind.clone();
        }
        if let Some(port) = self.port {
            config.listen_port = port;
        }
        if self.no_raw_sql {
            config.allow_raw_sql = false;
        }
        if self.cors_localhost {
            config.cors_permissive = false;
        }
    }
}

/// Run the HTTP server
pub async fn run_serve(args: ServeArgs) -> Result<()> {
    let mut config = GatewayConfig::from_env();
    args.apply(&mut config);

    tracing::info!(
        db = %config.database.label(),
        raw_sql = config.allow_raw_sql,
        "Starting FreshBites ERP Gateway"
    );

    let server_config = ServerConfig::from_gateway(&config).context("Invalid server address")?;
    let state = AppState::from_config(&config);

    if args.init_ledger {
        LedgerRepo::new(state.gateway.registry().default_pool())
            .ensure_table()
            .await
            .context("Failed to create ledger table")?;
    }

    // Run server (blocks until shutdown)
    run_server(state, server_config)
        .await
        .context("Server error")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_environment() {
        let args = ServeArgs::parse_from(["serve", "--port", "8080", "--no-raw-sql", "--cors-localhost"]);
        let mut config = GatewayConfig::default();
        args.apply(&mut config);

        assert_eq!(config.listen_port, 8080);
        assert_eq!(config.bind_host, "0.0.0.0");
        assert!(!config.allow_raw_sql);
        assert!(!config.cors_permissive);
    }

    #[test]
    fn no_flags_keep_environment() {
        let args = ServeArgs::parse_from(["serve"]);
        let mut config = GatewayConfig::default();
        let before = config.clone();
        args.apply(&mut config);
        assert_eq!(config, before);
    }
}
