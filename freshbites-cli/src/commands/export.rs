//! Ledger export command

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::AsyncWriteExt;

use freshbites_core::GatewayConfig;
use freshbites_server::db::LedgerRepo;
use freshbites_server::http::AppState;

/// Arguments for the export command
#[derive(Parser, Debug)]
pub struct ExportArgs {
    /// Write the CSV here instead of stdout
    #[arg(long, short = 'o', value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Write the baseline_forecast ledger as CSV
pub async fn run_export(args: ExportArgs) -> Result<()> {
    let config = GatewayConfig::from_env();
    let state = AppState::from_config(&config);

    let csv = LedgerRepo::new(state.gateway.registry().default_pool())
        .export_csv()
        .await
        .context("Failed to export baseline_forecast")?;

    match args.output {
        Some(path) => {
            tokio::fs::write(&path, csv.as_bytes())
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), "Exported ledger");
        }
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(csv.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
        }
    }
    Ok(())
}
