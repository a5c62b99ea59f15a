use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod tracing_setup;

use tracing_setup::{init_tracing, TracingConfig};

#[derive(Parser, Debug)]
#[command(
    name = "freshbites",
    author,
    version,
    about = "PostgreSQL query gateway for the FreshBites ERP dashboard",
    long_about = "Serve raw SQL, schema introspection and forecast feedback endpoints over HTTP, \
                  against a configured default database or a per-request connection descriptor."
)]
struct Cli {
    /// Debug logging (RUST_LOG still wins when set)
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP gateway
    Serve(commands::serve::ServeArgs),
    /// Check the default database connection and print its server time
    Ping(commands::ping::PingArgs),
    /// Export the baseline_forecast ledger as CSV
    Export(commands::export::ExportArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    // .env may set RUST_LOG
    let dotenv = freshbites_core::load_dotenv();
    init_tracing(&TracingConfig { debug: cli.debug }).ok();
    freshbites_core::log_dotenv(&dotenv);

    match cli.command {
        Commands::Serve(args) => commands::run_serve(args).await?,
        Commands::Ping(args) => commands::run_ping(args).await?,
        Commands::Export(args) => commands::run_export(args).await?,
    }
    Ok(())
}
