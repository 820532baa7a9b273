//! bqsql command line
//!
//! Compiles JSON-encoded expressions to BigQuery SQL and inspects table
//! schemas from table metadata files.

mod commands;
mod config;
mod logging;

use anyhow::Result;
use clap::Parser;

use commands::Cli;
use config::Config;

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = Config::load_or_default(&cli.config)?;
    config.apply_logging_env();
    logging::init()?;

    tracing::debug!(
        config = %cli.config.display(),
        project = ?config.connection.project_id,
        param_naming = ?config.compiler.param_naming,
        "Loaded configuration"
    );

    let stdout = std::io::stdout();
    commands::run(&cli.command, &config, &mut stdout.lock())
}
