//! Subcommands: argument parsing and the work behind each command

use anyhow::{bail, Context, Result};
use bqsql_client::{BigQueryBackend, MockWarehouseClient, TableMetadata};
use bqsql_dialect::Compiler;
use bqsql_ir::{Expr, Op, Params};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::Config;

/// Compile expression trees to BigQuery SQL
#[derive(Parser, Debug)]
#[command(name = "bqsql")]
#[command(version)]
pub struct Cli {
    /// Configuration file; missing files fall back to defaults
    #[arg(long, global = true, default_value = "config.yaml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Compile an expression to BigQuery SQL
    Compile {
        /// JSON-encoded expression
        expr: PathBuf,

        /// JSON object of parameter values
        #[arg(long)]
        params: Option<PathBuf>,
    },

    /// Print the schema inferred from table metadata
    Schema {
        /// Table resource JSON as returned by the tables API
        table: PathBuf,
    },
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
}

pub fn run(command: &Command, config: &Config, out: &mut impl Write) -> Result<()> {
    match command {
        Command::Compile { expr, params } => compile(expr, params.as_deref(), config, out),
        Command::Schema { table } => schema(table, config, out),
    }
}

/// Print the SQL followed by the bound parameters in their API representation
fn compile(expr_path: &Path, params_path: Option<&Path>, config: &Config, out: &mut impl Write) -> Result<()> {
    let expr: Expr = read_json(expr_path)?;
    let params: Params = match params_path {
        Some(path) => read_json(path)?,
        None => Params::new(),
    };

    let compiler = Compiler::new(config.compiler.param_naming);
    let query = compiler.compile(&expr, &params)?;
    tracing::info!(
        expr = %expr_path.display(),
        fingerprint = %query.fingerprint(),
        "Compiled expression"
    );

    writeln!(out, "{}", query.sql)?;
    if !query.parameters.is_empty() {
        let parameters: Vec<_> = query.parameters.iter().map(|p| p.to_api_repr()).collect();
        writeln!(out)?;
        writeln!(out, "{}", serde_json::to_string_pretty(&parameters)?)?;
    }
    Ok(())
}

/// Resolve a table from a metadata file the way a live backend would
fn schema(table_path: &Path, config: &Config, out: &mut impl Write) -> Result<()> {
    let metadata: TableMetadata = read_json(table_path)?;
    let name = metadata.table_reference.to_string();

    let mut connection = config.connection.clone();
    connection
        .project_id
        .get_or_insert_with(|| metadata.table_reference.project_id.clone());
    let client_config = connection.to_client_config(config.compiler.param_naming)?;

    let mut client = MockWarehouseClient::new();
    client.add_table(metadata);
    let backend = BigQueryBackend::new(client_config, client)?;

    let table = backend.table(&name)?;
    let Op::TableScan { schema, .. } = &table.op else {
        bail!("{name} did not resolve to a table");
    };

    writeln!(out, "{name}")?;
    for field in &schema.fields {
        let required = if field.nullable { "" } else { " NOT NULL" };
        writeln!(out, "  {}: {}{required}", field.name, field.data_type)?;
    }
    Ok(())
}
