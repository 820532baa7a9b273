use bqsql_registry::TranslateError;
use thiserror::Error;

/// Failure reported by the native warehouse client
pub type WarehouseFailure = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Translation error: {0}")]
    Translate(#[from] TranslateError),

    #[error(transparent)]
    Warehouse(WarehouseFailure),

    #[error("{0} is not a BigQuery dataset. More info https://cloud.google.com/bigquery/docs/datasets-intro")]
    InvalidDataset(String),

    #[error("Table '{0}' not found")]
    TableNotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    pub fn warehouse(err: impl Into<WarehouseFailure>) -> Self {
        ClientError::Warehouse(err.into())
    }
}
