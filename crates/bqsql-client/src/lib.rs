//! BigQuery client adapter
//!
//! Connects the dialect compiler to a [`WarehouseClient`]: compiles
//! expressions, binds their parameters into query jobs and turns table
//! metadata into typed table scans.

mod backend;
mod error;
pub mod schema;
mod warehouse;

pub use backend::{parse_project_and_dataset, BigQueryBackend, ClientConfig, Cursor};
pub use error::{ClientError, WarehouseFailure};
pub use schema::{infer_schema, rename_partition_column};
pub use warehouse::{
    MockWarehouseClient, QueryJob, QueryResult, TableMetadata, TableRef, TableSchema,
    TimePartitioning, WarehouseClient,
};
