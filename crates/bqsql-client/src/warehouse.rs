//! Warehouse client seam and an in-memory implementation for tests

use bqsql_dialect::{FieldSchema, QueryParameter};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use crate::ClientError;

/// Fully qualified table name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRef {
    pub project_id: String,
    pub dataset_id: String,
    pub table_id: String,
}

impl TableRef {
    pub fn new(
        project_id: impl Into<String>,
        dataset_id: impl Into<String>,
        table_id: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            dataset_id: dataset_id.into(),
            table_id: table_id.into(),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.project_id, self.dataset_id, self.table_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    #[serde(default)]
    pub fields: Vec<FieldSchema>,
}

/// Time partitioning settings; a missing `field` means ingestion-time partitioning
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimePartitioning {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

/// Table resource as returned by the tables API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableMetadata {
    pub table_reference: TableRef,
    #[serde(default)]
    pub schema: TableSchema,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_partitioning: Option<TimePartitioning>,
}

/// A query submitted under a billing project
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryJob {
    pub job_id: String,
    pub billing_project: String,
    pub default_dataset: Option<String>,
    pub sql: String,
    pub parameters: Vec<QueryParameter>,
    pub user_agent: String,
}

impl QueryJob {
    /// Body of a jobs.query request
    pub fn to_request(&self) -> JsonValue {
        let parameters: Vec<JsonValue> = self.parameters.iter().map(|p| p.to_api_repr()).collect();
        let mut request = json!({
            "query": self.sql,
            "useLegacySql": false,
            "parameterMode": "NAMED",
            "queryParameters": parameters,
            "requestId": self.job_id,
        });
        if let Some(dataset) = &self.default_dataset {
            request["defaultDataset"] = json!({
                "projectId": self.billing_project,
                "datasetId": dataset,
            });
        }
        request
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<JsonValue>>,
    pub row_count: usize,
}

impl QueryResult {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<JsonValue>>) -> Self {
        let row_count = rows.len();
        Self {
            columns,
            rows,
            row_count,
        }
    }
}

/// The native BigQuery client, as seen by the backend
pub trait WarehouseClient: Send + Sync {
    /// Run a query job to completion
    fn submit(&self, job: &QueryJob) -> Result<QueryResult, ClientError>;

    /// Fetch table metadata
    fn get_table(&self, table: &TableRef) -> Result<TableMetadata, ClientError>;
}

/// In-memory client: canned tables and results, records submitted jobs
#[derive(Debug, Default)]
pub struct MockWarehouseClient {
    tables: HashMap<TableRef, TableMetadata>,
    results: HashMap<String, QueryResult>,
    jobs: Mutex<Vec<QueryJob>>,
}

impl MockWarehouseClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_table(&mut self, metadata: TableMetadata) {
        self.tables.insert(metadata.table_reference.clone(), metadata);
    }

    /// Result returned for jobs whose SQL matches exactly
    pub fn add_result(&mut self, sql: impl Into<String>, result: QueryResult) {
        self.results.insert(sql.into(), result);
    }

    pub fn submitted_jobs(&self) -> Vec<QueryJob> {
        match self.jobs.lock() {
            Ok(jobs) => jobs.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl WarehouseClient for MockWarehouseClient {
    fn submit(&self, job: &QueryJob) -> Result<QueryResult, ClientError> {
        match self.jobs.lock() {
            Ok(mut jobs) => jobs.push(job.clone()),
            Err(poisoned) => poisoned.into_inner().push(job.clone()),
        }
        self.results
            .get(&job.sql)
            .cloned()
            .ok_or_else(|| ClientError::warehouse(format!("no canned result for query: {}", job.sql)))
    }

    fn get_table(&self, table: &TableRef) -> Result<TableMetadata, ClientError> {
        self.tables
            .get(table)
            .cloned()
            .ok_or_else(|| ClientError::TableNotFound(table.to_string()))
    }
}
