//! BigQuery backend: compile, submit and resolve tables through a warehouse client

use bqsql_dialect::{CompiledQuery, Compiler, ParamNaming};
use bqsql_ir::{Expr, Params};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::schema::{infer_schema, rename_partition_column, DEFAULT_PARTITION_COLUMN};
use crate::{ClientError, QueryJob, QueryResult, TableRef, WarehouseClient};

/// Connection settings for a [`BigQueryBackend`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub project_id: String,
    /// `dataset` or `project.dataset`
    #[serde(default)]
    pub dataset_id: Option<String>,
    #[serde(default)]
    pub application_name: Option<String>,
    /// Name `_PARTITIONTIME` is exposed under; `None` keeps the native name
    #[serde(default = "default_partition_column")]
    pub partition_column: Option<String>,
    #[serde(default)]
    pub param_naming: ParamNaming,
}

fn default_partition_column() -> Option<String> {
    Some(DEFAULT_PARTITION_COLUMN.to_string())
}

impl ClientConfig {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            dataset_id: None,
            application_name: None,
            partition_column: default_partition_column(),
            param_naming: ParamNaming::default(),
        }
    }

    pub fn with_dataset(mut self, dataset_id: impl Into<String>) -> Self {
        self.dataset_id = Some(dataset_id.into());
        self
    }

    /// User agent sent with every job
    pub fn user_agent(&self) -> String {
        let ours = format!("bqsql/{}", env!("CARGO_PKG_VERSION"));
        match &self.application_name {
            Some(app) => format!("{app} {ours}"),
            None => ours,
        }
    }
}

/// Split a dataset name into `(data_project, billing_project, dataset)`.
///
/// `project.dataset` reads data from `project` while billing `billing_project`.
pub fn parse_project_and_dataset(
    project: &str,
    dataset: &str,
) -> Result<(String, String, Option<String>), ClientError> {
    match dataset.split('.').collect::<Vec<_>>().as_slice() {
        [""] => Ok((project.to_string(), project.to_string(), None)),
        [name] => Ok((project.to_string(), project.to_string(), Some(name.to_string()))),
        [data_project, name] => Ok((
            data_project.to_string(),
            project.to_string(),
            Some(name.to_string()),
        )),
        _ => Err(ClientError::InvalidDataset(dataset.to_string())),
    }
}

/// Results of an executed job
#[derive(Debug, Clone)]
pub struct Cursor {
    job_id: String,
    result: QueryResult,
}

impl Cursor {
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn columns(&self) -> &[String] {
        &self.result.columns
    }

    pub fn row_count(&self) -> usize {
        self.result.row_count
    }

    pub fn fetch_all(self) -> Vec<Vec<JsonValue>> {
        self.result.rows
    }
}

pub struct BigQueryBackend<C: WarehouseClient> {
    config: ClientConfig,
    client: C,
    compiler: Compiler,
    data_project: String,
    billing_project: String,
    dataset: Option<String>,
}

impl<C: WarehouseClient> BigQueryBackend<C> {
    pub fn new(config: ClientConfig, client: C) -> Result<Self, ClientError> {
        if config.project_id.is_empty() {
            return Err(ClientError::Config("project_id must not be empty".to_string()));
        }
        let (data_project, billing_project, dataset) =
            parse_project_and_dataset(&config.project_id, config.dataset_id.as_deref().unwrap_or(""))?;
        let compiler = Compiler::new(config.param_naming);

        tracing::debug!(
            data_project = %data_project,
            billing_project = %billing_project,
            dataset = ?dataset,
            "Created BigQuery backend"
        );

        Ok(Self {
            config,
            client,
            compiler,
            data_project,
            billing_project,
            dataset,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn data_project(&self) -> &str {
        &self.data_project
    }

    pub fn billing_project(&self) -> &str {
        &self.billing_project
    }

    pub fn dataset(&self) -> Option<&str> {
        self.dataset.as_deref()
    }

    pub fn compile(&self, expr: &Expr, params: &Params) -> Result<CompiledQuery, ClientError> {
        Ok(self.compiler.compile(expr, params)?)
    }

    /// Compile, bind and run an expression under the billing project
    pub fn execute(&self, expr: &Expr, params: &Params) -> Result<Cursor, ClientError> {
        let compiled = self.compile(expr, params)?;
        let job = QueryJob {
            job_id: Uuid::new_v4().to_string(),
            billing_project: self.billing_project.clone(),
            default_dataset: self.dataset.clone(),
            sql: compiled.sql,
            parameters: compiled.parameters,
            user_agent: self.config.user_agent(),
        };

        tracing::info!(
            job_id = %job.job_id,
            project = %job.billing_project,
            parameters = job.parameters.len(),
            "Submitting query job"
        );

        let result = self.client.submit(&job).map_err(|e| {
            tracing::error!(job_id = %job.job_id, error = %e, "Query job failed");
            e
        })?;

        tracing::info!(job_id = %job.job_id, rows = result.row_count, "Query job finished");
        Ok(Cursor {
            job_id: job.job_id,
            result,
        })
    }

    /// Resolve `table`, `dataset.table` or `project.dataset.table`
    pub fn table_ref(&self, name: &str) -> Result<TableRef, ClientError> {
        match name.split('.').collect::<Vec<_>>().as_slice() {
            [table] => match &self.dataset {
                Some(dataset) => Ok(TableRef::new(&self.data_project, dataset, *table)),
                None => Err(ClientError::Config(format!(
                    "no dataset configured to resolve table '{name}'"
                ))),
            },
            [dataset, table] => Ok(TableRef::new(&self.data_project, *dataset, *table)),
            [project, dataset, table] => Ok(TableRef::new(*project, *dataset, *table)),
            _ => Err(ClientError::Config(format!("invalid table name '{name}'"))),
        }
    }

    /// Table scan node with the schema inferred from the table's metadata
    pub fn table(&self, name: &str) -> Result<Expr, ClientError> {
        let table_ref = self.table_ref(name)?;
        let metadata = self.client.get_table(&table_ref)?;
        let schema = infer_schema(&metadata)?;
        let schema = rename_partition_column(schema, &metadata, self.config.partition_column.as_deref());

        tracing::debug!(table = %table_ref, columns = schema.fields.len(), "Resolved table");
        Ok(Expr::table(table_ref.to_string(), schema))
    }
}
