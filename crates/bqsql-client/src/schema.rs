//! Table schema inference from BigQuery table metadata

use bqsql_dialect::datatypes::{to_host_type, FieldMode};
use bqsql_ir::{DataType, FieldType, Schema};
use bqsql_registry::TranslateError;

use crate::TableMetadata;

/// Column BigQuery exposes on ingestion-time partitioned tables
pub const NATIVE_PARTITION_COLUMN: &str = "_PARTITIONTIME";

/// Name the native partition column is exposed under by default
pub const DEFAULT_PARTITION_COLUMN: &str = "PARTITIONTIME";

fn partition_field(metadata: &TableMetadata) -> Option<&str> {
    metadata
        .time_partitioning
        .as_ref()
        .map(|tp| tp.field.as_deref().unwrap_or(NATIVE_PARTITION_COLUMN))
}

/// Host schema of a table; partitioned tables gain their partition column
pub fn infer_schema(metadata: &TableMetadata) -> Result<Schema, TranslateError> {
    let mut fields = Vec::with_capacity(metadata.schema.fields.len() + 1);
    for field in &metadata.schema.fields {
        fields.push(FieldType {
            name: field.name.clone(),
            data_type: to_host_type(field)?,
            nullable: field.mode != FieldMode::Required,
        });
    }

    if let Some(partition) = partition_field(metadata) {
        if !fields.iter().any(|f| f.name == partition) {
            fields.push(FieldType::new(partition, DataType::utc_timestamp()));
        }
    }
    Ok(Schema::new(fields))
}

/// Expose `_PARTITIONTIME` under `partition_column`.
///
/// Tables partitioned on a regular column, or a `None` target, are left as is.
pub fn rename_partition_column(
    mut schema: Schema,
    metadata: &TableMetadata,
    partition_column: Option<&str>,
) -> Schema {
    let (Some(partition), Some(target)) = (partition_field(metadata), partition_column) else {
        return schema;
    };
    if partition != NATIVE_PARTITION_COLUMN {
        return schema;
    }
    for field in &mut schema.fields {
        if field.name == NATIVE_PARTITION_COLUMN {
            field.name = target.to_string();
        }
    }
    schema
}
