//! Mapping between host types and BigQuery column types

use bqsql_ir::{DataType, FieldType};
use bqsql_registry::TranslateError;
use serde::{Deserialize, Serialize};

use crate::identifiers::quote_identifier;

/// Column mode of a BigQuery schema field
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldMode {
    #[default]
    Nullable,
    Required,
    Repeated,
}

/// A field of a BigQuery table schema, as returned by the tables API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub mode: FieldMode,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldSchema>,
}

impl FieldSchema {
    pub fn new(name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
            mode: FieldMode::Nullable,
            fields: vec![],
        }
    }

    pub fn repeated(mut self) -> Self {
        self.mode = FieldMode::Repeated;
        self
    }

    pub fn required(mut self) -> Self {
        self.mode = FieldMode::Required;
        self
    }

    pub fn record(name: impl Into<String>, fields: Vec<FieldSchema>) -> Self {
        Self {
            fields,
            ..Self::new(name, "RECORD")
        }
    }
}

/// Host type to BigQuery type name
pub fn to_bigquery_type(dtype: &DataType) -> Result<String, TranslateError> {
    let name = match dtype {
        DataType::Bool => "BOOL",
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32 => "INT64",
        DataType::UInt64 => {
            return Err(TranslateError::UnsupportedType(
                "Conversion from uint64 to BigQuery integer type (int64) is lossy".to_string(),
            ))
        }
        DataType::Float32 | DataType::Float64 => "FLOAT64",
        DataType::Decimal { precision: 38, scale: 9 } => "NUMERIC",
        DataType::Decimal { precision: 76, scale: 38 } => "BIGNUMERIC",
        DataType::Decimal { .. } => {
            return Err(TranslateError::UnsupportedType(format!(
                "BigQuery only supports decimal(38, 9) as NUMERIC and decimal(76, 38) as BIGNUMERIC, got {dtype}"
            )))
        }
        DataType::String => "STRING",
        DataType::Binary => "BYTES",
        DataType::Date => "DATE",
        DataType::Time => "TIME",
        DataType::Timestamp { timezone: Some(_) } => "TIMESTAMP",
        DataType::Timestamp { timezone: None } => "DATETIME",
        DataType::Geography => "GEOGRAPHY",
        DataType::Array(element) => {
            if matches!(**element, DataType::Array(_)) {
                return Err(TranslateError::UnsupportedType(
                    "ARRAY<ARRAY<T>> is not supported in BigQuery".to_string(),
                ));
            }
            return Ok(format!("ARRAY<{}>", to_bigquery_type(element)?));
        }
        DataType::Struct(fields) => {
            let mut parts = Vec::with_capacity(fields.len());
            for field in fields {
                parts.push(format!(
                    "{} {}",
                    quote_identifier(&field.name),
                    to_bigquery_type(&field.data_type)?
                ));
            }
            return Ok(format!("STRUCT<{}>", parts.join(", ")));
        }
        DataType::Interval { .. } | DataType::Null | DataType::Unknown => {
            return Err(TranslateError::UnsupportedType(format!(
                "BigQuery has no column type for {dtype}"
            )))
        }
    };
    Ok(name.to_string())
}

/// Standard SQL name for a legacy SQL type name
fn standardize(name: &str) -> &str {
    match name {
        "INTEGER" => "INT64",
        "FLOAT" => "FLOAT64",
        "BOOLEAN" => "BOOL",
        other => other,
    }
}

/// Host type of a primitive BigQuery type name (legacy names accepted)
pub fn primitive_from_name(name: &str) -> Result<DataType, TranslateError> {
    let dtype = match standardize(name) {
        "INT64" => DataType::Int64,
        "FLOAT64" => DataType::Float64,
        "BOOL" => DataType::Bool,
        "STRING" => DataType::String,
        "DATE" => DataType::Date,
        "DATETIME" => DataType::timestamp(),
        "TIMESTAMP" => DataType::utc_timestamp(),
        "TIME" => DataType::Time,
        "BYTES" => DataType::Binary,
        "NUMERIC" => DataType::Decimal { precision: 38, scale: 9 },
        "BIGNUMERIC" => DataType::Decimal { precision: 76, scale: 38 },
        "GEOGRAPHY" => DataType::Geography,
        other => {
            return Err(TranslateError::UnsupportedType(format!(
                "unknown BigQuery type {other}"
            )))
        }
    };
    Ok(dtype)
}

/// Host type of a BigQuery schema field
pub fn to_host_type(field: &FieldSchema) -> Result<DataType, TranslateError> {
    let dtype = match field.field_type.as_str() {
        "RECORD" | "STRUCT" => {
            if field.fields.is_empty() {
                return Err(TranslateError::UnsupportedType(format!(
                    "RECORD field {} has no sub-fields",
                    field.name
                )));
            }
            let mut members = Vec::with_capacity(field.fields.len());
            for sub in &field.fields {
                members.push(FieldType {
                    name: sub.name.clone(),
                    data_type: to_host_type(sub)?,
                    nullable: sub.mode != FieldMode::Required,
                });
            }
            DataType::Struct(members)
        }
        other => primitive_from_name(other)?,
    };

    if field.mode == FieldMode::Repeated {
        Ok(DataType::array(dtype))
    } else {
        Ok(dtype)
    }
}
