//! Type system for the expression IR

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    // Primitives
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    Decimal { precision: u8, scale: u8 },

    // Text
    String,

    // Binary
    Binary,

    // Temporal
    Date,
    Time,
    Timestamp { timezone: Option<String> },
    Interval { unit: IntervalUnit },

    // Spatial
    Geography,

    // Complex
    Array(Box<DataType>),
    Struct(Vec<FieldType>),

    // Special
    Null,
    Unknown,
}

impl DataType {
    /// Timestamp without a timezone (wall-clock datetime)
    pub fn timestamp() -> Self {
        DataType::Timestamp { timezone: None }
    }

    /// Timestamp pinned to UTC
    pub fn utc_timestamp() -> Self {
        DataType::Timestamp {
            timezone: Some("UTC".to_string()),
        }
    }

    pub fn array(element: DataType) -> Self {
        DataType::Array(Box::new(element))
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            DataType::Int8
                | DataType::Int16
                | DataType::Int32
                | DataType::Int64
                | DataType::UInt8
                | DataType::UInt16
                | DataType::UInt32
                | DataType::UInt64
        )
    }

    pub fn is_floating(&self) -> bool {
        matches!(self, DataType::Float32 | DataType::Float64)
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_floating() || matches!(self, DataType::Decimal { .. })
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, DataType::Bool)
    }

    pub fn is_temporal(&self) -> bool {
        matches!(
            self,
            DataType::Date | DataType::Time | DataType::Timestamp { .. }
        )
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Bool => write!(f, "boolean"),
            DataType::Int8 => write!(f, "int8"),
            DataType::Int16 => write!(f, "int16"),
            DataType::Int32 => write!(f, "int32"),
            DataType::Int64 => write!(f, "int64"),
            DataType::UInt8 => write!(f, "uint8"),
            DataType::UInt16 => write!(f, "uint16"),
            DataType::UInt32 => write!(f, "uint32"),
            DataType::UInt64 => write!(f, "uint64"),
            DataType::Float32 => write!(f, "float32"),
            DataType::Float64 => write!(f, "float64"),
            DataType::Decimal { precision, scale } => write!(f, "decimal({precision}, {scale})"),
            DataType::String => write!(f, "string"),
            DataType::Binary => write!(f, "binary"),
            DataType::Date => write!(f, "date"),
            DataType::Time => write!(f, "time"),
            DataType::Timestamp { timezone: None } => write!(f, "timestamp"),
            DataType::Timestamp { timezone: Some(tz) } => write!(f, "timestamp('{tz}')"),
            DataType::Interval { unit } => write!(f, "interval('{}')", unit.code()),
            DataType::Geography => write!(f, "geography"),
            DataType::Array(element) => write!(f, "array<{element}>"),
            DataType::Struct(fields) => {
                write!(f, "struct<")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", field.name, field.data_type)?;
                }
                write!(f, ">")
            }
            DataType::Null => write!(f, "null"),
            DataType::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldType {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
}

impl FieldType {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Schema {
    pub fields: Vec<FieldType>,
}

impl Schema {
    pub fn new(fields: Vec<FieldType>) -> Self {
        Self { fields }
    }

    pub fn find_field(&self, name: &str) -> Option<&FieldType> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}

/// Temporal units shared by truncation, interval arithmetic and unix conversion.
///
/// Serialized with the short codes the host framework uses (`Y`, `ms`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntervalUnit {
    #[serde(rename = "Y")]
    Year,
    #[serde(rename = "Q")]
    Quarter,
    #[serde(rename = "M")]
    Month,
    #[serde(rename = "W")]
    Week,
    #[serde(rename = "D")]
    Day,
    #[serde(rename = "h")]
    Hour,
    #[serde(rename = "m")]
    Minute,
    #[serde(rename = "s")]
    Second,
    #[serde(rename = "ms")]
    Millisecond,
    #[serde(rename = "us")]
    Microsecond,
    #[serde(rename = "ns")]
    Nanosecond,
}

impl IntervalUnit {
    pub fn code(&self) -> &'static str {
        match self {
            IntervalUnit::Year => "Y",
            IntervalUnit::Quarter => "Q",
            IntervalUnit::Month => "M",
            IntervalUnit::Week => "W",
            IntervalUnit::Day => "D",
            IntervalUnit::Hour => "h",
            IntervalUnit::Minute => "m",
            IntervalUnit::Second => "s",
            IntervalUnit::Millisecond => "ms",
            IntervalUnit::Microsecond => "us",
            IntervalUnit::Nanosecond => "ns",
        }
    }

    pub fn sql_name(&self) -> &'static str {
        match self {
            IntervalUnit::Year => "YEAR",
            IntervalUnit::Quarter => "QUARTER",
            IntervalUnit::Month => "MONTH",
            IntervalUnit::Week => "WEEK",
            IntervalUnit::Day => "DAY",
            IntervalUnit::Hour => "HOUR",
            IntervalUnit::Minute => "MINUTE",
            IntervalUnit::Second => "SECOND",
            IntervalUnit::Millisecond => "MILLISECOND",
            IntervalUnit::Microsecond => "MICROSECOND",
            IntervalUnit::Nanosecond => "NANOSECOND",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Some(match code {
            "Y" => IntervalUnit::Year,
            "Q" => IntervalUnit::Quarter,
            "M" => IntervalUnit::Month,
            "W" => IntervalUnit::Week,
            "D" => IntervalUnit::Day,
            "h" => IntervalUnit::Hour,
            "m" => IntervalUnit::Minute,
            "s" => IntervalUnit::Second,
            "ms" => IntervalUnit::Millisecond,
            "us" => IntervalUnit::Microsecond,
            "ns" => IntervalUnit::Nanosecond,
            _ => return None,
        })
    }
}

/// Constant values carried by literals and bound to named parameters.
///
/// Struct values keep their field order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(String),
    String(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Interval(i64),
    Array(Vec<Value>),
    Struct(IndexMap<String, Value>),
}

impl Value {
    /// Short name of the runtime shape, used in dispatch errors
    pub fn shape_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Decimal(_) => "decimal",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::Timestamp(_) => "datetime",
            Value::TimestampTz(_) => "zoned datetime",
            Value::Interval(_) => "interval",
            Value::Array(_) => "list",
            Value::Struct(_) => "ordered mapping",
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// Named parameter values supplied at compile/execute time, in caller order
pub type Params = IndexMap<String, Value>;
