//! Binding named parameter values to BigQuery query parameters

use base64::{prelude::BASE64_STANDARD, Engine};
use bqsql_ir::{DataType, FieldType, Value};
use bqsql_registry::TranslateError;
use chrono::{DateTime, NaiveDate, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{json, Value as JsonValue};

use crate::datatypes::to_bigquery_type;
use crate::literal::{parse_date, parse_datetime};

/// A typed query parameter ready to send with a job
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueryParameter {
    Scalar(ScalarQueryParameter),
    Array(ArrayQueryParameter),
    Struct(StructQueryParameter),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScalarQueryParameter {
    pub name: String,
    pub type_name: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArrayQueryParameter {
    pub name: String,
    pub array_type: String,
    pub values: ArrayValues,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ArrayValues {
    Scalars(Vec<Value>),
    Structs(Vec<StructQueryParameter>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructQueryParameter {
    pub name: String,
    pub fields: Vec<QueryParameter>,
}

impl QueryParameter {
    pub fn name(&self) -> &str {
        match self {
            QueryParameter::Scalar(p) => &p.name,
            QueryParameter::Array(p) => &p.name,
            QueryParameter::Struct(p) => &p.name,
        }
    }

    /// BigQuery type of the parameter (`INT64`, `ARRAY`, `STRUCT`, ...)
    pub fn type_name(&self) -> &str {
        match self {
            QueryParameter::Scalar(p) => &p.type_name,
            QueryParameter::Array(_) => "ARRAY",
            QueryParameter::Struct(_) => "STRUCT",
        }
    }

    /// Wire representation used by the jobs.query REST call
    pub fn to_api_repr(&self) -> JsonValue {
        json!({
            "name": self.name(),
            "parameterType": self.parameter_type(),
            "parameterValue": self.parameter_value(),
        })
    }

    fn parameter_type(&self) -> JsonValue {
        match self {
            QueryParameter::Scalar(p) => json!({ "type": p.type_name }),
            QueryParameter::Array(p) => {
                let element = match &p.values {
                    ArrayValues::Structs(items) => match items.first() {
                        Some(first) => first.parameter_type(),
                        None => json!({ "type": "STRUCT", "structTypes": [] }),
                    },
                    ArrayValues::Scalars(_) => json!({ "type": p.array_type }),
                };
                json!({ "type": "ARRAY", "arrayType": element })
            }
            QueryParameter::Struct(p) => p.parameter_type(),
        }
    }

    fn parameter_value(&self) -> JsonValue {
        match self {
            QueryParameter::Scalar(p) => json!({ "value": scalar_wire_value(&p.value) }),
            QueryParameter::Array(p) => {
                let values: Vec<JsonValue> = match &p.values {
                    ArrayValues::Scalars(items) => items
                        .iter()
                        .map(|v| json!({ "value": scalar_wire_value(v) }))
                        .collect(),
                    ArrayValues::Structs(items) => items.iter().map(|s| s.parameter_value()).collect(),
                };
                json!({ "arrayValues": values })
            }
            QueryParameter::Struct(p) => p.parameter_value(),
        }
    }
}

impl StructQueryParameter {
    fn parameter_type(&self) -> JsonValue {
        let members: Vec<JsonValue> = self
            .fields
            .iter()
            .map(|f| json!({ "name": f.name(), "type": f.parameter_type() }))
            .collect();
        json!({ "type": "STRUCT", "structTypes": members })
    }

    fn parameter_value(&self) -> JsonValue {
        let mut values = serde_json::Map::new();
        for field in &self.fields {
            values.insert(field.name().to_string(), field.parameter_value());
        }
        json!({ "structValues": values })
    }
}

/// Scalars travel as strings on the wire
fn scalar_wire_value(value: &Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Bool(b) => JsonValue::String(b.to_string()),
        Value::Int(i) => JsonValue::String(i.to_string()),
        Value::Float(f) => JsonValue::String(f.to_string()),
        Value::Decimal(d) | Value::String(d) => JsonValue::String(d.clone()),
        Value::Date(d) => JsonValue::String(d.format("%Y-%m-%d").to_string()),
        Value::Time(t) => JsonValue::String(t.format("%H:%M:%S%.f").to_string()),
        Value::Timestamp(ts) => JsonValue::String(ts.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
        Value::TimestampTz(ts) => JsonValue::String(ts.format("%Y-%m-%d %H:%M:%S%.f%:z").to_string()),
        Value::Interval(n) => JsonValue::String(n.to_string()),
        Value::Bytes(b) => JsonValue::String(BASE64_STANDARD.encode(b)),
        Value::Array(_) | Value::Struct(_) => JsonValue::Null,
    }
}

/// Bind `value` as a parameter of the declared type
pub fn bind(name: &str, dtype: &DataType, value: &Value) -> Result<QueryParameter, TranslateError> {
    match (dtype, value) {
        (DataType::Struct(fields), Value::Struct(values)) => {
            Ok(QueryParameter::Struct(bind_struct(name, fields, values)?))
        }
        (DataType::Array(element), Value::Array(items)) => bind_array(name, element, items),
        (DataType::Timestamp { .. }, value) => {
            let ts = utc_timestamp_of(value).ok_or_else(|| no_binding(dtype, value))?;
            Ok(scalar(name, "TIMESTAMP", Value::TimestampTz(ts)))
        }
        (DataType::Date, value) => {
            let date = date_of(value).ok_or_else(|| no_binding(dtype, value))?;
            Ok(scalar(name, "DATE", Value::Date(date)))
        }
        (DataType::String, Value::String(_)) => Ok(scalar(name, "STRING", value.clone())),
        (dtype, Value::Int(_)) if dtype.is_integer() => Ok(scalar(name, "INT64", value.clone())),
        (dtype, Value::Float(_)) if dtype.is_floating() => Ok(scalar(name, "FLOAT64", value.clone())),
        (DataType::Bool, Value::Bool(_)) => Ok(scalar(name, "BOOL", value.clone())),
        (dtype, value) => Err(no_binding(dtype, value)),
    }
}

fn scalar(name: &str, type_name: &str, value: Value) -> QueryParameter {
    QueryParameter::Scalar(ScalarQueryParameter {
        name: name.to_string(),
        type_name: type_name.to_string(),
        value,
    })
}

fn no_binding(dtype: &DataType, value: &Value) -> TranslateError {
    TranslateError::ParameterBinding(format!(
        "no parameter binding for ({dtype}, {})",
        value.shape_name()
    ))
}

fn bind_struct(
    name: &str,
    fields: &[FieldType],
    values: &IndexMap<String, Value>,
) -> Result<StructQueryParameter, TranslateError> {
    let mut bound = Vec::with_capacity(values.len());
    for (field_name, value) in values {
        let field = fields.iter().find(|f| &f.name == field_name).ok_or_else(|| {
            TranslateError::ParameterBinding(format!(
                "struct parameter '{name}' has no field named '{field_name}'"
            ))
        })?;
        bound.push(bind(field_name, &field.data_type, value)?);
    }
    Ok(StructQueryParameter {
        name: name.to_string(),
        fields: bound,
    })
}

fn bind_array(name: &str, element: &DataType, items: &[Value]) -> Result<QueryParameter, TranslateError> {
    let values = match element {
        DataType::Struct(fields) => {
            let mut structs = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                let Value::Struct(values) = item else {
                    return Err(no_binding(element, item));
                };
                structs.push(bind_struct(&format!("element_{i}"), fields, values)?);
            }
            return Ok(QueryParameter::Array(ArrayQueryParameter {
                name: name.to_string(),
                array_type: "STRUCT".to_string(),
                values: ArrayValues::Structs(structs),
            }));
        }
        DataType::Array(_) => {
            return Err(TranslateError::UnsupportedType(
                "ARRAY<ARRAY<T>> is not supported in BigQuery".to_string(),
            ))
        }
        _ => {
            let mut scalars = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::Null => scalars.push(Value::Null),
                    item => match bind(name, element, item)? {
                        QueryParameter::Scalar(p) => scalars.push(p.value),
                        _ => return Err(no_binding(element, item)),
                    },
                }
            }
            scalars
        }
    };
    Ok(QueryParameter::Array(ArrayQueryParameter {
        name: name.to_string(),
        array_type: to_bigquery_type(element)?,
        values: ArrayValues::Scalars(values),
    }))
}

/// Naive values are taken to be UTC wall-clock times
fn utc_timestamp_of(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::TimestampTz(ts) => Some(*ts),
        Value::Timestamp(ts) => Some(ts.and_utc()),
        Value::Date(d) => d.and_hms_opt(0, 0, 0).map(|ts| ts.and_utc()),
        Value::String(s) => parse_datetime(s).map(|ts| ts.and_utc()),
        _ => None,
    }
}

fn date_of(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::Date(d) => Some(*d),
        Value::Timestamp(ts) => Some(ts.date()),
        Value::TimestampTz(ts) => Some(ts.date_naive()),
        Value::String(s) => parse_date(s),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn scalar_of(param: QueryParameter) -> ScalarQueryParameter {
        match param {
            QueryParameter::Scalar(p) => p,
            other => panic!("expected a scalar parameter, got {other:?}"),
        }
    }

    #[test]
    fn test_scalar_bindings() {
        let p = scalar_of(bind("n", &DataType::Int32, &Value::Int(5)).unwrap());
        assert_eq!((p.type_name.as_str(), p.value), ("INT64", Value::Int(5)));

        let p = scalar_of(bind("s", &DataType::String, &Value::from("x")).unwrap());
        assert_eq!(p.type_name, "STRING");

        let p = scalar_of(bind("b", &DataType::Bool, &Value::Bool(true)).unwrap());
        assert_eq!(p.type_name, "BOOL");
    }

    #[test]
    fn test_float_is_bit_exact() {
        let x = 0.1 + 0.2;
        let p = scalar_of(bind("x", &DataType::Float64, &Value::Float(x)).unwrap());
        match p.value {
            Value::Float(f) => assert_eq!(f.to_bits(), x.to_bits()),
            other => panic!("unexpected value {other:?}"),
        }
    }

    #[test]
    fn test_timestamp_normalized_to_utc() {
        let expected = Value::TimestampTz(Utc.with_ymd_and_hms(2017, 1, 1, 4, 55, 59).unwrap());
        for value in [
            Value::from("2017-01-01 04:55:59"),
            Value::from("2017-01-01T06:55:59+02:00"),
            Value::TimestampTz(Utc.with_ymd_and_hms(2017, 1, 1, 4, 55, 59).unwrap()),
        ] {
            let p = scalar_of(bind("ts", &DataType::utc_timestamp(), &value).unwrap());
            assert_eq!(p.type_name, "TIMESTAMP");
            assert_eq!(p.value, expected);
        }

        let p = scalar_of(bind("ts", &DataType::timestamp(), &Value::from("2017-01-01")).unwrap());
        assert_eq!(
            p.value,
            Value::TimestampTz(Utc.with_ymd_and_hms(2017, 1, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_date_bindings() {
        let day = NaiveDate::from_ymd_opt(2017, 1, 1).unwrap();
        for value in [
            Value::from("2017-01-01"),
            Value::Date(day),
            Value::Timestamp(day.and_hms_opt(13, 0, 0).unwrap()),
        ] {
            let p = scalar_of(bind("d", &DataType::Date, &value).unwrap());
            assert_eq!((p.type_name.as_str(), p.value), ("DATE", Value::Date(day)));
        }
    }

    #[test]
    fn test_struct_binding_keeps_value_order() {
        let dtype = DataType::Struct(vec![
            FieldType::new("a", DataType::Int64),
            FieldType::new("b", DataType::String),
        ]);
        let mut values = IndexMap::new();
        values.insert("b".to_string(), Value::from("x"));
        values.insert("a".to_string(), Value::Int(1));

        let QueryParameter::Struct(p) = bind("s", &dtype, &Value::Struct(values.clone())).unwrap() else {
            panic!("expected a struct parameter");
        };
        let names: Vec<&str> = p.fields.iter().map(|f| f.name()).collect();
        assert_eq!(names, ["b", "a"]);

        values.insert("c".to_string(), Value::Int(2));
        assert!(matches!(
            bind("s", &dtype, &Value::Struct(values)),
            Err(TranslateError::ParameterBinding(_))
        ));
    }

    #[test]
    fn test_array_bindings() {
        let ints = Value::Array(vec![Value::Int(1), Value::Int(2)]);
        let QueryParameter::Array(p) = bind("xs", &DataType::array(DataType::Int64), &ints).unwrap() else {
            panic!("expected an array parameter");
        };
        assert_eq!(p.array_type, "INT64");
        assert_eq!(p.values, ArrayValues::Scalars(vec![Value::Int(1), Value::Int(2)]));

        let element = DataType::Struct(vec![FieldType::new("a", DataType::Int64)]);
        let mut row = IndexMap::new();
        row.insert("a".to_string(), Value::Int(1));
        let rows = Value::Array(vec![Value::Struct(row.clone()), Value::Struct(row)]);
        let QueryParameter::Array(p) = bind("rows", &DataType::array(element), &rows).unwrap() else {
            panic!("expected an array parameter");
        };
        assert_eq!(p.array_type, "STRUCT");
        match &p.values {
            ArrayValues::Structs(items) => {
                assert_eq!(items[0].name, "element_0");
                assert_eq!(items[1].name, "element_1");
            }
            other => panic!("unexpected values {other:?}"),
        }

        let nested = DataType::array(DataType::array(DataType::Int64));
        let err = bind("xss", &nested, &Value::Array(vec![])).unwrap_err();
        assert_eq!(err.to_string(), "ARRAY<ARRAY<T>> is not supported in BigQuery");
    }

    #[test]
    fn test_unbindable_pairs() {
        let err = bind("x", &DataType::Int64, &Value::from("1")).unwrap_err();
        assert_eq!(err.to_string(), "no parameter binding for (int64, string)");
        assert!(bind("x", &DataType::Float64, &Value::Int(1)).is_err());
        assert!(bind("x", &DataType::Date, &Value::Bool(true)).is_err());
    }

    #[test]
    fn test_api_repr() {
        let p = bind("n", &DataType::Int64, &Value::Int(5)).unwrap();
        assert_eq!(
            p.to_api_repr(),
            json!({
                "name": "n",
                "parameterType": { "type": "INT64" },
                "parameterValue": { "value": "5" },
            })
        );

        let dtype = DataType::Struct(vec![FieldType::new("a", DataType::String)]);
        let mut values = IndexMap::new();
        values.insert("a".to_string(), Value::from("x"));
        let p = bind("s", &dtype, &Value::Struct(values)).unwrap();
        assert_eq!(
            p.to_api_repr(),
            json!({
                "name": "s",
                "parameterType": {
                    "type": "STRUCT",
                    "structTypes": [{ "name": "a", "type": { "type": "STRING" } }],
                },
                "parameterValue": { "structValues": { "a": { "value": "x" } } },
            })
        );
    }
}
