//! BigQuery literal syntax for constant values

use base64::{prelude::BASE64_STANDARD, Engine};
use bqsql_ir::{DataType, Value};
use bqsql_registry::base::{format_generic_literal, quote_string};
use bqsql_registry::TranslateError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

use crate::datatypes::to_bigquery_type;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";
const TIME_FORMAT: &str = "%H:%M:%S%.f";

/// Render a constant of the given declared type as BigQuery SQL
pub fn format_literal(value: &Value, dtype: &DataType) -> Result<String, TranslateError> {
    match (dtype, value) {
        (_, Value::Float(f)) if f.is_nan() => Ok("CAST('nan' AS FLOAT64)".to_string()),
        (_, Value::Float(f)) if f.is_infinite() => {
            let text = if f.is_sign_positive() { "inf" } else { "-inf" };
            Ok(format!("CAST('{text}' AS FLOAT64)"))
        }
        (_, Value::Null) => Ok("NULL".to_string()),
        (DataType::Date, value) => {
            let date = date_of(value).ok_or_else(|| unrepresentable(value, dtype))?;
            Ok(format!("DATE '{}'", date.format("%Y-%m-%d")))
        }
        (DataType::Timestamp { .. }, Value::TimestampTz(ts)) => {
            Ok(format!("TIMESTAMP '{}'", ts.format("%Y-%m-%d %H:%M:%S%.f%:z")))
        }
        (DataType::Timestamp { .. }, value) => {
            let ts = datetime_of(value).ok_or_else(|| unrepresentable(value, dtype))?;
            Ok(format!("TIMESTAMP '{}'", ts.format(TIMESTAMP_FORMAT)))
        }
        (DataType::Time, value) => {
            let time = time_of(value).ok_or_else(|| unrepresentable(value, dtype))?;
            Ok(format!("TIME '{}'", time.format(TIME_FORMAT)))
        }
        (DataType::Binary, Value::Bytes(bytes)) => {
            Ok(format!("FROM_BASE64('{}')", BASE64_STANDARD.encode(bytes)))
        }
        (DataType::Decimal { .. }, Value::Decimal(d)) => {
            Ok(format!("{} {}", to_bigquery_type(dtype)?, quote_string(d)))
        }
        (DataType::Struct(fields), Value::Struct(values)) => {
            let mut parts = Vec::with_capacity(values.len());
            for (name, v) in values {
                let field = fields
                    .iter()
                    .find(|f| &f.name == name)
                    .ok_or_else(|| unrepresentable(value, dtype))?;
                parts.push(format!(
                    "{} AS {}",
                    format_literal(v, &field.data_type)?,
                    bqsql_registry::helpers::backtick_quote(name)
                ));
            }
            Ok(format!("STRUCT({})", parts.join(", ")))
        }
        (DataType::Array(element), Value::Array(items)) => {
            let mut parts = Vec::with_capacity(items.len());
            for item in items {
                parts.push(format_literal(item, element)?);
            }
            Ok(format!("[{}]", parts.join(", ")))
        }
        (DataType::Binary | DataType::Struct(_) | DataType::Array(_), _) => {
            Err(unrepresentable(value, dtype))
        }
        _ => format_generic_literal(value, dtype).map_err(|_| unrepresentable(value, dtype)),
    }
}

fn unrepresentable(value: &Value, dtype: &DataType) -> TranslateError {
    TranslateError::UnrepresentableLiteral {
        value: value.shape_name().to_string(),
        dtype: dtype.to_string(),
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

fn datetime_of(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::Timestamp(ts) => Some(*ts),
        Value::Date(d) => d.and_hms_opt(0, 0, 0),
        Value::String(s) => parse_datetime(s),
        _ => None,
    }
}

fn time_of(value: &Value) -> Option<NaiveTime> {
    match value {
        Value::Time(t) => Some(*t),
        Value::Timestamp(ts) => Some(ts.time()),
        Value::String(s) => parse_time(s),
        _ => None,
    }
}

/// Parse an ISO-like date-time; zoned input is converted to UTC
pub(crate) fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(zoned) = DateTime::parse_from_rfc3339(s) {
        return Some(zoned.naive_utc());
    }
    for format in [TIMESTAMP_FORMAT, "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, format) {
            return Some(ts);
        }
    }
    parse_plain_date(s).and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Parse a date, accepting a full date-time and truncating it
pub(crate) fn parse_date(s: &str) -> Option<NaiveDate> {
    parse_plain_date(s.trim()).or_else(|| parse_datetime(s).map(|ts| ts.date()))
}

fn parse_plain_date(s: &str) -> Option<NaiveDate> {
    ["%Y-%m-%d", "%Y%m%d"]
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(s, format).ok())
}

pub(crate) fn parse_time(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    [TIME_FORMAT, "%H:%M"]
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(s, format).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bqsql_ir::FieldType;
    use chrono::{TimeZone, Utc};
    use indexmap::IndexMap;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_non_finite_floats() {
        assert_eq!(format_literal(&Value::Float(f64::NAN), &DataType::Float64).unwrap(), "CAST('nan' AS FLOAT64)");
        assert_eq!(format_literal(&Value::Float(f64::INFINITY), &DataType::Float64).unwrap(), "CAST('inf' AS FLOAT64)");
        assert_eq!(
            format_literal(&Value::Float(f64::NEG_INFINITY), &DataType::Float64).unwrap(),
            "CAST('-inf' AS FLOAT64)"
        );
        assert_eq!(format_literal(&Value::Float(1.5), &DataType::Float64).unwrap(), "1.5");
    }

    #[test]
    fn test_date_literals() {
        let expected = "DATE '2017-01-01'";
        assert_eq!(format_literal(&Value::Date(date(2017, 1, 1)), &DataType::Date).unwrap(), expected);
        assert_eq!(format_literal(&Value::from("2017-01-01"), &DataType::Date).unwrap(), expected);

        let midnight = date(2017, 1, 1).and_hms_opt(0, 0, 0).unwrap();
        assert_eq!(format_literal(&Value::Timestamp(midnight), &DataType::Date).unwrap(), expected);

        let late = date(2017, 1, 1).and_hms_opt(23, 59, 1).unwrap();
        assert_eq!(format_literal(&Value::Timestamp(late), &DataType::Date).unwrap(), expected);
    }

    #[test]
    fn test_timestamp_literals() {
        let expected = "TIMESTAMP '2017-01-01 04:55:59'";
        let ts = date(2017, 1, 1).and_hms_opt(4, 55, 59).unwrap();
        assert_eq!(format_literal(&Value::Timestamp(ts), &DataType::timestamp()).unwrap(), expected);
        assert_eq!(
            format_literal(&Value::from("2017-01-01 04:55:59"), &DataType::timestamp()).unwrap(),
            expected
        );
        assert_eq!(
            format_literal(&Value::from("2017-01-01T04:55:59"), &DataType::timestamp()).unwrap(),
            expected
        );

        let precise = date(2017, 1, 1).and_hms_micro_opt(4, 55, 59, 123_456).unwrap();
        assert_eq!(
            format_literal(&Value::Timestamp(precise), &DataType::timestamp()).unwrap(),
            "TIMESTAMP '2017-01-01 04:55:59.123456'"
        );

        let zoned = Utc.with_ymd_and_hms(2017, 1, 1, 4, 55, 59).unwrap();
        assert_eq!(
            format_literal(&Value::TimestampTz(zoned), &DataType::utc_timestamp()).unwrap(),
            "TIMESTAMP '2017-01-01 04:55:59+00:00'"
        );
    }

    #[test]
    fn test_time_literals() {
        let t = NaiveTime::from_hms_opt(4, 55, 59).unwrap();
        assert_eq!(format_literal(&Value::Time(t), &DataType::Time).unwrap(), "TIME '04:55:59'");
        assert_eq!(format_literal(&Value::from("04:55:59"), &DataType::Time).unwrap(), "TIME '04:55:59'");
    }

    #[test]
    fn test_bytes_literal() {
        assert_eq!(
            format_literal(&Value::Bytes(b"test of hash".to_vec()), &DataType::Binary).unwrap(),
            "FROM_BASE64('dGVzdCBvZiBoYXNo')"
        );
    }

    #[test]
    fn test_struct_and_array_literals() {
        let dtype = DataType::Struct(vec![
            FieldType::new("a", DataType::Int64),
            FieldType::new("b", DataType::String),
        ]);
        let mut values = IndexMap::new();
        values.insert("b".to_string(), Value::from("x"));
        values.insert("a".to_string(), Value::Int(1));
        assert_eq!(
            format_literal(&Value::Struct(values), &dtype).unwrap(),
            "STRUCT('x' AS `b`, 1 AS `a`)"
        );

        let dates = Value::Array(vec![Value::from("2020-01-01"), Value::Null]);
        assert_eq!(
            format_literal(&dates, &DataType::array(DataType::Date)).unwrap(),
            "[DATE '2020-01-01', NULL]"
        );
    }

    #[test]
    fn test_numeric_and_strings() {
        assert_eq!(
            format_literal(&Value::Decimal("1.25".into()), &DataType::Decimal { precision: 38, scale: 9 }).unwrap(),
            "NUMERIC '1.25'"
        );
        assert_eq!(format_literal(&Value::from("it's"), &DataType::String).unwrap(), "'it\\'s'");
        assert_eq!(format_literal(&Value::Bool(true), &DataType::Bool).unwrap(), "TRUE");
    }

    #[test]
    fn test_backslashes_cannot_end_a_string() {
        let fmt = |s: &str| format_literal(&Value::from(s), &DataType::String).unwrap();
        assert_eq!(fmt(r"C:\path\"), r"'C:\\path\\'");
        assert_eq!(fmt(r"x\' OR TRUE --"), r"'x\\\' OR TRUE --'");
        assert_eq!(fmt("two\nlines\r"), r"'two\nlines\r'");
    }

    #[test]
    fn test_shape_mismatch_is_unrepresentable() {
        let err = format_literal(&Value::Int(3), &DataType::Date).unwrap_err();
        assert!(matches!(err, TranslateError::UnrepresentableLiteral { .. }));

        let err = format_literal(&Value::from("not a date"), &DataType::Date).unwrap_err();
        assert!(matches!(err, TranslateError::UnrepresentableLiteral { .. }));

        let err = format_literal(&Value::Int(1), &DataType::array(DataType::Int64)).unwrap_err();
        assert!(matches!(err, TranslateError::UnrepresentableLiteral { .. }));
    }
}
