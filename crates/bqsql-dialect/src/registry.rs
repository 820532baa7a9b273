//! BigQuery operation registry
//!
//! The generic SQL registry with BigQuery formatters layered on top, minus the
//! operations BigQuery has no equivalent for.

use bqsql_ir::{
    Agg, BinaryOp, DataType, Expr, Func, GeoFunc, IntervalOp, IntervalUnit, Op, OpKind, SetOpKind,
    TemporalKind, Value,
};
use bqsql_registry::helpers::{
    backtick_quote, fixed_arity, malformed, reduction, translate_all, unary, variadic, wrap_where,
};
use bqsql_registry::{base, formatter, ExprTranslator, Formatter, OperationRegistry, TranslateError};

use crate::datatypes::to_bigquery_type;
use crate::literal::format_literal;

/// Operations removed from the generic layer
pub const INVALID_OPERATIONS: [OpKind; 5] = [
    OpKind::Call(Func::Translate),
    OpKind::Call(Func::FindInSet),
    OpKind::Call(Func::Capitalize),
    OpKind::Call(Func::DateDiff),
    OpKind::Call(Func::TimestampDiff),
];

const DATE_UNITS: [IntervalUnit; 5] = [
    IntervalUnit::Year,
    IntervalUnit::Quarter,
    IntervalUnit::Month,
    IntervalUnit::Week,
    IntervalUnit::Day,
];

const TIME_UNITS: [IntervalUnit; 5] = [
    IntervalUnit::Hour,
    IntervalUnit::Minute,
    IntervalUnit::Second,
    IntervalUnit::Millisecond,
    IntervalUnit::Microsecond,
];

pub fn operation_registry() -> OperationRegistry {
    let mut builder = base::operation_registry()
        .to_builder()
        .register(OpKind::Literal, formatter(literal))
        .register(OpKind::Cast, formatter(cast))
        .register(OpKind::Binary(BinaryOp::Divide), formatter(divide))
        .register(OpKind::Binary(BinaryOp::Modulus), fixed_arity("MOD", 2))
        .register(OpKind::Truncate(TemporalKind::Date), truncate("DATE", &DATE_UNITS))
        .register(OpKind::Truncate(TemporalKind::Time), truncate("TIME", &TIME_UNITS))
        .register(OpKind::Truncate(TemporalKind::Timestamp), truncate("TIMESTAMP", &[&DATE_UNITS[..], &TIME_UNITS[..]].concat()))
        .register(OpKind::IntervalArithmetic(IntervalOp::DateAdd), interval_op("DATE_ADD", &DATE_UNITS))
        .register(OpKind::IntervalArithmetic(IntervalOp::DateSub), interval_op("DATE_SUB", &DATE_UNITS))
        .register(OpKind::IntervalArithmetic(IntervalOp::TimestampAdd), interval_op("TIMESTAMP_ADD", &TIME_UNITS))
        .register(OpKind::IntervalArithmetic(IntervalOp::TimestampSub), interval_op("TIMESTAMP_SUB", &TIME_UNITS))
        .register(OpKind::TimestampFromUnix, formatter(timestamp_from_unix))
        .register(OpKind::StringFind, formatter(string_find))
        .register(OpKind::Hash, formatter(hash))
        .register(OpKind::HashBytes, formatter(hash_bytes))
        .register(OpKind::Strftime, formatter(strftime))
        .register(OpKind::StringToTimestamp, formatter(string_to_timestamp))
        .register(OpKind::StructField, formatter(struct_field))
        .register(OpKind::Arbitrary, formatter(arbitrary))
        .register(OpKind::Covariance, formatter(covariance));

    for kind in [SetOpKind::Union, SetOpKind::Intersection, SetOpKind::Difference] {
        builder = builder.register(OpKind::SetOp(kind), formatter(set_op));
    }

    let calls = [
        // Logical and math
        (Func::IfNull, fixed_arity("IFNULL", 2)),
        (Func::Floor, formatter(floor)),
        (Func::Log, formatter(log)),
        (Func::Sign, unary("SIGN")),
        // Temporal
        (Func::Date, unary("DATE")),
        (Func::Time, unary("TIME")),
        (Func::TimestampNow, fixed_arity("CURRENT_TIMESTAMP", 0)),
        (Func::DayOfWeekIndex, formatter(day_of_week_index)),
        (Func::ExtractYear, extract("year")),
        (Func::ExtractQuarter, extract("quarter")),
        (Func::ExtractMonth, extract("month")),
        (Func::ExtractDay, extract("day")),
        (Func::ExtractHour, extract("hour")),
        (Func::ExtractMinute, extract("minute")),
        (Func::ExtractSecond, extract("second")),
        (Func::ExtractMillisecond, extract("millisecond")),
        (Func::ExtractEpochSeconds, unary("UNIX_SECONDS")),
        // Strings
        (Func::StringReplace, fixed_arity("REPLACE", 3)),
        (Func::StringSplit, fixed_arity("SPLIT", 2)),
        (Func::StringConcat, variadic("CONCAT")),
        (Func::StringJoin, formatter(string_join)),
        (Func::StringAscii, formatter(string_ascii)),
        (Func::Substring, formatter(substring)),
        (Func::StrRight, formatter(string_right)),
        (Func::Repeat, fixed_arity("REPEAT", 2)),
        (Func::RegexSearch, formatter(regex_search)),
        (Func::RegexExtract, formatter(regex_extract)),
        (Func::RegexReplace, formatter(regex_replace)),
        // Arrays
        (Func::ArrayIndex, formatter(array_index)),
        (Func::ArrayConcat, variadic("ARRAY_CONCAT")),
        (Func::ArrayLength, unary("ARRAY_LENGTH")),
    ];
    for (func, f) in calls {
        builder = builder.register(OpKind::Call(func), f);
    }

    for (geo, f) in geo_formatters() {
        builder = builder.register(OpKind::Call(Func::Geo(geo)), f);
    }

    let reductions = [
        (Agg::GroupConcat, reduction("STRING_AGG")),
        (Agg::ArrayCollect, reduction("ARRAY_AGG")),
        (Agg::ApproxCountDistinct, reduction("APPROX_COUNT_DISTINCT")),
        (Agg::ApproxMedian, formatter(approx_median)),
        (Agg::BitAnd, reduction("BIT_AND")),
        (Agg::BitOr, reduction("BIT_OR")),
        (Agg::BitXor, reduction("BIT_XOR")),
        (Agg::Any, logical_aggregate("LOGICAL_OR({})")),
        (Agg::All, logical_aggregate("LOGICAL_AND({})")),
        (Agg::NotAny, logical_aggregate("LOGICAL_AND(NOT ({}))")),
        (Agg::NotAll, logical_aggregate("LOGICAL_OR(NOT ({}))")),
        (Agg::GeoUnionAgg, reduction("ST_UNION_AGG")),
    ];
    for (agg, f) in reductions {
        builder = builder.register(OpKind::Reduction(agg), f);
    }

    for kind in INVALID_OPERATIONS {
        builder = builder.remove(kind);
    }

    builder.build()
}

fn geo_formatters() -> Vec<(GeoFunc, Formatter)> {
    vec![
        (GeoFunc::Area, unary("ST_AREA")),
        (GeoFunc::AsBinary, unary("ST_ASBINARY")),
        (GeoFunc::AsText, unary("ST_ASTEXT")),
        (GeoFunc::Azimuth, fixed_arity("ST_AZIMUTH", 2)),
        (GeoFunc::Buffer, fixed_arity("ST_BUFFER", 2)),
        (GeoFunc::Centroid, unary("ST_CENTROID")),
        (GeoFunc::Contains, fixed_arity("ST_CONTAINS", 2)),
        (GeoFunc::Covers, fixed_arity("ST_COVERS", 2)),
        (GeoFunc::CoveredBy, fixed_arity("ST_COVEREDBY", 2)),
        (GeoFunc::DWithin, fixed_arity("ST_DWITHIN", 3)),
        (GeoFunc::Difference, fixed_arity("ST_DIFFERENCE", 2)),
        (GeoFunc::Disjoint, fixed_arity("ST_DISJOINT", 2)),
        (GeoFunc::Distance, fixed_arity("ST_DISTANCE", 2)),
        (GeoFunc::EndPoint, unary("ST_ENDPOINT")),
        (GeoFunc::Equals, fixed_arity("ST_EQUALS", 2)),
        (GeoFunc::GeometryType, unary("ST_GEOMETRYTYPE")),
        (GeoFunc::Intersection, fixed_arity("ST_INTERSECTION", 2)),
        (GeoFunc::Intersects, fixed_arity("ST_INTERSECTS", 2)),
        (GeoFunc::Length, unary("ST_LENGTH")),
        (GeoFunc::MaxDistance, fixed_arity("ST_MAXDISTANCE", 2)),
        (GeoFunc::NPoints, unary("ST_NUMPOINTS")),
        (GeoFunc::Perimeter, unary("ST_PERIMETER")),
        (GeoFunc::Point, fixed_arity("ST_GEOGPOINT", 2)),
        (GeoFunc::PointN, fixed_arity("ST_POINTN", 2)),
        (GeoFunc::Simplify, formatter(geo_simplify)),
        (GeoFunc::StartPoint, unary("ST_STARTPOINT")),
        (GeoFunc::Touches, fixed_arity("ST_TOUCHES", 2)),
        (GeoFunc::Union, fixed_arity("ST_UNION", 2)),
        (GeoFunc::Within, fixed_arity("ST_WITHIN", 2)),
        (GeoFunc::X, unary("ST_X")),
        (GeoFunc::XMax, bounding_box("xmax")),
        (GeoFunc::XMin, bounding_box("xmin")),
        (GeoFunc::Y, unary("ST_Y")),
        (GeoFunc::YMax, bounding_box("ymax")),
        (GeoFunc::YMin, bounding_box("ymin")),
    ]
}

/// Exactly `N` operands, or a malformed-node error
fn args<const N: usize>(expr: &Expr) -> Result<[&Expr; N], TranslateError> {
    let operands = expr.operands();
    let found = operands.len();
    operands
        .try_into()
        .map_err(|_| malformed(expr, format!("expected {N} arguments, got {found}")))
}

fn literal(_t: &mut dyn ExprTranslator, expr: &Expr) -> Result<String, TranslateError> {
    match expr.literal_value() {
        Some(value) => format_literal(value, &expr.dtype),
        None => Err(malformed(expr, "expected a literal")),
    }
}

/// Cast rules keyed on (source, target) type
pub fn bigquery_cast(compiled: &str, from: &DataType, to: &DataType) -> Result<String, TranslateError> {
    match (from, to) {
        (DataType::Timestamp { .. }, to) if to.is_integer() => Ok(format!("UNIX_MICROS({compiled})")),
        (_, to) => Ok(format!("CAST({compiled} AS {})", to_bigquery_type(to)?)),
    }
}

fn cast(t: &mut dyn ExprTranslator, expr: &Expr) -> Result<String, TranslateError> {
    let [arg] = args::<1>(expr)?;
    bigquery_cast(&t.translate(arg)?, &arg.dtype, &expr.dtype)
}

/// Floating point division
fn divide(t: &mut dyn ExprTranslator, expr: &Expr) -> Result<String, TranslateError> {
    let [left, right] = args::<2>(expr)?;
    Ok(format!("IEEE_DIVIDE({}, {})", t.translate(left)?, t.translate(right)?))
}

fn floor(t: &mut dyn ExprTranslator, expr: &Expr) -> Result<String, TranslateError> {
    let [arg] = args::<1>(expr)?;
    Ok(format!("CAST(FLOOR({}) AS {})", t.translate(arg)?, to_bigquery_type(&expr.dtype)?))
}

fn log(t: &mut dyn ExprTranslator, expr: &Expr) -> Result<String, TranslateError> {
    match expr.operands().as_slice() {
        [arg] => Ok(format!("ln({})", t.translate(arg)?)),
        [arg, base] => Ok(format!("log({}, {})", t.translate(arg)?, t.translate(base)?)),
        _ => Err(malformed(expr, "expected one or two arguments")),
    }
}

fn extract(field: &'static str) -> Formatter {
    formatter(move |t, expr| {
        let [arg] = args::<1>(expr)?;
        Ok(format!("EXTRACT({field} from {})", t.translate(arg)?))
    })
}

/// Monday-based day of week, 0 through 6
fn day_of_week_index(t: &mut dyn ExprTranslator, expr: &Expr) -> Result<String, TranslateError> {
    let [arg] = args::<1>(expr)?;
    Ok(format!("MOD(EXTRACT(DAYOFWEEK FROM {}) + 5, 7)", t.translate(arg)?))
}

fn truncate(kind: &'static str, units: &[IntervalUnit]) -> Formatter {
    let units = units.to_vec();
    formatter(move |t, expr| {
        let Op::Truncate { arg, unit, .. } = &expr.op else {
            return Err(malformed(expr, "expected a truncation"));
        };
        if !units.contains(unit) {
            return Err(TranslateError::unsupported(format!(
                "BigQuery does not support truncating {} values to unit '{}'",
                arg.dtype,
                unit.code()
            )));
        }
        Ok(format!("{kind}_TRUNC({}, {})", t.translate(arg)?, unit.sql_name()))
    })
}

fn interval_op(func: &'static str, units: &[IntervalUnit]) -> Formatter {
    let units = units.to_vec();
    formatter(move |t, expr| {
        let Op::IntervalArithmetic { arg, offset, .. } = &expr.op else {
            return Err(malformed(expr, "expected interval arithmetic"));
        };
        let DataType::Interval { unit } = &offset.dtype else {
            return Err(malformed(expr, format!("offset must be an interval, got {}", offset.dtype)));
        };
        if !units.contains(unit) {
            return Err(TranslateError::unsupported(format!(
                "BigQuery does not allow binary operation {func} with INTERVAL offset {}",
                unit.code()
            )));
        }
        Ok(format!("{func}({}, {})", t.translate(arg)?, t.translate(offset)?))
    })
}

fn timestamp_from_unix(t: &mut dyn ExprTranslator, expr: &Expr) -> Result<String, TranslateError> {
    let Op::TimestampFromUnix { arg, unit } = &expr.op else {
        return Err(malformed(expr, "expected a unix timestamp conversion"));
    };
    let arg = t.translate(arg)?;
    match unit {
        IntervalUnit::Second => Ok(format!("TIMESTAMP_SECONDS({arg})")),
        IntervalUnit::Millisecond => Ok(format!("TIMESTAMP_MILLIS({arg})")),
        IntervalUnit::Microsecond => Ok(format!("TIMESTAMP_MICROS({arg})")),
        // Timestamps are stored as microseconds, so nanoseconds are rounded
        IntervalUnit::Nanosecond => Ok(format!("TIMESTAMP_MICROS(CAST(ROUND({arg} / 1000) AS INT64))")),
        other => Err(TranslateError::not_implemented(format!("cannot cast unit {}", other.code()))),
    }
}

fn struct_field(t: &mut dyn ExprTranslator, expr: &Expr) -> Result<String, TranslateError> {
    let Op::StructField { arg, field } = &expr.op else {
        return Err(malformed(expr, "expected a struct field"));
    };
    Ok(format!("{}.{}", t.translate(arg)?, backtick_quote(field)))
}

/// `SAFE_OFFSET` yields NULL when the index is out of bounds
fn array_index(t: &mut dyn ExprTranslator, expr: &Expr) -> Result<String, TranslateError> {
    let [array, index] = args::<2>(expr)?;
    Ok(format!("{}[SAFE_OFFSET({})]", t.translate(array)?, t.translate(index)?))
}

fn hash(t: &mut dyn ExprTranslator, expr: &Expr) -> Result<String, TranslateError> {
    let Op::Hash { arg, how } = &expr.op else {
        return Err(malformed(expr, "expected a hash"));
    };
    match how.as_str() {
        "farm_fingerprint" => Ok(format!("farm_fingerprint({})", t.translate(arg)?)),
        other => Err(TranslateError::unsupported(format!(
            "hash method '{other}' is not supported by BigQuery"
        ))),
    }
}

fn hash_bytes(t: &mut dyn ExprTranslator, expr: &Expr) -> Result<String, TranslateError> {
    let Op::HashBytes { arg, how } = &expr.op else {
        return Err(malformed(expr, "expected a hashbytes"));
    };
    match how.as_str() {
        "md5" | "sha1" | "sha256" | "sha512" => Ok(format!("{how}({})", t.translate(arg)?)),
        other => Err(TranslateError::unsupported(format!(
            "hashbytes method '{other}' is not supported by BigQuery"
        ))),
    }
}

fn string_find(t: &mut dyn ExprTranslator, expr: &Expr) -> Result<String, TranslateError> {
    let Op::StringFind { arg, substr, start, end } = &expr.op else {
        return Err(malformed(expr, "expected a string find"));
    };
    if start.is_some() {
        return Err(TranslateError::not_implemented("start not implemented for string find"));
    }
    if end.is_some() {
        return Err(TranslateError::not_implemented("end not implemented for string find"));
    }
    Ok(format!("STRPOS({}, {}) - 1", t.translate(arg)?, t.translate(substr)?))
}

/// `r'..'` for a pattern with no quote, no line break and no dangling backslash
fn raw_string(pattern: &str) -> Option<String> {
    let trailing = pattern.chars().rev().take_while(|c| *c == '\\').count();
    if pattern.contains(['\'', '\n', '\r']) || trailing % 2 == 1 {
        return None;
    }
    Some(format!("r'{pattern}'"))
}

/// Literal patterns are written as raw strings where they can be
fn translate_pattern(t: &mut dyn ExprTranslator, pattern: &Expr) -> Result<String, TranslateError> {
    if let Some(Value::String(s)) = pattern.literal_value() {
        if let Some(raw) = raw_string(s) {
            return Ok(raw);
        }
    }
    t.translate(pattern)
}

fn regex_search(t: &mut dyn ExprTranslator, expr: &Expr) -> Result<String, TranslateError> {
    let [arg, pattern] = args::<2>(expr)?;
    let regex = translate_pattern(t, pattern)?;
    Ok(format!("REGEXP_CONTAINS({}, {regex})", t.translate(arg)?))
}

fn regex_extract(t: &mut dyn ExprTranslator, expr: &Expr) -> Result<String, TranslateError> {
    let [arg, pattern, index] = args::<3>(expr)?;
    let regex = translate_pattern(t, pattern)?;
    Ok(format!(
        "REGEXP_EXTRACT_ALL({}, {regex})[SAFE_OFFSET({})]",
        t.translate(arg)?,
        t.translate(index)?
    ))
}

fn regex_replace(t: &mut dyn ExprTranslator, expr: &Expr) -> Result<String, TranslateError> {
    let [arg, pattern, replacement] = args::<3>(expr)?;
    let regex = translate_pattern(t, pattern)?;
    Ok(format!(
        "REGEXP_REPLACE({}, {regex}, {})",
        t.translate(arg)?,
        t.translate(replacement)?
    ))
}

/// Operands are the separator followed by the strings to join
fn string_join(t: &mut dyn ExprTranslator, expr: &Expr) -> Result<String, TranslateError> {
    let operands = expr.operands();
    let Some((sep, values)) = operands.split_first() else {
        return Err(malformed(expr, "expected a separator"));
    };
    let values = translate_all(t, values)?;
    Ok(format!("ARRAY_TO_STRING([{}], {})", values.join(", "), t.translate(sep)?))
}

fn string_ascii(t: &mut dyn ExprTranslator, expr: &Expr) -> Result<String, TranslateError> {
    let [arg] = args::<1>(expr)?;
    Ok(format!("TO_CODE_POINTS({})[SAFE_OFFSET(0)]", t.translate(arg)?))
}

fn string_right(t: &mut dyn ExprTranslator, expr: &Expr) -> Result<String, TranslateError> {
    let [arg, nchars] = args::<2>(expr)?;
    let arg = t.translate(arg)?;
    Ok(format!("SUBSTR({arg}, -LEAST(LENGTH({arg}), {}))", t.translate(nchars)?))
}

fn substring(t: &mut dyn ExprTranslator, expr: &Expr) -> Result<String, TranslateError> {
    if let [_, _, length] = expr.operands().as_slice() {
        if matches!(length.literal_value(), Some(bqsql_ir::Value::Int(n)) if *n < 0) {
            return Err(TranslateError::InvalidValue(
                "Length parameter should not be a negative value.".to_string(),
            ));
        }
    }
    base::substring(t, expr)
}

fn strftime(t: &mut dyn ExprTranslator, expr: &Expr) -> Result<String, TranslateError> {
    let Op::Strftime { arg, format } = &expr.op else {
        return Err(malformed(expr, "expected a strftime"));
    };
    let fmt = t.translate(format)?;
    let rendered = t.translate(arg)?;
    match &arg.dtype {
        DataType::Date => Ok(format!("FORMAT_DATE({fmt}, {rendered})")),
        DataType::Time => Ok(format!("FORMAT_TIME({fmt}, {rendered})")),
        DataType::Timestamp { timezone } => Ok(format!(
            "FORMAT_TIMESTAMP({fmt}, {rendered}, {})",
            base::quote_string(timezone.as_deref().unwrap_or("UTC"))
        )),
        other => Err(TranslateError::unsupported(format!("cannot format values of type {other}"))),
    }
}

fn string_to_timestamp(t: &mut dyn ExprTranslator, expr: &Expr) -> Result<String, TranslateError> {
    let Op::StringToTimestamp { arg, format, timezone } = &expr.op else {
        return Err(malformed(expr, "expected a timestamp parse"));
    };
    let fmt = t.translate(format)?;
    let rendered = t.translate(arg)?;
    match timezone {
        Some(tz) => Ok(format!("PARSE_TIMESTAMP({fmt}, {rendered}, {})", t.translate(tz)?)),
        None => Ok(format!("PARSE_TIMESTAMP({fmt}, {rendered})")),
    }
}

fn approx_median(t: &mut dyn ExprTranslator, expr: &Expr) -> Result<String, TranslateError> {
    let Op::Reduction { args, filter, .. } = &expr.op else {
        return Err(malformed(expr, "expected a reduction"));
    };
    let [arg] = args.as_slice() else {
        return Err(malformed(expr, "expected one argument"));
    };
    let arg = wrap_where(arg, filter.as_deref());
    Ok(format!("APPROX_QUANTILES({}, 2)[OFFSET(1)]", t.translate(&arg)?))
}

/// Boolean aggregates rendered from a template with one `{}` slot
fn logical_aggregate(template: &'static str) -> Formatter {
    formatter(move |t, expr| {
        let Op::Reduction { args, filter, .. } = &expr.op else {
            return Err(malformed(expr, "expected a reduction"));
        };
        let [arg] = args.as_slice() else {
            return Err(malformed(expr, "expected one argument"));
        };
        let rendered = t.translate(&wrap_where(arg, filter.as_deref()))?;
        Ok(template.replacen("{}", &rendered, 1))
    })
}

fn arbitrary(t: &mut dyn ExprTranslator, expr: &Expr) -> Result<String, TranslateError> {
    let Op::Arbitrary { arg, how, filter } = &expr.op else {
        return Err(malformed(expr, "expected an arbitrary"));
    };
    if let Some(how) = how.as_deref().filter(|h| *h != "first") {
        return Err(TranslateError::unsupported(format!(
            "'{how}' value not supported for arbitrary in BigQuery"
        )));
    }
    let arg = wrap_where(arg, filter.as_deref());
    Ok(format!("ANY_VALUE({})", t.translate(&arg)?))
}

fn covariance(t: &mut dyn ExprTranslator, expr: &Expr) -> Result<String, TranslateError> {
    let Op::Covariance { left, right, how, filter } = &expr.op else {
        return Err(malformed(expr, "expected a covariance"));
    };
    let suffix = match how.as_str() {
        "sample" => "SAMP",
        "pop" => "POP",
        other => {
            return Err(TranslateError::unsupported(format!(
                "Covariance with how='{other}' is not supported."
            )))
        }
    };
    let left = wrap_where(left, filter.as_deref());
    let right = wrap_where(right, filter.as_deref());
    Ok(format!("COVAR_{suffix}({}, {})", t.translate(&left)?, t.translate(&right)?))
}

fn bounding_box(dimension: &'static str) -> Formatter {
    formatter(move |t, expr| {
        let [geog] = args::<1>(expr)?;
        Ok(format!("ST_BOUNDINGBOX({}).{dimension}", t.translate(geog)?))
    })
}

fn geo_simplify(t: &mut dyn ExprTranslator, expr: &Expr) -> Result<String, TranslateError> {
    let [geog, tolerance, preserve_collapsed] = args::<3>(expr)?;
    if preserve_collapsed.literal_value().and_then(|v| v.as_bool()) == Some(true) {
        return Err(TranslateError::unsupported(
            "BigQuery simplify does not support preserving collapsed geometries, \
             must pass preserve_collapsed=False",
        ));
    }
    Ok(format!("ST_SIMPLIFY({}, {})", t.translate(geog)?, t.translate(tolerance)?))
}

fn set_keyword(kind: SetOpKind, distinct: bool) -> Result<&'static str, TranslateError> {
    match (kind, distinct) {
        (SetOpKind::Union, true) => Ok("UNION DISTINCT"),
        (SetOpKind::Union, false) => Ok("UNION ALL"),
        (SetOpKind::Intersection, true) => Ok("INTERSECT DISTINCT"),
        (SetOpKind::Difference, true) => Ok("EXCEPT DISTINCT"),
        (SetOpKind::Intersection, false) => Err(TranslateError::unsupported("BigQuery does not support INTERSECT ALL")),
        (SetOpKind::Difference, false) => Err(TranslateError::unsupported("BigQuery does not support EXCEPT ALL")),
    }
}

/// Collect the operands of a chain of same-kind set operations
fn flatten_set_op<'a>(
    expr: &'a Expr,
    kind: SetOpKind,
    parts: &mut Vec<&'a Expr>,
    keywords: &mut Vec<&'static str>,
) -> Result<(), TranslateError> {
    match &expr.op {
        Op::SetOp { kind: k, left, right, distinct } if *k == kind => {
            flatten_set_op(left, kind, parts, keywords)?;
            keywords.push(set_keyword(kind, *distinct)?);
            flatten_set_op(right, kind, parts, keywords)
        }
        _ => {
            parts.push(expr);
            Ok(())
        }
    }
}

fn set_op(t: &mut dyn ExprTranslator, expr: &Expr) -> Result<String, TranslateError> {
    let Op::SetOp { kind, .. } = &expr.op else {
        return Err(malformed(expr, "expected a set operation"));
    };
    let mut parts = Vec::new();
    let mut keywords = Vec::new();
    flatten_set_op(expr, *kind, &mut parts, &mut keywords)?;

    let mut sql = String::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            sql.push('\n');
            sql.push_str(keywords[i - 1]);
            sql.push('\n');
        }
        let rendered = t.translate(part)?;
        if matches!(part.op, Op::SetOp { .. }) {
            sql.push_str(&format!("({rendered})"));
        } else {
            sql.push_str(&rendered);
        }
    }
    Ok(sql)
}
