use bqsql_dialect::params::ArrayValues;
use bqsql_dialect::{compile, Compiler, ParamNaming, QueryParameter, TranslateError};
use bqsql_ir::{
    Agg, BinaryOp, DataType, Expr, FieldType, Func, GeoFunc, IntervalOp, IntervalUnit, Op, Params,
    Schema, SetOpKind, TemporalKind, Value,
};
use chrono::{NaiveDate, NaiveTime};
use indexmap::IndexMap;
use serde_json::json;

fn sql(expr: &Expr) -> String {
    compile(expr, &Params::new()).unwrap().sql
}

fn err(expr: &Expr) -> TranslateError {
    compile(expr, &Params::new()).unwrap_err()
}

fn date_literal() -> Expr {
    Expr::literal(Value::Date(NaiveDate::from_ymd_opt(2017, 1, 1).unwrap()), DataType::Date)
}

fn timestamp_literal() -> Expr {
    let ts = NaiveDate::from_ymd_opt(2017, 1, 1)
        .unwrap()
        .and_hms_opt(4, 55, 59)
        .unwrap();
    Expr::literal(Value::Timestamp(ts), DataType::timestamp())
}

fn unary_call(func: Func, arg: Expr, dtype: DataType) -> Expr {
    Expr::call(func, vec![arg], dtype)
}

fn table(name: &str) -> Expr {
    Expr::table(name, Schema::new(vec![FieldType::new("a", DataType::Int64)]))
}

#[test]
fn test_extract_from_date_literals() {
    let expected = "SELECT EXTRACT(year from DATE '2017-01-01') AS `tmp`";
    for value in [
        Value::Date(NaiveDate::from_ymd_opt(2017, 1, 1).unwrap()),
        Value::from("2017-01-01"),
    ] {
        let expr = unary_call(Func::ExtractYear, Expr::literal(value, DataType::Date), DataType::Int32);
        assert_eq!(sql(&expr), expected);
    }
}

#[test]
fn test_extract_hour_from_timestamp_and_time() {
    let expr = unary_call(Func::ExtractHour, timestamp_literal(), DataType::Int32);
    assert_eq!(sql(&expr), "SELECT EXTRACT(hour from TIMESTAMP '2017-01-01 04:55:59') AS `tmp`");

    let time = Expr::literal(Value::Time(NaiveTime::from_hms_opt(4, 55, 59).unwrap()), DataType::Time);
    let expr = unary_call(Func::ExtractHour, time, DataType::Int32);
    assert_eq!(sql(&expr), "SELECT EXTRACT(hour from TIME '04:55:59') AS `tmp`");

    let expr = unary_call(Func::ExtractHour, Expr::literal("04:55:59", DataType::Time), DataType::Int32);
    assert_eq!(sql(&expr), "SELECT EXTRACT(hour from TIME '04:55:59') AS `tmp`");
}

#[test]
fn test_day_of_week() {
    let index = unary_call(Func::DayOfWeekIndex, date_literal(), DataType::Int16);
    assert_eq!(
        sql(&index),
        "SELECT MOD(EXTRACT(DAYOFWEEK FROM DATE '2017-01-01') + 5, 7) AS `tmp`"
    );

    let name = unary_call(Func::DayOfWeekName, date_literal(), DataType::String);
    assert_eq!(sql(&name), "SELECT FORMAT_DATE('%A', DATE '2017-01-01') AS `tmp`");

    let name = unary_call(Func::DayOfWeekName, timestamp_literal(), DataType::String);
    assert_eq!(
        sql(&name),
        "SELECT FORMAT_TIMESTAMP('%A', TIMESTAMP '2017-01-01 04:55:59', 'UTC') AS `tmp`"
    );
}

#[test]
fn test_hash() {
    for (value, dtype, expected) in [
        (Value::from("test of hash"), DataType::String, "'test of hash'"),
        (Value::Bytes(b"test of hash".to_vec()), DataType::Binary, "FROM_BASE64('dGVzdCBvZiBoYXNo')"),
    ] {
        let expr = Expr::new(
            Op::Hash {
                arg: Box::new(Expr::literal(value, dtype)),
                how: "farm_fingerprint".to_string(),
            },
            DataType::Int64,
        );
        assert_eq!(sql(&expr), format!("SELECT farm_fingerprint({expected}) AS `tmp`"));
    }

    let expr = Expr::new(
        Op::Hash {
            arg: Box::new(Expr::literal("x", DataType::String)),
            how: "fnv".to_string(),
        },
        DataType::Int64,
    );
    assert!(matches!(err(&expr), TranslateError::UnsupportedOperation(_)));
}

#[test]
fn test_hashbytes() {
    for how in ["md5", "sha1", "sha256", "sha512"] {
        let string = Expr::new(
            Op::HashBytes {
                arg: Box::new(Expr::literal("test", DataType::String)),
                how: how.to_string(),
            },
            DataType::Binary,
        );
        assert_eq!(sql(&string), format!("SELECT {how}('test') AS `tmp`"));

        let bytes = Expr::new(
            Op::HashBytes {
                arg: Box::new(Expr::literal(Value::Bytes(b"test".to_vec()), DataType::Binary)),
                how: how.to_string(),
            },
            DataType::Binary,
        );
        assert_eq!(sql(&bytes), format!("SELECT {how}(FROM_BASE64('dGVzdA==')) AS `tmp`"));
    }
}

#[test]
fn test_temporal_truncate() {
    let cases = [
        (TemporalKind::Timestamp, DataType::timestamp(), "TIMESTAMP", vec!["Y", "Q", "M", "W", "D", "h", "m", "s", "ms", "us"]),
        (TemporalKind::Date, DataType::Date, "DATE", vec!["Y", "Q", "M", "W", "D"]),
        (TemporalKind::Time, DataType::Time, "TIME", vec!["h", "m", "s", "ms", "us"]),
    ];
    for (kind, dtype, func, units) in cases {
        for code in units {
            let unit = IntervalUnit::from_code(code).unwrap();
            let expr = Expr::new(
                Op::Truncate {
                    kind,
                    arg: Box::new(Expr::column_of("t", "a", dtype.clone())),
                    unit,
                },
                dtype.clone(),
            );
            assert_eq!(
                sql(&expr),
                format!("SELECT {func}_TRUNC(`a`, {}) AS `tmp`\nFROM t", unit.sql_name())
            );
        }
    }
}

#[test]
fn test_truncate_rejects_units() {
    let expr = Expr::new(
        Op::Truncate {
            kind: TemporalKind::Date,
            arg: Box::new(Expr::column_of("t", "a", DataType::Date)),
            unit: IntervalUnit::Hour,
        },
        DataType::Date,
    );
    assert_eq!(
        err(&expr).to_string(),
        "BigQuery does not support truncating date values to unit 'h'"
    );

    let expr = Expr::new(
        Op::Truncate {
            kind: TemporalKind::Time,
            arg: Box::new(Expr::column_of("t", "a", DataType::Time)),
            unit: IntervalUnit::Day,
        },
        DataType::Time,
    );
    assert!(matches!(err(&expr), TranslateError::UnsupportedOperation(_)));
}

#[test]
fn test_extract_temporal_from_timestamp() {
    let ts = Expr::column_of("t", "ts", DataType::timestamp());
    assert_eq!(sql(&unary_call(Func::Date, ts.clone(), DataType::Date)), "SELECT DATE(`ts`) AS `tmp`\nFROM t");
    assert_eq!(sql(&unary_call(Func::Time, ts, DataType::Time)), "SELECT TIME(`ts`) AS `tmp`\nFROM t");
}

#[test]
fn test_now() {
    let expr = Expr::call(Func::TimestampNow, vec![], DataType::utc_timestamp());
    assert_eq!(sql(&expr), "SELECT CURRENT_TIMESTAMP() AS `tmp`");
}

#[test]
fn test_binary_cast() {
    let expr = Expr::column_of("t", "value", DataType::Float64).cast(DataType::Binary);
    assert_eq!(sql(&expr), "SELECT CAST(`value` AS BYTES) AS `tmp`\nFROM t");
}

#[test]
fn test_timestamp_to_integer_cast() {
    let expr = Expr::column_of("t", "ts", DataType::utc_timestamp()).cast(DataType::Int64);
    assert_eq!(sql(&expr), "SELECT UNIX_MICROS(`ts`) AS `tmp`\nFROM t");
}

#[test]
fn test_substring() {
    let value = Expr::column_of("t", "value", DataType::String);
    let expr = Expr::call(
        Func::Substring,
        vec![
            value.clone(),
            Expr::literal(3, DataType::Int64),
            Expr::literal(1, DataType::Int64),
        ],
        DataType::String,
    );
    assert_eq!(sql(&expr), "SELECT substr(`value`, 3 + 1, 1) AS `tmp`\nFROM t");

    let negative = Expr::call(
        Func::Substring,
        vec![value, Expr::literal(3, DataType::Int64), Expr::literal(-1, DataType::Int64)],
        DataType::String,
    );
    assert_eq!(err(&negative).to_string(), "Length parameter should not be a negative value.");
}

#[test]
fn test_identical_to() {
    let expr = Expr::column("a", DataType::String)
        .binary(BinaryOp::IdenticalTo, Expr::literal("a", DataType::String));
    assert_eq!(
        sql(&expr),
        "SELECT ((`a` IS NULL) AND ('a' IS NULL)) OR (`a` = 'a') AS `tmp`"
    );
}

#[test]
fn test_division() {
    let a = Expr::column("a", DataType::Int64);
    let b = Expr::column("b", DataType::Int64);
    assert_eq!(sql(&a.clone().divide(b.clone())), "SELECT IEEE_DIVIDE(`a`, `b`) AS `tmp`");
    assert_eq!(
        sql(&a.clone().binary(BinaryOp::FloorDivide, b.clone())),
        "SELECT CAST(FLOOR(IEEE_DIVIDE(`a`, `b`)) AS INT64) AS `tmp`"
    );
    assert_eq!(sql(&a.binary(BinaryOp::Modulus, b)), "SELECT MOD(`a`, `b`) AS `tmp`");
}

#[test]
fn test_log2_becomes_log_base_two() {
    let expr = unary_call(Func::Log2, Expr::column("x", DataType::Float64), DataType::Float64);
    assert_eq!(sql(&expr), "SELECT log(`x`, 2) AS `tmp`");
}

#[test]
fn test_interval_arithmetic() {
    let offset = |n: i64, unit: IntervalUnit| Expr::literal(Value::Interval(n), DataType::Interval { unit });
    let add = |op: IntervalOp, arg: Expr, offset: Expr| {
        let dtype = arg.dtype.clone();
        Expr::new(
            Op::IntervalArithmetic {
                op,
                arg: Box::new(arg),
                offset: Box::new(offset),
            },
            dtype,
        )
    };

    let expr = add(IntervalOp::DateAdd, Expr::column("d", DataType::Date), offset(3, IntervalUnit::Day));
    assert_eq!(sql(&expr), "SELECT DATE_ADD(`d`, INTERVAL 3 DAY) AS `tmp`");

    let expr = add(
        IntervalOp::TimestampSub,
        Expr::column("ts", DataType::timestamp()),
        offset(2, IntervalUnit::Hour),
    );
    assert_eq!(sql(&expr), "SELECT TIMESTAMP_SUB(`ts`, INTERVAL 2 HOUR) AS `tmp`");

    let expr = add(
        IntervalOp::TimestampAdd,
        Expr::column("ts", DataType::timestamp()),
        offset(1, IntervalUnit::Day),
    );
    assert_eq!(
        err(&expr).to_string(),
        "BigQuery does not allow binary operation TIMESTAMP_ADD with INTERVAL offset D"
    );
}

#[test]
fn test_timestamp_from_unix() {
    let from_unix = |unit| {
        Expr::new(
            Op::TimestampFromUnix {
                arg: Box::new(Expr::column("x", DataType::Int64)),
                unit,
            },
            DataType::utc_timestamp(),
        )
    };
    assert_eq!(sql(&from_unix(IntervalUnit::Second)), "SELECT TIMESTAMP_SECONDS(`x`) AS `tmp`");
    assert_eq!(sql(&from_unix(IntervalUnit::Millisecond)), "SELECT TIMESTAMP_MILLIS(`x`) AS `tmp`");
    assert_eq!(sql(&from_unix(IntervalUnit::Microsecond)), "SELECT TIMESTAMP_MICROS(`x`) AS `tmp`");
    assert_eq!(
        sql(&from_unix(IntervalUnit::Nanosecond)),
        "SELECT TIMESTAMP_MICROS(CAST(ROUND(`x` / 1000) AS INT64)) AS `tmp`"
    );
    assert_eq!(
        err(&from_unix(IntervalUnit::Day)),
        TranslateError::NotImplemented("cannot cast unit D".to_string())
    );
}

#[test]
fn test_string_functions() {
    let s = Expr::column("s", DataType::String);

    let find = Expr::new(
        Op::StringFind {
            arg: Box::new(s.clone()),
            substr: Box::new(Expr::literal("a", DataType::String)),
            start: None,
            end: None,
        },
        DataType::Int64,
    );
    assert_eq!(sql(&find), "SELECT STRPOS(`s`, 'a') - 1 AS `tmp`");

    let find_from = Expr::new(
        Op::StringFind {
            arg: Box::new(s.clone()),
            substr: Box::new(Expr::literal("a", DataType::String)),
            start: Some(Box::new(Expr::literal(2, DataType::Int64))),
            end: None,
        },
        DataType::Int64,
    );
    assert_eq!(
        err(&find_from),
        TranslateError::NotImplemented("start not implemented for string find".to_string())
    );

    let search = Expr::call(
        Func::RegexSearch,
        vec![s.clone(), Expr::literal("^a", DataType::String)],
        DataType::Bool,
    );
    assert_eq!(sql(&search), "SELECT REGEXP_CONTAINS(`s`, r'^a') AS `tmp`");

    let extract = Expr::call(
        Func::RegexExtract,
        vec![s.clone(), Expr::column("p", DataType::String), Expr::literal(0, DataType::Int64)],
        DataType::String,
    );
    assert_eq!(sql(&extract), "SELECT REGEXP_EXTRACT_ALL(`s`, `p`)[SAFE_OFFSET(0)] AS `tmp`");

    let join = Expr::call(
        Func::StringJoin,
        vec![Expr::literal(",", DataType::String), s.clone(), Expr::literal("x", DataType::String)],
        DataType::String,
    );
    assert_eq!(sql(&join), "SELECT ARRAY_TO_STRING([`s`, 'x'], ',') AS `tmp`");

    let right = Expr::call(Func::StrRight, vec![s.clone(), Expr::literal(2, DataType::Int64)], DataType::String);
    assert_eq!(sql(&right), "SELECT SUBSTR(`s`, -LEAST(LENGTH(`s`), 2)) AS `tmp`");

    let ascii = unary_call(Func::StringAscii, s, DataType::Int32);
    assert_eq!(sql(&ascii), "SELECT TO_CODE_POINTS(`s`)[SAFE_OFFSET(0)] AS `tmp`");
}

#[test]
fn test_array_and_struct_access() {
    let arr = Expr::column("arr", DataType::array(DataType::Int64));
    let index = Expr::call(Func::ArrayIndex, vec![arr, Expr::literal(1, DataType::Int64)], DataType::Int64);
    assert_eq!(sql(&index), "SELECT `arr`[SAFE_OFFSET(1)] AS `tmp`");

    let s = Expr::column("s", DataType::Struct(vec![FieldType::new("f", DataType::Int64)]));
    let field = Expr::new(
        Op::StructField {
            arg: Box::new(s),
            field: "f".to_string(),
        },
        DataType::Int64,
    );
    assert_eq!(sql(&field), "SELECT `s`.`f` AS `tmp`");
}

#[test]
fn test_reductions() {
    let x = Expr::column("x", DataType::Float64);
    let keep = Expr::column("keep", DataType::Bool);

    let median = Expr::reduction(Agg::ApproxMedian, vec![x.clone()], Some(keep.clone()), DataType::Float64);
    assert_eq!(
        sql(&median),
        "SELECT APPROX_QUANTILES(CASE WHEN `keep` THEN `x` ELSE NULL END, 2)[OFFSET(1)] AS `tmp`"
    );

    let total = Expr::reduction(Agg::Sum, vec![keep.clone()], None, DataType::Int64);
    assert_eq!(sql(&total), "SELECT sum(CAST(`keep` AS INT64)) AS `tmp`");

    for (agg, expected) in [
        (Agg::Any, "LOGICAL_OR(`keep`)"),
        (Agg::All, "LOGICAL_AND(`keep`)"),
        (Agg::NotAny, "LOGICAL_AND(NOT (`keep`))"),
        (Agg::NotAll, "LOGICAL_OR(NOT (`keep`))"),
    ] {
        let expr = Expr::reduction(agg, vec![keep.clone()], None, DataType::Bool);
        assert_eq!(sql(&expr), format!("SELECT {expected} AS `tmp`"));
    }

    let cov = |how: &str| {
        Expr::new(
            Op::Covariance {
                left: Box::new(x.clone()),
                right: Box::new(Expr::column("y", DataType::Float64)),
                how: how.to_string(),
                filter: None,
            },
            DataType::Float64,
        )
    };
    assert_eq!(sql(&cov("sample")), "SELECT COVAR_SAMP(`x`, `y`) AS `tmp`");
    assert_eq!(sql(&cov("pop")), "SELECT COVAR_POP(`x`, `y`) AS `tmp`");
    assert!(matches!(err(&cov("kendall")), TranslateError::UnsupportedOperation(_)));

    let arbitrary = Expr::new(
        Op::Arbitrary {
            arg: Box::new(x.clone()),
            how: Some("heavy".to_string()),
            filter: None,
        },
        DataType::Float64,
    );
    assert!(matches!(err(&arbitrary), TranslateError::UnsupportedOperation(_)));
}

#[test]
fn test_geospatial() {
    let g = Expr::column("g", DataType::Geography);
    let geo = |f: GeoFunc, args: Vec<Expr>, dtype: DataType| Expr::call(Func::Geo(f), args, dtype);

    assert_eq!(
        sql(&geo(GeoFunc::XMin, vec![g.clone()], DataType::Float64)),
        "SELECT ST_BOUNDINGBOX(`g`).xmin AS `tmp`"
    );
    assert_eq!(
        sql(&geo(GeoFunc::NPoints, vec![g.clone()], DataType::Int64)),
        "SELECT ST_NUMPOINTS(`g`) AS `tmp`"
    );

    let simplify = |preserve: bool| {
        geo(
            GeoFunc::Simplify,
            vec![g.clone(), Expr::literal(1.5, DataType::Float64), Expr::literal(preserve, DataType::Bool)],
            DataType::Geography,
        )
    };
    assert_eq!(sql(&simplify(false)), "SELECT ST_SIMPLIFY(`g`, 1.5) AS `tmp`");
    assert_eq!(
        err(&simplify(true)).to_string(),
        "BigQuery simplify does not support preserving collapsed geometries, must pass preserve_collapsed=False"
    );
}

#[test]
fn test_removed_operations() {
    let s = Expr::column("s", DataType::String);
    let expr = Expr::call(
        Func::Translate,
        vec![s, Expr::literal("a", DataType::String), Expr::literal("b", DataType::String)],
        DataType::String,
    );
    assert_eq!(
        err(&expr),
        TranslateError::NotImplemented("Translate is not supported by the BigQuery dialect".to_string())
    );
}

#[test]
fn test_union_chain_is_flattened() {
    let expr = table("t1").union(table("t2"), false).union(table("t3"), true);
    assert_eq!(
        sql(&expr),
        "SELECT *\nFROM t1\nUNION ALL\nSELECT *\nFROM t2\nUNION DISTINCT\nSELECT *\nFROM t3"
    );
}

#[test]
fn test_mixed_set_operations_are_parenthesized() {
    let intersect = table("t2").set_op(SetOpKind::Intersection, table("t3"), true);
    let expr = table("t1").union(intersect, false);
    assert_eq!(
        sql(&expr),
        "SELECT *\nFROM t1\nUNION ALL\n(SELECT *\nFROM t2\nINTERSECT DISTINCT\nSELECT *\nFROM t3)"
    );

    let all = table("t1").set_op(SetOpKind::Difference, table("t2"), false);
    assert!(matches!(err(&all), TranslateError::UnsupportedOperation(_)));
}

#[test]
fn test_table_names_are_quoted() {
    assert_eq!(sql(&table("my-project.ds.t")), "SELECT *\nFROM `my-project.ds.t`");
}

#[test]
fn test_struct_parameter() {
    let dtype = DataType::Struct(vec![
        FieldType::new("a", DataType::Int64),
        FieldType::new("b", DataType::String),
    ]);
    let mut value = IndexMap::new();
    value.insert("a".to_string(), Value::Int(1));
    value.insert("b".to_string(), Value::from("x"));
    let mut params = Params::new();
    params.insert("s".to_string(), Value::Struct(value));

    let query = compile(&Expr::param("s", dtype), &params).unwrap();
    assert_eq!(query.sql, "SELECT @s AS `tmp`");
    match &query.parameters[..] {
        [QueryParameter::Struct(p)] => {
            assert_eq!(p.name, "s");
            assert_eq!(p.fields.len(), 2);
        }
        other => panic!("unexpected parameters {other:?}"),
    }
}

#[test]
fn test_struct_of_array_of_struct_parameter() {
    let item = DataType::Struct(vec![FieldType::new("v", DataType::Float64)]);
    let dtype = DataType::Struct(vec![FieldType::new("items", DataType::array(item))]);
    let leaf = 0.1 + 0.2;

    let mut row = IndexMap::new();
    row.insert("v".to_string(), Value::Float(leaf));
    let mut value = IndexMap::new();
    value.insert("items".to_string(), Value::Array(vec![Value::Struct(row)]));
    let mut params = Params::new();
    params.insert("s".to_string(), Value::Struct(value));

    let query = compile(&Expr::param("s", dtype), &params).unwrap();
    let [QueryParameter::Struct(outer)] = &query.parameters[..] else {
        panic!("expected one struct parameter, got {:?}", query.parameters);
    };
    let [QueryParameter::Array(items)] = &outer.fields[..] else {
        panic!("expected an array field, got {:?}", outer.fields);
    };
    assert_eq!(items.name, "items");
    assert_eq!(items.array_type, "STRUCT");
    let ArrayValues::Structs(elements) = &items.values else {
        panic!("expected struct elements, got {:?}", items.values);
    };
    assert_eq!(elements.len(), 1);
    assert_eq!(elements[0].name, "element_0");
    match &elements[0].fields[..] {
        [QueryParameter::Scalar(v)] => {
            assert_eq!(v.name, "v");
            assert_eq!(v.type_name, "FLOAT64");
            match v.value {
                Value::Float(f) => assert_eq!(f.to_bits(), leaf.to_bits()),
                ref other => panic!("expected a float leaf, got {other:?}"),
            }
        }
        other => panic!("unexpected element fields {other:?}"),
    }

    assert_eq!(
        query.parameters[0].to_api_repr(),
        json!({
            "name": "s",
            "parameterType": {
                "type": "STRUCT",
                "structTypes": [{
                    "name": "items",
                    "type": {
                        "type": "ARRAY",
                        "arrayType": {
                            "type": "STRUCT",
                            "structTypes": [{ "name": "v", "type": { "type": "FLOAT64" } }],
                        },
                    },
                }],
            },
            "parameterValue": {
                "structValues": {
                    "items": {
                        "arrayValues": [{ "structValues": { "v": { "value": leaf.to_string() } } }],
                    },
                },
            },
        })
    );
}

#[test]
fn test_regex_pattern_quoting() {
    let search = |pattern: &str| {
        sql(&Expr::call(
            Func::RegexSearch,
            vec![Expr::column("s", DataType::String), Expr::literal(pattern, DataType::String)],
            DataType::Bool,
        ))
    };
    assert_eq!(search(r"\d+"), r"SELECT REGEXP_CONTAINS(`s`, r'\d+') AS `tmp`");
    assert_eq!(search(r"it's"), r"SELECT REGEXP_CONTAINS(`s`, 'it\'s') AS `tmp`");
    assert_eq!(search(r"a\"), r"SELECT REGEXP_CONTAINS(`s`, 'a\\') AS `tmp`");
}

#[test]
fn test_backslash_in_string_literal_stays_quoted() {
    let expr = Expr::literal(Value::from(r"a\"), DataType::String);
    assert_eq!(sql(&expr), r"SELECT 'a\\' AS `tmp`");
}

#[test]
fn test_generated_names_in_filtered_aggregate() {
    let x = Expr::column_of("t", "x", DataType::Int64);
    let cond = x.clone().binary(BinaryOp::Greater, Expr::param("lo", DataType::Int64));
    let expr = Expr::reduction(Agg::Sum, vec![x], Some(cond), DataType::Int64).named("total");
    let mut params = Params::new();
    params.insert("lo".to_string(), Value::Int(10));

    let query = Compiler::new(ParamNaming::Generated).compile(&expr, &params).unwrap();
    assert_eq!(
        query.sql,
        "SELECT sum(CASE WHEN `x` > @param_0 THEN `x` ELSE NULL END) AS `total`\nFROM t"
    );
    assert_eq!(query.parameters[0].name(), "param_0");
    assert_eq!(query.parameters[0].type_name(), "INT64");
}
