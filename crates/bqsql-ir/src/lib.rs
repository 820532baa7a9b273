//! bqsql Intermediate Representation (IR)
//!
//! Typed expression trees handed to a SQL dialect compiler.
//! Every node serializes deterministically to JSON for caching and provenance.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

mod builder;
mod types;
pub use types::*;

/// A typed expression node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    #[serde(flatten)]
    pub op: Op,

    /// Declared result type
    pub dtype: DataType,

    /// Output name; serialized as `alias` since several ops carry their own `name`
    #[serde(rename = "alias", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Expression operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Op {
    Literal {
        value: Value,
    },
    Column {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        table: Option<String>,
    },
    ScalarParameter {
        name: String,
    },
    TableScan {
        name: String,
        schema: Schema,
    },
    SetOp {
        kind: SetOpKind,
        left: Box<Expr>,
        right: Box<Expr>,
        #[serde(default)]
        distinct: bool,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Call {
        func: Func,
        #[serde(default)]
        args: Vec<Expr>,
    },
    /// Cast to the node's declared type
    Cast {
        arg: Box<Expr>,
    },
    IfElse {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Reduction {
        func: Agg,
        args: Vec<Expr>,
        #[serde(rename = "where", default, skip_serializing_if = "Option::is_none")]
        filter: Option<Box<Expr>>,
    },
    Covariance {
        left: Box<Expr>,
        right: Box<Expr>,
        how: String,
        #[serde(rename = "where", default, skip_serializing_if = "Option::is_none")]
        filter: Option<Box<Expr>>,
    },
    Arbitrary {
        arg: Box<Expr>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        how: Option<String>,
        #[serde(rename = "where", default, skip_serializing_if = "Option::is_none")]
        filter: Option<Box<Expr>>,
    },
    Truncate {
        kind: TemporalKind,
        arg: Box<Expr>,
        unit: IntervalUnit,
    },
    IntervalArithmetic {
        op: IntervalOp,
        arg: Box<Expr>,
        offset: Box<Expr>,
    },
    TimestampFromUnix {
        arg: Box<Expr>,
        unit: IntervalUnit,
    },
    StringFind {
        arg: Box<Expr>,
        substr: Box<Expr>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        start: Option<Box<Expr>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        end: Option<Box<Expr>>,
    },
    Hash {
        arg: Box<Expr>,
        how: String,
    },
    HashBytes {
        arg: Box<Expr>,
        how: String,
    },
    Strftime {
        arg: Box<Expr>,
        format: Box<Expr>,
    },
    StringToTimestamp {
        arg: Box<Expr>,
        format: Box<Expr>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timezone: Option<Box<Expr>>,
    },
    StructField {
        arg: Box<Expr>,
        field: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SetOpKind {
    Union,
    Intersection,
    Difference,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    // Arithmetic
    Add, Subtract, Multiply, Divide, FloorDivide, Modulus, Power,
    // Comparison
    Equals, NotEquals, Less, LessEqual, Greater, GreaterEqual, IdenticalTo,
    // Logical
    And, Or, Xor,
}

impl BinaryOp {
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOp::Equals
                | BinaryOp::NotEquals
                | BinaryOp::Less
                | BinaryOp::LessEqual
                | BinaryOp::Greater
                | BinaryOp::GreaterEqual
                | BinaryOp::IdenticalTo
        )
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or | BinaryOp::Xor)
    }
}

/// Scalar functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Func {
    // Logic and nulls
    Negate, Not, IsNull, NotNull, IfNull, NullIf, Coalesce, Greatest, Least, Between,
    // Math
    Abs, Ceil, Floor, Sqrt, Exp, Ln, Log, Log2, Log10, Sign, Round,
    // Temporal
    Date, Time,
    ExtractYear, ExtractQuarter, ExtractMonth, ExtractDay,
    ExtractHour, ExtractMinute, ExtractSecond, ExtractMillisecond, ExtractEpochSeconds,
    DayOfWeekIndex, DayOfWeekName, TimestampNow, DateDiff, TimestampDiff,
    // Strings
    Lowercase, Uppercase, Strip, LStrip, RStrip, StringLength, Reverse,
    Substring, StrRight, StringReplace, StringSplit, StringConcat, StringJoin,
    StringAscii, Repeat, RegexSearch, RegexExtract, RegexReplace, StringSQLLike,
    Translate, FindInSet, Capitalize,
    // Arrays
    ArrayIndex, ArrayConcat, ArrayLength,
    // Geospatial
    Geo(GeoFunc),
}

impl fmt::Display for Func {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Func::Geo(g) => write!(f, "Geo{g:?}"),
            other => write!(f, "{other:?}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeoFunc {
    Area, AsBinary, AsText, Azimuth, Buffer, Centroid, Contains, Covers, CoveredBy,
    DWithin, Difference, Disjoint, Distance, EndPoint, Equals, GeometryType,
    Intersection, Intersects, Length, MaxDistance, NPoints, Perimeter, Point,
    PointN, Simplify, StartPoint, Touches, Union, Within,
    X, XMax, XMin, Y, YMax, YMin,
}

/// Aggregate functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Agg {
    Sum, Mean, Min, Max, Count, CountDistinct,
    Any, All, NotAny, NotAll,
    GroupConcat, ApproxMedian, ApproxCountDistinct,
    BitAnd, BitOr, BitXor, ArrayCollect,
    StandardDevSample, StandardDevPop, VarianceSample, VariancePop,
    GeoUnionAgg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TemporalKind {
    Date,
    Time,
    Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntervalOp {
    DateAdd,
    DateSub,
    TimestampAdd,
    TimestampSub,
}

impl fmt::Display for IntervalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Operator kind, the dispatch key of an expression node.
///
/// Mirrors [`Op`] without payloads; operator families carry their
/// fieldless sub-kind so each function registers separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OpKind {
    Literal,
    Column,
    ScalarParameter,
    TableScan,
    SetOp(SetOpKind),
    Binary(BinaryOp),
    Call(Func),
    Cast,
    IfElse,
    Reduction(Agg),
    Covariance,
    Arbitrary,
    Truncate(TemporalKind),
    IntervalArithmetic(IntervalOp),
    TimestampFromUnix,
    StringFind,
    Hash,
    HashBytes,
    Strftime,
    StringToTimestamp,
    StructField,
}

// Ordering is only used to list registry contents deterministically.
macro_rules! impl_ord_by_debug {
    ($($t:ty),*) => {$(
        impl PartialOrd for $t {
            fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
                Some(self.cmp(other))
            }
        }
        impl Ord for $t {
            fn cmp(&self, other: &Self) -> std::cmp::Ordering {
                format!("{self:?}").cmp(&format!("{other:?}"))
            }
        }
    )*};
}

impl_ord_by_debug!(SetOpKind, BinaryOp, Func, Agg, TemporalKind, IntervalOp);

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpKind::SetOp(kind) => write!(f, "{kind:?}"),
            OpKind::Binary(op) => write!(f, "{op:?}"),
            OpKind::Call(func) => write!(f, "{func}"),
            OpKind::Reduction(agg) => write!(f, "{agg:?}"),
            OpKind::Truncate(kind) => write!(f, "{kind:?}Truncate"),
            OpKind::IntervalArithmetic(op) => write!(f, "{op}"),
            other => write!(f, "{other:?}"),
        }
    }
}

impl Op {
    pub fn kind(&self) -> OpKind {
        match self {
            Op::Literal { .. } => OpKind::Literal,
            Op::Column { .. } => OpKind::Column,
            Op::ScalarParameter { .. } => OpKind::ScalarParameter,
            Op::TableScan { .. } => OpKind::TableScan,
            Op::SetOp { kind, .. } => OpKind::SetOp(*kind),
            Op::Binary { op, .. } => OpKind::Binary(*op),
            Op::Call { func, .. } => OpKind::Call(*func),
            Op::Cast { .. } => OpKind::Cast,
            Op::IfElse { .. } => OpKind::IfElse,
            Op::Reduction { func, .. } => OpKind::Reduction(*func),
            Op::Covariance { .. } => OpKind::Covariance,
            Op::Arbitrary { .. } => OpKind::Arbitrary,
            Op::Truncate { kind, .. } => OpKind::Truncate(*kind),
            Op::IntervalArithmetic { op, .. } => OpKind::IntervalArithmetic(*op),
            Op::TimestampFromUnix { .. } => OpKind::TimestampFromUnix,
            Op::StringFind { .. } => OpKind::StringFind,
            Op::Hash { .. } => OpKind::Hash,
            Op::HashBytes { .. } => OpKind::HashBytes,
            Op::Strftime { .. } => OpKind::Strftime,
            Op::StringToTimestamp { .. } => OpKind::StringToTimestamp,
            Op::StructField { .. } => OpKind::StructField,
        }
    }
}

impl Expr {
    pub fn kind(&self) -> OpKind {
        self.op.kind()
    }

    /// Sub-expressions in argument order, optional ones included when present
    pub fn operands(&self) -> Vec<&Expr> {
        match &self.op {
            Op::Literal { .. }
            | Op::Column { .. }
            | Op::ScalarParameter { .. }
            | Op::TableScan { .. } => vec![],
            Op::SetOp { left, right, .. } | Op::Binary { left, right, .. } => {
                vec![left.as_ref(), right.as_ref()]
            }
            Op::Call { args, .. } => args.iter().collect(),
            Op::Cast { arg }
            | Op::Truncate { arg, .. }
            | Op::TimestampFromUnix { arg, .. }
            | Op::Hash { arg, .. }
            | Op::HashBytes { arg, .. }
            | Op::StructField { arg, .. } => vec![arg.as_ref()],
            Op::IfElse { cond, then, otherwise } => {
                vec![cond.as_ref(), then.as_ref(), otherwise.as_ref()]
            }
            Op::Reduction { args, filter, .. } => {
                let mut out: Vec<&Expr> = args.iter().collect();
                out.extend(filter.as_deref());
                out
            }
            Op::Covariance { left, right, filter, .. } => {
                let mut out = vec![left.as_ref(), right.as_ref()];
                out.extend(filter.as_deref());
                out
            }
            Op::Arbitrary { arg, filter, .. } => {
                let mut out = vec![arg.as_ref()];
                out.extend(filter.as_deref());
                out
            }
            Op::IntervalArithmetic { arg, offset, .. } => vec![arg.as_ref(), offset.as_ref()],
            Op::StringFind { arg, substr, start, end } => {
                let mut out = vec![arg.as_ref(), substr.as_ref()];
                out.extend(start.as_deref());
                out.extend(end.as_deref());
                out
            }
            Op::Strftime { arg, format } => vec![arg.as_ref(), format.as_ref()],
            Op::StringToTimestamp { arg, format, timezone } => {
                let mut out = vec![arg.as_ref(), format.as_ref()];
                out.extend(timezone.as_deref());
                out
            }
        }
    }

    /// Rebuild this node with every operand replaced by `f(operand)`.
    ///
    /// Non-expression fields, the declared type and the name are kept.
    pub fn map_operands<F>(&self, mut f: F) -> Expr
    where
        F: FnMut(&Expr) -> Expr,
    {
        let mut g = |e: &Expr| Box::new(f(e));
        let op = match &self.op {
            Op::Literal { .. }
            | Op::Column { .. }
            | Op::ScalarParameter { .. }
            | Op::TableScan { .. } => self.op.clone(),
            Op::SetOp { kind, left, right, distinct } => Op::SetOp {
                kind: *kind,
                left: g(left),
                right: g(right),
                distinct: *distinct,
            },
            Op::Binary { op, left, right } => Op::Binary {
                op: *op,
                left: g(left),
                right: g(right),
            },
            Op::Call { func, args } => Op::Call {
                func: *func,
                args: args.iter().map(|a| *g(a)).collect(),
            },
            Op::Cast { arg } => Op::Cast { arg: g(arg) },
            Op::IfElse { cond, then, otherwise } => Op::IfElse {
                cond: g(cond),
                then: g(then),
                otherwise: g(otherwise),
            },
            Op::Reduction { func, args, filter } => Op::Reduction {
                func: *func,
                args: args.iter().map(|a| *g(a)).collect(),
                filter: filter.as_deref().map(&mut g),
            },
            Op::Covariance { left, right, how, filter } => Op::Covariance {
                left: g(left),
                right: g(right),
                how: how.clone(),
                filter: filter.as_deref().map(&mut g),
            },
            Op::Arbitrary { arg, how, filter } => Op::Arbitrary {
                arg: g(arg),
                how: how.clone(),
                filter: filter.as_deref().map(&mut g),
            },
            Op::Truncate { kind, arg, unit } => Op::Truncate {
                kind: *kind,
                arg: g(arg),
                unit: *unit,
            },
            Op::IntervalArithmetic { op, arg, offset } => Op::IntervalArithmetic {
                op: *op,
                arg: g(arg),
                offset: g(offset),
            },
            Op::TimestampFromUnix { arg, unit } => Op::TimestampFromUnix {
                arg: g(arg),
                unit: *unit,
            },
            Op::StringFind { arg, substr, start, end } => Op::StringFind {
                arg: g(arg),
                substr: g(substr),
                start: start.as_deref().map(&mut g),
                end: end.as_deref().map(&mut g),
            },
            Op::Hash { arg, how } => Op::Hash {
                arg: g(arg),
                how: how.clone(),
            },
            Op::HashBytes { arg, how } => Op::HashBytes {
                arg: g(arg),
                how: how.clone(),
            },
            Op::Strftime { arg, format } => Op::Strftime {
                arg: g(arg),
                format: g(format),
            },
            Op::StringToTimestamp { arg, format, timezone } => Op::StringToTimestamp {
                arg: g(arg),
                format: g(format),
                timezone: timezone.as_deref().map(&mut g),
            },
            Op::StructField { arg, field } => Op::StructField {
                arg: g(arg),
                field: field.clone(),
            },
        };

        Expr {
            op,
            dtype: self.dtype.clone(),
            name: self.name.clone(),
        }
    }

    /// Table expressions produce rows rather than a single value
    pub fn is_table(&self) -> bool {
        matches!(self.op, Op::TableScan { .. } | Op::SetOp { .. })
    }

    /// Value of a literal node
    pub fn literal_value(&self) -> Option<&Value> {
        match &self.op {
            Op::Literal { value } => Some(value),
            _ => None,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self.op, Op::Literal { .. })
    }

    /// Distinct tables referenced by column nodes, in order of first appearance
    pub fn referenced_tables(&self) -> Vec<&str> {
        let mut tables = Vec::new();
        self.visit(&mut |e| {
            if let Op::Column { table: Some(t), .. } = &e.op {
                if !tables.contains(&t.as_str()) {
                    tables.push(t.as_str());
                }
            }
        });
        tables
    }

    /// Named parameters in order of first appearance
    pub fn scalar_parameters(&self) -> Vec<(&str, &DataType)> {
        let mut params: Vec<(&str, &DataType)> = Vec::new();
        self.visit(&mut |e| {
            if let Op::ScalarParameter { name } = &e.op {
                if !params.iter().any(|(n, _)| *n == name.as_str()) {
                    params.push((name.as_str(), &e.dtype));
                }
            }
        });
        params
    }

    /// Pre-order traversal
    pub fn visit<'a, F>(&'a self, f: &mut F)
    where
        F: FnMut(&'a Expr),
    {
        f(self);
        for operand in self.operands() {
            operand.visit(f);
        }
    }

    /// Calculate fingerprint (SHA-256) for deterministic caching
    pub fn fingerprint(&self) -> String {
        // Serializing a tree of derived types with string keys cannot fail
        let json = serde_json::to_string(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}
