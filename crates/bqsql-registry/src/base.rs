//! Generic SQL formatters and rewrites that dialects layer over

use crate::helpers::{
    backtick_quote, fixed_arity, malformed, reduction, translate_nested, unary, variadic,
};
use crate::{formatter, rewrite, ExprTranslator, OperationRegistry, RewriteRegistry, TranslateError};
use bqsql_ir::{Agg, BinaryOp, DataType, Expr, Func, Op, OpKind, SetOpKind, Value};

/// The generic operation registry
pub fn operation_registry() -> OperationRegistry {
    let mut builder = OperationRegistry::builder()
        .register(OpKind::Literal, formatter(literal))
        .register(OpKind::Column, formatter(column))
        .register(OpKind::ScalarParameter, formatter(scalar_parameter))
        .register(OpKind::TableScan, formatter(table_scan))
        .register(OpKind::Cast, formatter(cast))
        .register(OpKind::IfElse, formatter(if_else));

    for op in [
        BinaryOp::Add,
        BinaryOp::Subtract,
        BinaryOp::Multiply,
        BinaryOp::Divide,
        BinaryOp::FloorDivide,
        BinaryOp::Modulus,
        BinaryOp::Power,
        BinaryOp::Equals,
        BinaryOp::NotEquals,
        BinaryOp::Less,
        BinaryOp::LessEqual,
        BinaryOp::Greater,
        BinaryOp::GreaterEqual,
        BinaryOp::IdenticalTo,
        BinaryOp::And,
        BinaryOp::Or,
        BinaryOp::Xor,
    ] {
        builder = builder.register(OpKind::Binary(op), formatter(binary));
    }

    for kind in [SetOpKind::Union, SetOpKind::Intersection, SetOpKind::Difference] {
        builder = builder.register(OpKind::SetOp(kind), formatter(set_op));
    }

    let calls = [
        (Func::Negate, formatter(negate)),
        (Func::Not, formatter(not)),
        (Func::IsNull, formatter(|t, e| postfix(t, e, "IS NULL"))),
        (Func::NotNull, formatter(|t, e| postfix(t, e, "IS NOT NULL"))),
        (Func::IfNull, fixed_arity("ifnull", 2)),
        (Func::NullIf, fixed_arity("nullif", 2)),
        (Func::Coalesce, variadic("coalesce")),
        (Func::Greatest, variadic("greatest")),
        (Func::Least, variadic("least")),
        (Func::Between, formatter(between)),
        (Func::Abs, unary("abs")),
        (Func::Ceil, unary("ceil")),
        (Func::Floor, unary("floor")),
        (Func::Sqrt, unary("sqrt")),
        (Func::Exp, unary("exp")),
        (Func::Ln, unary("ln")),
        (Func::Log, formatter(log)),
        (Func::Log2, unary("log2")),
        (Func::Log10, unary("log10")),
        (Func::Sign, unary("sign")),
        (Func::Round, variadic("round")),
        (Func::Lowercase, unary("lower")),
        (Func::Uppercase, unary("upper")),
        (Func::Strip, unary("trim")),
        (Func::LStrip, unary("ltrim")),
        (Func::RStrip, unary("rtrim")),
        (Func::StringLength, unary("length")),
        (Func::Reverse, unary("reverse")),
        (Func::Substring, formatter(substring)),
        (Func::StringSQLLike, formatter(like)),
        (Func::Translate, fixed_arity("translate", 3)),
        (Func::FindInSet, formatter(find_in_set)),
        (Func::Capitalize, unary("initcap")),
        (Func::DateDiff, fixed_arity("datediff", 2)),
        (Func::TimestampDiff, fixed_arity("timestampdiff", 2)),
    ];
    for (func, f) in calls {
        builder = builder.register(OpKind::Call(func), f);
    }

    let reductions = [
        (Agg::Sum, reduction("sum")),
        (Agg::Mean, reduction("avg")),
        (Agg::Min, reduction("min")),
        (Agg::Max, reduction("max")),
        (Agg::Count, reduction("count")),
        (Agg::CountDistinct, formatter(count_distinct)),
        (Agg::StandardDevSample, reduction("stddev_samp")),
        (Agg::StandardDevPop, reduction("stddev_pop")),
        (Agg::VarianceSample, reduction("var_samp")),
        (Agg::VariancePop, reduction("var_pop")),
    ];
    for (agg, f) in reductions {
        builder = builder.register(OpKind::Reduction(agg), f);
    }

    builder.build()
}

/// The generic rewrite registry: boolean aggregates become min/max
pub fn rewrite_registry() -> RewriteRegistry {
    RewriteRegistry::builder()
        .register(OpKind::Reduction(Agg::Any), rewrite(|e| reaggregate(e, Agg::Max, false)))
        .register(OpKind::Reduction(Agg::All), rewrite(|e| reaggregate(e, Agg::Min, false)))
        .register(OpKind::Reduction(Agg::NotAny), rewrite(|e| reaggregate(e, Agg::Max, true)))
        .register(OpKind::Reduction(Agg::NotAll), rewrite(|e| reaggregate(e, Agg::Min, true)))
        .build()
}

fn reaggregate(expr: &Expr, to: Agg, negate: bool) -> Expr {
    let Op::Reduction { args, filter, .. } = &expr.op else {
        return expr.clone();
    };
    let mut out = Expr::new(
        Op::Reduction {
            func: to,
            args: args.clone(),
            filter: filter.clone(),
        },
        expr.dtype.clone(),
    );
    if negate {
        out = out.not();
    }
    out.name = expr.name.clone();
    out
}

/// Generic literal rendering by value shape
pub fn format_generic_literal(value: &Value, dtype: &DataType) -> Result<String, TranslateError> {
    match (value, dtype) {
        (Value::Null, _) => Ok("NULL".to_string()),
        (Value::Bool(true), _) => Ok("TRUE".to_string()),
        (Value::Bool(false), _) => Ok("FALSE".to_string()),
        (Value::Int(i), _) => Ok(i.to_string()),
        (Value::Float(f), _) => Ok(format!("{f:?}")),
        (Value::Decimal(d), _) => Ok(d.clone()),
        (Value::String(s), _) => Ok(quote_string(s)),
        (Value::Interval(n), DataType::Interval { unit }) => {
            Ok(format!("INTERVAL {n} {}", unit.sql_name()))
        }
        (value, dtype) => Err(TranslateError::NotImplemented(format!(
            "{} literal of type {dtype}",
            value.shape_name()
        ))),
    }
}

/// Single-quote a string with backslash escapes
pub fn quote_string(s: &str) -> String {
    let mut quoted = String::with_capacity(s.len() + 2);
    quoted.push('\'');
    for c in s.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '\'' => quoted.push_str("\\'"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            c => quoted.push(c),
        }
    }
    quoted.push('\'');
    quoted
}

fn literal(_t: &mut dyn ExprTranslator, expr: &Expr) -> Result<String, TranslateError> {
    match expr.literal_value() {
        Some(value) => format_generic_literal(value, &expr.dtype),
        None => Err(malformed(expr, "expected a literal")),
    }
}

fn column(_t: &mut dyn ExprTranslator, expr: &Expr) -> Result<String, TranslateError> {
    match &expr.op {
        Op::Column { name, .. } => Ok(backtick_quote(name)),
        _ => Err(malformed(expr, "expected a column")),
    }
}

fn scalar_parameter(t: &mut dyn ExprTranslator, expr: &Expr) -> Result<String, TranslateError> {
    match &expr.op {
        Op::ScalarParameter { name } => t.bind_parameter(name, &expr.dtype),
        _ => Err(malformed(expr, "expected a scalar parameter")),
    }
}

fn table_scan(t: &mut dyn ExprTranslator, expr: &Expr) -> Result<String, TranslateError> {
    match &expr.op {
        Op::TableScan { name, .. } => Ok(format!("SELECT *\nFROM {}", t.quote_identifier(name))),
        _ => Err(malformed(expr, "expected a table scan")),
    }
}

fn cast(t: &mut dyn ExprTranslator, expr: &Expr) -> Result<String, TranslateError> {
    match &expr.op {
        Op::Cast { arg } => Ok(format!(
            "CAST({} AS {})",
            t.translate(arg)?,
            expr.dtype.to_string().to_uppercase()
        )),
        _ => Err(malformed(expr, "expected a cast")),
    }
}

fn if_else(t: &mut dyn ExprTranslator, expr: &Expr) -> Result<String, TranslateError> {
    match &expr.op {
        Op::IfElse { cond, then, otherwise } => Ok(format!(
            "CASE WHEN {} THEN {} ELSE {} END",
            t.translate(cond)?,
            t.translate(then)?,
            t.translate(otherwise)?
        )),
        _ => Err(malformed(expr, "expected a conditional")),
    }
}

fn binary(t: &mut dyn ExprTranslator, expr: &Expr) -> Result<String, TranslateError> {
    let Op::Binary { op, left, right } = &expr.op else {
        return Err(malformed(expr, "expected a binary operation"));
    };
    let l = translate_nested(t, left)?;
    let r = translate_nested(t, right)?;

    let symbol = match op {
        BinaryOp::Add => "+",
        BinaryOp::Subtract => "-",
        BinaryOp::Multiply => "*",
        BinaryOp::Divide => "/",
        BinaryOp::Modulus => "%",
        BinaryOp::Equals => "=",
        BinaryOp::NotEquals => "!=",
        BinaryOp::Less => "<",
        BinaryOp::LessEqual => "<=",
        BinaryOp::Greater => ">",
        BinaryOp::GreaterEqual => ">=",
        BinaryOp::IdenticalTo => "IS NOT DISTINCT FROM",
        BinaryOp::And => "AND",
        BinaryOp::Or => "OR",
        BinaryOp::Power => return Ok(format!("pow({l}, {r})")),
        BinaryOp::FloorDivide => return Ok(format!("floor({l} / {r})")),
        BinaryOp::Xor => return Ok(format!("({l} OR {r}) AND NOT ({l} AND {r})")),
    };
    Ok(format!("{l} {symbol} {r}"))
}

fn set_op(t: &mut dyn ExprTranslator, expr: &Expr) -> Result<String, TranslateError> {
    let Op::SetOp { kind, left, right, distinct } = &expr.op else {
        return Err(malformed(expr, "expected a set operation"));
    };
    let keyword = match (kind, distinct) {
        (SetOpKind::Union, true) => "UNION",
        (SetOpKind::Union, false) => "UNION ALL",
        (SetOpKind::Intersection, _) => "INTERSECT",
        (SetOpKind::Difference, _) => "EXCEPT",
    };
    Ok(format!("{}\n{keyword}\n{}", t.translate(left)?, t.translate(right)?))
}

fn negate(t: &mut dyn ExprTranslator, expr: &Expr) -> Result<String, TranslateError> {
    match expr.operands().as_slice() {
        [arg] => Ok(format!("-{}", translate_nested(t, arg)?)),
        _ => Err(malformed(expr, "expected one argument")),
    }
}

fn not(t: &mut dyn ExprTranslator, expr: &Expr) -> Result<String, TranslateError> {
    match expr.operands().as_slice() {
        [arg] => Ok(format!("NOT {}", translate_nested(t, arg)?)),
        _ => Err(malformed(expr, "expected one argument")),
    }
}

fn postfix(t: &mut dyn ExprTranslator, expr: &Expr, suffix: &str) -> Result<String, TranslateError> {
    match expr.operands().as_slice() {
        [arg] => Ok(format!("{} {suffix}", translate_nested(t, arg)?)),
        _ => Err(malformed(expr, "expected one argument")),
    }
}

fn between(t: &mut dyn ExprTranslator, expr: &Expr) -> Result<String, TranslateError> {
    match expr.operands().as_slice() {
        [arg, lower, upper] => Ok(format!(
            "{} BETWEEN {} AND {}",
            translate_nested(t, arg)?,
            translate_nested(t, lower)?,
            translate_nested(t, upper)?
        )),
        _ => Err(malformed(expr, "expected three arguments")),
    }
}

fn like(t: &mut dyn ExprTranslator, expr: &Expr) -> Result<String, TranslateError> {
    match expr.operands().as_slice() {
        [arg, pattern] => Ok(format!(
            "{} LIKE {}",
            translate_nested(t, arg)?,
            translate_nested(t, pattern)?
        )),
        _ => Err(malformed(expr, "expected two arguments")),
    }
}

fn log(t: &mut dyn ExprTranslator, expr: &Expr) -> Result<String, TranslateError> {
    match expr.operands().as_slice() {
        [arg] => Ok(format!("ln({})", t.translate(arg)?)),
        [arg, base] => Ok(format!("log({}, {})", t.translate(base)?, t.translate(arg)?)),
        _ => Err(malformed(expr, "expected one or two arguments")),
    }
}

/// `substr(x, start + 1[, length])`, shifting the zero-based start
pub fn substring(t: &mut dyn ExprTranslator, expr: &Expr) -> Result<String, TranslateError> {
    match expr.operands().as_slice() {
        [arg, start] => Ok(format!(
            "substr({}, {} + 1)",
            t.translate(arg)?,
            translate_nested(t, start)?
        )),
        [arg, start, length] => Ok(format!(
            "substr({}, {} + 1, {})",
            t.translate(arg)?,
            translate_nested(t, start)?,
            t.translate(length)?
        )),
        _ => Err(malformed(expr, "expected two or three arguments")),
    }
}

fn find_in_set(t: &mut dyn ExprTranslator, expr: &Expr) -> Result<String, TranslateError> {
    match expr.operands().as_slice() {
        [needle, values @ ..] if !values.is_empty() => {
            let mut rendered = Vec::with_capacity(values.len());
            for v in values {
                rendered.push(t.translate(v)?);
            }
            Ok(format!(
                "find_in_set({}, '{}') - 1",
                t.translate(needle)?,
                rendered.join(",")
            ))
        }
        _ => Err(malformed(expr, "expected a needle and at least one value")),
    }
}

fn count_distinct(t: &mut dyn ExprTranslator, expr: &Expr) -> Result<String, TranslateError> {
    match &expr.op {
        Op::Reduction { args, filter, .. } if args.len() == 1 => {
            let arg = crate::helpers::wrap_where(&args[0], filter.as_deref());
            Ok(format!("count(DISTINCT {})", t.translate(&arg)?))
        }
        _ => Err(malformed(expr, "expected a single-argument reduction")),
    }
}
