//! Formatter building blocks shared by the base layer and dialects

use crate::{formatter, ExprTranslator, Formatter, TranslateError};
use bqsql_ir::{Expr, Func, Op};

/// `NAME(a, b, ...)` with exactly `arity` operands
pub fn fixed_arity(name: &'static str, arity: usize) -> Formatter {
    formatter(move |t, expr| {
        let operands = expr.operands();
        if operands.len() != arity {
            return Err(malformed(
                expr,
                format!("expected {arity} arguments, got {}", operands.len()),
            ));
        }
        let args = translate_all(t, &operands)?;
        Ok(format!("{name}({})", args.join(", ")))
    })
}

/// `NAME(a, b, ...)` over any number of operands
pub fn variadic(name: &'static str) -> Formatter {
    formatter(move |t, expr| {
        let args = translate_all(t, &expr.operands())?;
        Ok(format!("{name}({})", args.join(", ")))
    })
}

pub fn unary(name: &'static str) -> Formatter {
    fixed_arity(name, 1)
}

/// Aggregate `NAME(args)`; a `where` filter masks every argument
pub fn reduction(name: &'static str) -> Formatter {
    formatter(move |t, expr| match &expr.op {
        Op::Reduction { args, filter, .. } => {
            let mut rendered = Vec::with_capacity(args.len());
            for arg in args {
                rendered.push(t.translate(&wrap_where(arg, filter.as_deref()))?);
            }
            Ok(format!("{name}({})", rendered.join(", ")))
        }
        _ => Err(malformed(expr, "expected a reduction")),
    })
}

/// `CASE WHEN filter THEN arg ELSE NULL END`, or `arg` when unfiltered
pub fn wrap_where(arg: &Expr, filter: Option<&Expr>) -> Expr {
    match filter {
        Some(cond) => Expr::if_else(cond.clone(), arg.clone(), Expr::null(arg.dtype.clone())),
        None => arg.clone(),
    }
}

/// Backtick-quote a name, escaping embedded backticks
pub fn backtick_quote(name: &str) -> String {
    format!("`{}`", name.replace('`', "\\`"))
}

pub fn translate_all(
    t: &mut dyn ExprTranslator,
    operands: &[&Expr],
) -> Result<Vec<String>, TranslateError> {
    operands.iter().map(|e| t.translate(e)).collect()
}

/// Operands that must be parenthesized when nested inside an infix operator
pub fn needs_parens(expr: &Expr) -> bool {
    match &expr.op {
        Op::Binary { .. } => true,
        Op::Call { func, .. } => matches!(
            func,
            Func::IsNull | Func::NotNull | Func::Not | Func::Between | Func::StringSQLLike
        ),
        _ => false,
    }
}

pub fn translate_nested(t: &mut dyn ExprTranslator, expr: &Expr) -> Result<String, TranslateError> {
    let sql = t.translate(expr)?;
    if needs_parens(expr) {
        Ok(format!("({sql})"))
    } else {
        Ok(sql)
    }
}

pub fn malformed(expr: &Expr, reason: impl Into<String>) -> TranslateError {
    TranslateError::MalformedNode {
        kind: expr.kind().to_string(),
        reason: reason.into(),
    }
}
