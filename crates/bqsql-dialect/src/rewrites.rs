//! Pre-compilation rewrites for operators BigQuery expresses differently

use bqsql_ir::{Agg, BinaryOp, DataType, Expr, Func, Op, OpKind};
use bqsql_registry::{base, rewrite, RewriteRegistry};
use std::sync::Arc;

/// BigQuery rewrite rules layered over the generic ones
pub fn rewrite_registry() -> RewriteRegistry {
    let mut builder = base::rewrite_registry()
        .to_builder()
        .register(OpKind::Call(Func::DayOfWeekName), rewrite(day_of_week_name))
        .register(OpKind::Binary(BinaryOp::FloorDivide), rewrite(floor_divide))
        .register(OpKind::Binary(BinaryOp::IdenticalTo), rewrite(identical_to))
        .register(OpKind::Call(Func::Log2), rewrite(log2))
        .register(OpKind::Reduction(Agg::Sum), rewrite(boolean_as_integer))
        .register(OpKind::Reduction(Agg::Mean), rewrite(boolean_as_integer));

    // BigQuery has LOGICAL_AND/LOGICAL_OR, so the generic min/max expansion is undone
    for agg in [Agg::Any, Agg::All, Agg::NotAny, Agg::NotAll] {
        builder = builder.register(OpKind::Reduction(agg), rewrite(|e| e.clone()));
    }

    builder.build()
}

/// Top-down rewrite pass.
///
/// At each node the rule for its kind runs once, then the pass descends into
/// the operands of the result. Rules never fail; a rule that does not apply
/// returns its input.
#[derive(Clone)]
pub struct Rewriter {
    rules: Arc<RewriteRegistry>,
}

impl Rewriter {
    pub fn new(rules: Arc<RewriteRegistry>) -> Self {
        Self { rules }
    }

    pub fn bigquery() -> Self {
        Self::new(Arc::new(rewrite_registry()))
    }

    pub fn rewrite(&self, expr: &Expr) -> Expr {
        let mut node = match self.rules.get(expr.kind()) {
            Some(rule) => rule(expr),
            None => expr.clone(),
        };
        if node.name.is_none() {
            node.name = expr.name.clone();
        }
        node.map_operands(|operand| self.rewrite(operand))
    }
}

impl Default for Rewriter {
    fn default() -> Self {
        Self::bigquery()
    }
}

fn single_arg(expr: &Expr) -> Option<&Expr> {
    match expr.operands().as_slice() {
        [arg] => Some(*arg),
        _ => None,
    }
}

fn binary_operands(expr: &Expr) -> Option<(&Expr, &Expr)> {
    match &expr.op {
        Op::Binary { left, right, .. } => Some((left.as_ref(), right.as_ref())),
        _ => None,
    }
}

fn day_of_week_name(expr: &Expr) -> Expr {
    match single_arg(expr) {
        Some(arg) => arg.clone().strftime("%A"),
        None => expr.clone(),
    }
}

/// `floor(left / right)`
fn floor_divide(expr: &Expr) -> Expr {
    match binary_operands(expr) {
        Some((left, right)) => left.clone().divide(right.clone()).floor(),
        None => expr.clone(),
    }
}

/// `(left IS NULL AND right IS NULL) OR (left = right)`
fn identical_to(expr: &Expr) -> Expr {
    match binary_operands(expr) {
        Some((left, right)) => {
            let both_null = left.clone().is_null().and(right.clone().is_null());
            both_null.or(left.clone().equals(right.clone()))
        }
        None => expr.clone(),
    }
}

fn log2(expr: &Expr) -> Expr {
    match single_arg(expr) {
        Some(arg) => arg.clone().log(Some(Expr::literal(2, DataType::Int8))),
        None => expr.clone(),
    }
}

/// Boolean inputs to sum/mean are counted as integers
fn boolean_as_integer(expr: &Expr) -> Expr {
    match &expr.op {
        Op::Reduction { func, args, filter } if args.len() == 1 && args[0].dtype.is_boolean() => {
            Expr::new(
                Op::Reduction {
                    func: *func,
                    args: vec![args[0].clone().cast(DataType::Int64)],
                    filter: filter.clone(),
                },
                expr.dtype.clone(),
            )
        }
        _ => expr.clone(),
    }
}
