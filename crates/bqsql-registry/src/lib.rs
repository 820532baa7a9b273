//! Operator dispatch for SQL dialect compilers
//!
//! A dialect is a pair of tables keyed by [`OpKind`]: formatters that render a
//! node to SQL text and rewrite rules that replace a node before rendering.
//! [`base`] provides the generic SQL layer dialects build on.

use bqsql_ir::{DataType, Expr};
use std::sync::Arc;

pub mod base;
mod error;
pub mod helpers;
mod table;

pub use bqsql_ir::OpKind;
pub use error::TranslateError;
pub use table::{DispatchTable, DispatchTableBuilder};

/// Callback into the tree walker, handed to every formatter
pub trait ExprTranslator {
    /// Render a sub-expression through the registry
    fn translate(&mut self, expr: &Expr) -> Result<String, TranslateError>;

    /// Quote a table identifier for the target dialect
    fn quote_identifier(&self, name: &str) -> String;

    /// Record a named parameter and return its SQL placeholder
    fn bind_parameter(&mut self, name: &str, dtype: &DataType) -> Result<String, TranslateError>;
}

/// Renders one node kind to SQL
pub type Formatter =
    Arc<dyn Fn(&mut dyn ExprTranslator, &Expr) -> Result<String, TranslateError> + Send + Sync>;

/// Replaces one node kind with an equivalent tree
pub type RewriteRule = Arc<dyn Fn(&Expr) -> Expr + Send + Sync>;

pub type OperationRegistry = DispatchTable<Formatter>;
pub type RewriteRegistry = DispatchTable<RewriteRule>;

/// Wrap a closure as a [`Formatter`]
pub fn formatter<F>(f: F) -> Formatter
where
    F: Fn(&mut dyn ExprTranslator, &Expr) -> Result<String, TranslateError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wrap a closure as a [`RewriteRule`]
pub fn rewrite<F>(f: F) -> RewriteRule
where
    F: Fn(&Expr) -> Expr + Send + Sync + 'static,
{
    Arc::new(f)
}
