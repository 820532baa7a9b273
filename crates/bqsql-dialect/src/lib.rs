//! BigQuery dialect for the bqsql expression IR
//!
//! Compiles typed expression trees into BigQuery Standard SQL plus a list of
//! typed query parameters:
//!
//! ```text
//! Expr ─▶ Rewriter ─▶ QueryTranslator (operation registry) ─▶ CompiledQuery
//!                                                   └─ params::bind ─┘
//! ```

pub mod compiler;
pub mod datatypes;
pub mod identifiers;
pub mod literal;
pub mod params;
pub mod registry;
pub mod rewrites;

pub use compiler::{CompiledQuery, Compiler, ParamNaming, TranslationContext};
pub use datatypes::{to_bigquery_type, to_host_type, FieldMode, FieldSchema};
pub use identifiers::quote_identifier;
pub use literal::format_literal;
pub use params::{bind, QueryParameter};
pub use registry::operation_registry;
pub use rewrites::{rewrite_registry, Rewriter};

pub use bqsql_registry::TranslateError;

use bqsql_ir::{Expr, Params};

/// Compile with declared parameter names
pub fn compile(expr: &Expr, params: &Params) -> Result<CompiledQuery, TranslateError> {
    Compiler::default().compile(expr, params)
}
