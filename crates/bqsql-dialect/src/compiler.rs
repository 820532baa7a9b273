//! Expression to BigQuery SQL compilation

use bqsql_ir::{DataType, Expr, Params};
use bqsql_registry::helpers::backtick_quote;
use bqsql_registry::{ExprTranslator, OperationRegistry, RewriteRegistry, TranslateError};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::identifiers::quote_identifier;
use crate::params::{bind, QueryParameter};
use crate::registry::operation_registry;
use crate::rewrites::{rewrite_registry, Rewriter};

/// Alias of a value expression that carries no name
pub const DEFAULT_ALIAS: &str = "tmp";

/// How named parameters are rendered in the SQL text.
///
/// Fixed when the compiler is built; newer clients accept the declared names,
/// older ones need positional-looking generated names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamNaming {
    /// `@name` as declared in the expression
    #[default]
    Declared,
    /// `@param_0`, `@param_1`, ... in order of first appearance
    Generated,
}

/// SQL text plus the parameters it references
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledQuery {
    pub sql: String,
    pub parameters: Vec<QueryParameter>,
}

impl CompiledQuery {
    /// SHA-256 over the SQL and the wire form of its parameters
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.sql.as_bytes());
        for param in &self.parameters {
            hasher.update(param.to_api_repr().to_string().as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }
}

#[derive(Debug, Clone)]
struct Placeholder {
    name: String,
    dtype: DataType,
}

/// Per-compilation state: parameters seen so far and the name counter
#[derive(Debug, Default)]
pub struct TranslationContext {
    params: IndexMap<String, Placeholder>,
    counter: usize,
}

impl TranslationContext {
    fn placeholder(&mut self, name: &str, dtype: &DataType, naming: ParamNaming) -> String {
        if let Some(existing) = self.params.get(name) {
            return existing.name.clone();
        }
        let placeholder = match naming {
            ParamNaming::Declared => name.to_string(),
            ParamNaming::Generated => {
                let generated = format!("param_{}", self.counter);
                self.counter += 1;
                generated
            }
        };
        self.params.insert(
            name.to_string(),
            Placeholder {
                name: placeholder.clone(),
                dtype: dtype.clone(),
            },
        );
        placeholder
    }

    /// Bind every referenced parameter, in order of first appearance
    fn bind_all(&self, values: &Params) -> Result<Vec<QueryParameter>, TranslateError> {
        let mut bound = Vec::with_capacity(self.params.len());
        for (declared, placeholder) in &self.params {
            let value = values
                .get(declared)
                .ok_or_else(|| TranslateError::MissingParameter(declared.clone()))?;
            bound.push(bind(&placeholder.name, &placeholder.dtype, value)?);
        }
        Ok(bound)
    }
}

struct QueryTranslator<'a> {
    registry: &'a OperationRegistry,
    params: &'a Params,
    naming: ParamNaming,
    context: TranslationContext,
}

impl ExprTranslator for QueryTranslator<'_> {
    fn translate(&mut self, expr: &Expr) -> Result<String, TranslateError> {
        let kind = expr.kind();
        let f = self.registry.get(kind).cloned().ok_or_else(|| {
            TranslateError::not_implemented(format!("{kind} is not supported by the BigQuery dialect"))
        })?;
        f(self as &mut dyn ExprTranslator, expr)
    }

    fn quote_identifier(&self, name: &str) -> String {
        quote_identifier(name)
    }

    fn bind_parameter(&mut self, name: &str, dtype: &DataType) -> Result<String, TranslateError> {
        if !self.params.contains_key(name) {
            return Err(TranslateError::MissingParameter(name.to_string()));
        }
        Ok(format!("@{}", self.context.placeholder(name, dtype, self.naming)))
    }
}

/// BigQuery compiler: rewrite, then render through the operation registry.
///
/// Immutable after construction and safe to share across threads; each call
/// to [`Compiler::compile`] owns its own translation context.
#[derive(Clone)]
pub struct Compiler {
    registry: Arc<OperationRegistry>,
    rewriter: Rewriter,
    param_naming: ParamNaming,
}

impl Compiler {
    pub fn new(param_naming: ParamNaming) -> Self {
        Self::with_registries(
            Arc::new(operation_registry()),
            Arc::new(rewrite_registry()),
            param_naming,
        )
    }

    /// Build from caller-extended registries
    pub fn with_registries(
        operations: Arc<OperationRegistry>,
        rewrites: Arc<RewriteRegistry>,
        param_naming: ParamNaming,
    ) -> Self {
        Self {
            registry: operations,
            rewriter: Rewriter::new(rewrites),
            param_naming,
        }
    }

    pub fn param_naming(&self) -> ParamNaming {
        self.param_naming
    }

    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    /// Compile an expression tree to a complete BigQuery statement
    pub fn compile(&self, expr: &Expr, params: &Params) -> Result<CompiledQuery, TranslateError> {
        let expr = self.rewriter.rewrite(expr);
        let mut translator = QueryTranslator {
            registry: &self.registry,
            params,
            naming: self.param_naming,
            context: TranslationContext::default(),
        };

        let body = translator.translate(&expr)?;
        let sql = if expr.is_table() {
            body
        } else {
            let alias = expr.name.as_deref().unwrap_or(DEFAULT_ALIAS);
            let mut sql = format!("SELECT {body} AS {}", backtick_quote(alias));
            if let [table] = expr.referenced_tables().as_slice() {
                sql.push_str("\nFROM ");
                sql.push_str(&quote_identifier(table));
            }
            sql
        };

        let parameters = translator.context.bind_all(params)?;
        tracing::debug!(
            sql = %sql,
            parameters = parameters.len(),
            naming = ?self.param_naming,
            "Compiled BigQuery expression"
        );
        Ok(CompiledQuery { sql, parameters })
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new(ParamNaming::default())
    }
}
