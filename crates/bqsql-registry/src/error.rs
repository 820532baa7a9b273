//! Translation errors shared by every dialect

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TranslateError {
    /// The operator exists but cannot be expressed for the given arguments
    #[error("{0}")]
    UnsupportedOperation(String),

    #[error("{0}")]
    UnsupportedType(String),

    #[error("cannot represent {value} as a {dtype} literal")]
    UnrepresentableLiteral { value: String, dtype: String },

    #[error("{0}")]
    NotImplemented(String),

    #[error("{0}")]
    InvalidValue(String),

    #[error("no value supplied for query parameter '{0}'")]
    MissingParameter(String),

    #[error("{0}")]
    ParameterBinding(String),

    /// A formatter received a node shaped differently from its registered kind
    #[error("malformed {kind} node: {reason}")]
    MalformedNode { kind: String, reason: String },
}

impl TranslateError {
    pub fn unsupported(msg: impl Into<String>) -> Self {
        TranslateError::UnsupportedOperation(msg.into())
    }

    pub fn not_implemented(msg: impl Into<String>) -> Self {
        TranslateError::NotImplemented(msg.into())
    }
}
