//! AST error types

use thiserror::Error;

/// AST operation errors
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AstError {
    #[error("Parse error: {message}")]
    Parse { message: String },

    #[error("Transformation error: {message}")]
    Transformation { message: String },

    #[error("Unsupported syntax: {feature}")]
    UnsupportedSyntax { feature: String },
}

impl AstError {
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    pub fn transformation(message: impl Into<String>) -> Self {
        Self::Transformation {
            message: message.into(),
        }
    }

    pub fn unsupported_syntax(feature: impl Into<String>) -> Self {
        Self::UnsupportedSyntax {
            feature: feature.into(),
        }
    }
}

/// Result type alias for AST operations
pub type AstResult<T> = Result<T, AstError>;
