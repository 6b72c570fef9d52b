//! Compiler error types.
//!
//! All compile-phase failures are fatal: the compile entry points return the
//! first error and produce no partial result. Runtime path/helper misses are
//! not errors and never surface here.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ast::SourceLocation;

/// Error code discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
#[repr(u8)]
pub enum ErrorCode {
    #[error("unexpected token")]
    UnexpectedToken,
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("mismatched block close tag")]
    MismatchedBlock,
    #[error("invalid path expression")]
    InvalidPath,
    #[error("invalid block parameters")]
    InvalidBlockParams,
    #[error("unclosed element")]
    UnclosedElement,
    #[error("invalid end tag")]
    InvalidEndTag,
    #[error("end tag for void element")]
    EndTagForVoidElement,
    #[error("unquoted attribute value with multiple parts")]
    UnquotedAttributeConcat,
    #[error("keyword and block params on the same block")]
    KeywordAndBlockParams,
    #[error("invalid template spec")]
    InvalidSpec,
    #[error("deprecated template syntax")]
    Deprecated,
}

/// A fatal compilation error with an optional source location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("{message}")]
pub struct CompilerError {
    pub code: ErrorCode,
    pub message: std::string::String,
    pub loc: Option<SourceLocation>,
}

impl CompilerError {
    pub fn new(code: ErrorCode, message: impl Into<std::string::String>) -> Self {
        Self {
            code,
            message: message.into(),
            loc: None,
        }
    }

    /// Build an error whose message carries the source line and column.
    pub fn at(code: ErrorCode, message: impl Into<std::string::String>, loc: SourceLocation) -> Self {
        let mut message = message.into();
        message.push_str(&format!(
            " (on line {}, column {})",
            loc.start.line, loc.start.column
        ));
        Self {
            code,
            message,
            loc: Some(loc),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Position;

    #[test]
    fn error_message_includes_location() {
        let loc = SourceLocation::new(Position::new(3, 7), Position::new(3, 12));
        let err = CompilerError::at(ErrorCode::MismatchedBlock, "foo doesn't match bar", loc);
        assert_eq!(err.to_string(), "foo doesn't match bar (on line 3, column 7)");
        assert_eq!(err.code, ErrorCode::MismatchedBlock);
    }
}
