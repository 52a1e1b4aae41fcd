// Runtime and parse error types for the Brewin interpreter.
//
// The four kinds mirror the taxonomy in SPEC_FULL.md §7. Every variant
// carries the source line nearest the offending construct, the way the
// teacher's `vm::Error` pins a `TypeTag`/`usize` to each failure instead of
// just a bare string.

use enumflags2::BitFlags;
use thiserror::Error;

use crate::value::TypeTag;

#[derive(Debug, Clone, Error)]
pub enum BrewinError {
    #[error("TypeError: {message} (line {line})")]
    Type { message: String, line: usize },

    #[error("NameError: {message} (line {line})")]
    Name { message: String, line: usize },

    #[error("FaultError: {message} (line {line})")]
    Fault { message: String, line: usize },

    #[error("SyntaxError: {message} (line {line})")]
    Syntax { message: String, line: usize },
}

pub type Result<T> = std::result::Result<T, BrewinError>;

impl BrewinError {
    pub fn type_error<S: Into<String>>(message: S, line: usize) -> Self {
        BrewinError::Type { message: message.into(), line }
    }

    pub fn name_error<S: Into<String>>(message: S, line: usize) -> Self {
        BrewinError::Name { message: message.into(), line }
    }

    pub fn fault_error<S: Into<String>>(message: S, line: usize) -> Self {
        BrewinError::Fault { message: message.into(), line }
    }

    pub fn syntax_error<S: Into<String>>(message: S, line: usize) -> Self {
        BrewinError::Syntax { message: message.into(), line }
    }

    /// Build a TypeError describing a value that didn't match one of a set
    /// of expected tags, e.g. "expected Int or Str, got Bool".
    pub fn expected(expect: BitFlags<TypeTag>, got: TypeTag, line: usize) -> Self {
        let names: Vec<&str> = TypeTag::ALL
            .iter()
            .filter(|t| expect.contains(**t))
            .map(|t| t.name())
            .collect();
        BrewinError::type_error(
            format!("expected {}, got {}", names.join(" or "), got.name()),
            line,
        )
    }
}
