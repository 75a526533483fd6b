//! Error types.
//!
//! None of these are fatal to the host document: the binder turns every one
//! of them into a diagnostic and skips the affected binding.

use thiserror::Error;

/// Attribute text could not be turned into a callable.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{label}: {message} at offset {offset}")]
pub struct CompileError {
    /// Human-readable name of what was being compiled.
    pub label: String,
    pub message: String,
    /// Byte offset into the source text.
    pub offset: usize,
}

impl CompileError {
    pub fn new(label: impl Into<String>, message: impl Into<String>, offset: usize) -> Self {
        Self {
            label: label.into(),
            message: message.into(),
            offset,
        }
    }
}

/// A compiled callable failed while running.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("{0} is not defined")]
    Reference(String),

    #[error("type error: {0}")]
    Type(String),

    /// A value raised with `throw`.
    #[error("uncaught {0}")]
    Thrown(String),

    /// An asynchronous result settled as a failure.
    #[error("rejected: {0}")]
    Rejected(String),

    #[error("maximum call depth of {0} exceeded")]
    CallDepth(usize),

    #[error("expression nesting deeper than {0} levels")]
    Nesting(usize),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Registry operations that were refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("signal \"{0}\" already exists")]
    DuplicateSignal(String),

    #[error("method \"{0}\" already exists")]
    DuplicateMethod(String),

    #[error("method \"{0}\" is not a function")]
    NotCallable(String),

    #[error("no signal named \"{0}\"")]
    UnknownSignal(String),

    #[error("methods are read-only, cannot assign \"{0}\"")]
    ReadOnlyMethod(String),
}

/// Configuration could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("attribute prefix must not be empty")]
    EmptyPrefix,

    #[error("event prefix must not be empty")]
    EmptyEventPrefix,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_error_display_includes_label_and_offset() {
        let err = CompileError::new("h-text", "unexpected token", 4);
        assert_eq!(err.to_string(), "h-text: unexpected token at offset 4");
    }

    #[test]
    fn store_error_converts_into_runtime_error() {
        let err: RuntimeError = StoreError::UnknownSignal("count".into()).into();
        assert_eq!(err.to_string(), "no signal named \"count\"");
    }
}
