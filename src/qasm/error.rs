// src/qasm/error.rs

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// A location in an OpenQASM source: file name, 1-based line, 1-based column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    /// File the source came from, or `<input>` for in-memory strings
    pub file: Arc<str>,
    /// Line number
    pub line: usize,
    /// Column number
    pub col: usize,
}

impl Span {
    /// Builds a span.
    pub fn new(file: Arc<str>, line: usize, col: usize) -> Self {
        Self { file, line, col }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{},{}", self.file, self.line, self.col)
    }
}

/// Failures of the OpenQASM loader and of the circuit simulator.
#[derive(Debug, Error)]
pub enum QasmError {
    /// A source or included file could not be read.
    #[error("could not read '{}': {source}", path.display())]
    Io {
        /// File that failed to open
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: io::Error,
    },

    /// The text is not valid OpenQASM (within the supported subset).
    #[error("{span}: {message}")]
    Syntax {
        /// Where parsing stopped
        span: Span,
        /// What was expected
        message: String,
    },

    /// The program parsed but cannot be unrolled: unknown names, size
    /// mismatches, bad indices and so on.
    #[error("{span}: {message}")]
    Semantic {
        /// Offending construct
        span: Span,
        /// Explanation
        message: String,
    },

    /// The simulator could not run the circuit.
    #[error("Simulation Process Error: {message}")]
    Simulation {
        /// Explanation
        message: String,
    },
}

impl QasmError {
    pub(crate) fn syntax(span: &Span, message: impl Into<String>) -> Self {
        QasmError::Syntax {
            span: span.clone(),
            message: message.into(),
        }
    }

    pub(crate) fn semantic(span: &Span, message: impl Into<String>) -> Self {
        QasmError::Semantic {
            span: span.clone(),
            message: message.into(),
        }
    }
}
