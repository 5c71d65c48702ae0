//! Error handling logic

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::qasm::QasmError;

/// Errors raised while deriving, staging or emitting Deutsch-Jozsa circuits.
///
/// Every file-system failure carries the path involved. Failures of the module
/// loader are passed through untouched.
#[derive(Debug, Error)]
pub enum DjError {
    /// The bitstring is empty or holds something other than `0`/`1`.
    #[error("Invalid Bitstring: {message}")]
    InvalidBitstring {
        /// What was wrong with the input
        message: String,
    },

    /// A bundled template resource is missing or unreadable.
    #[error("Template Unavailable ({}): {source}", path.display())]
    TemplateUnavailable {
        /// The resource that could not be read
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: io::Error,
    },

    /// The destination file could not be written or rewritten.
    #[error("Destination Not Writable ({}): {source}", path.display())]
    Destination {
        /// The file (or directory) that could not be written
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: io::Error,
    },

    /// The temporary staging directory could not be created or removed.
    #[error("Staging Failure: {source}")]
    Staging {
        /// Underlying I/O failure
        #[source]
        source: io::Error,
    },

    /// The confirmation line could not be written to the console sink.
    #[error("Console Write Failure: {source}")]
    Console {
        /// Underlying I/O failure
        #[source]
        source: io::Error,
    },

    /// The module loader rejected the generated program.
    #[error(transparent)]
    Load(#[from] QasmError),
}
