// src/qasm/mod.rs

//! Loader for the OpenQASM 3 subset the bundled templates are written in.
//!
//! Loading runs a lexer, a statement parser with a Pratt expression parser,
//! and an unroller that executes the classical control flow and produces a
//! flat [`Circuit`](crate::circuits::Circuit). Supported: version header,
//! includes (`stdgates.inc` is built in), `qubit`/`bit` declarations, integer
//! constants, `def` subroutines and calls, `for` loops over ranges, `if`/`else`,
//! the standard single, two and three qubit gates with register broadcasting,
//! `measure`, `reset` and `barrier`. Integer arithmetic is arbitrary precision.

mod ast;
mod error;
mod lex;
mod module;
mod parse;
mod unroll;

pub use error::{QasmError, Span};
pub use module::{QasmModule, Register};

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info_span};

use parse::parse_source;
use unroll::Unroller;

/// Turns a program file into a loaded module.
///
/// Program generation is written against this trait so the loading step can
/// be swapped out.
pub trait ModuleLoader {
    type Module;

    /// Loads the program stored at `path`.
    fn load(&self, path: &Path) -> Result<Self::Module, QasmError>;
}

/// The bundled OpenQASM 3 loader.
#[derive(Debug, Clone, Default)]
pub struct QasmLoader {
    /// Directories searched for includes that are not beside the including file.
    include_paths: Vec<PathBuf>,
}

impl QasmLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a directory to the include search path.
    pub fn with_include_path(mut self, directory: impl Into<PathBuf>) -> Self {
        self.include_paths.push(directory.into());
        self
    }

    pub fn include_paths(&self) -> &[PathBuf] {
        &self.include_paths
    }

    /// Loads a program held in memory. Relative includes are resolved against
    /// the include search path only.
    pub fn load_str(&self, source: &str) -> Result<QasmModule, QasmError> {
        let statements = parse_source(source, Arc::from("<input>"))?;
        let unrolled = Unroller::new(&self.include_paths).run(&statements, None)?;
        Ok(QasmModule::from_unrolled("<input>".to_string(), unrolled))
    }
}

impl ModuleLoader for QasmLoader {
    type Module = QasmModule;

    fn load(&self, path: &Path) -> Result<QasmModule, QasmError> {
        let _span = info_span!("load", path = %path.display()).entered();
        let source = fs::read_to_string(path).map_err(|source| QasmError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let statements = parse_source(&source, Arc::from(path.display().to_string()))?;
        debug!(statements = statements.len(), "parsed program");
        let unrolled = Unroller::new(&self.include_paths).run(&statements, Some(path))?;
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(QasmModule::from_unrolled(name, unrolled))
    }
}
