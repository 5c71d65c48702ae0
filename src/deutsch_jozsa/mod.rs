// src/deutsch_jozsa/mod.rs

//! Deutsch-Jozsa program generation.
//!
//! The hidden bitstring `s` defines `f(x) = s . x (mod 2)`, which is constant
//! when `s` is all zeros and balanced otherwise. Three entry points turn `s`
//! into OpenQASM:
//!
//! * [`generate_program`] stages the full program, loads it and returns the
//!   loaded module. The staging directory never outlives the call.
//! * [`save_to_qasm`] writes the `deutsch_jozsa` subroutine to `<dir>/dj.qasm`.
//! * [`generate_oracle`] writes the `oracle` subroutine to `<dir>/oracle.qasm`.
//!
//! The free functions use [`TemplateConfig::from_env`] and print to stdout.
//! [`DeutschJozsa`] takes an explicit configuration and output sink.

use std::env;
use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, info_span};

use crate::core::constants::dj_constants::{ORACLE_NAME, SUBROUTINE_NAME};
use crate::core::{generate_replacements, Bitstring, DjError, IntoBitstring};
use crate::qasm::{ModuleLoader, QasmLoader, QasmModule};
use crate::simulation::Counts;
use crate::templates::{copy_template, TemplateConfig, TemplateKind};

/// Outcome of a Deutsch-Jozsa measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    /// Every shot measured all zeros.
    Constant,
    /// Some shot measured a non-zero bitstring.
    Balanced,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Constant => write!(f, "constant"),
            Verdict::Balanced => write!(f, "balanced"),
        }
    }
}

/// Reads the verdict off a measurement histogram of the input register.
///
/// An empty histogram has no evidence of a non-zero outcome and is
/// `Constant`.
pub fn classify(counts: &Counts) -> Verdict {
    let balanced = counts
        .iter()
        .any(|(key, count)| *count > 0 && key.chars().any(|c| c != '0'));
    if balanced { Verdict::Balanced } else { Verdict::Constant }
}

/// Generator bound to one template configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeutschJozsa {
    config: TemplateConfig,
}

impl DeutschJozsa {
    pub fn new(config: TemplateConfig) -> Self {
        Self { config }
    }

    /// A generator configured from the environment.
    pub fn from_env() -> Self {
        Self::new(TemplateConfig::from_env())
    }

    pub fn config(&self) -> &TemplateConfig {
        &self.config
    }

    /// Builds the full Deutsch-Jozsa program for `bitstring` and loads it.
    ///
    /// The loaded module has `len + 1` qubits (inputs plus one ancilla) and
    /// `len` classical bits.
    pub fn generate_program(&self, bitstring: impl IntoBitstring) -> Result<QasmModule, DjError> {
        self.generate_program_with(&QasmLoader::new(), bitstring)
    }

    /// Like [`generate_program`](Self::generate_program), with a caller-chosen loader.
    ///
    /// Both templates are staged in a fresh temporary directory, which is
    /// removed before this returns whether or not loading succeeded.
    pub fn generate_program_with<L: ModuleLoader>(
        &self,
        loader: &L,
        bitstring: impl IntoBitstring,
    ) -> Result<L::Module, DjError> {
        let bitstring = bitstring.into_bitstring()?;
        let _span = info_span!("generate_program", bitstring = %bitstring).entered();
        let replacements = generate_replacements(&bitstring);

        let staging = self.config.create_staging_dir()?;
        let program = staging.path().join(TemplateKind::Program.file_name());
        let subroutine = staging.path().join(TemplateKind::Subroutine.file_name());
        copy_template(&self.config, TemplateKind::Program, &program, &replacements)?;
        copy_template(&self.config, TemplateKind::Subroutine, &subroutine, &replacements)?;

        let module = loader.load(&program)?;
        staging.close().map_err(|source| DjError::Staging { source })?;
        debug!("removed staging directory");
        Ok(module)
    }

    /// Writes the subroutine to `<path>/dj.qasm` and prints a confirmation to stdout.
    pub fn save_to_qasm(
        &self,
        bitstring: impl IntoBitstring,
        quiet: bool,
        path: Option<&Path>,
    ) -> Result<PathBuf, DjError> {
        self.save_to_qasm_to(bitstring, quiet, path, &mut io::stdout())
    }

    /// Writes the `deutsch_jozsa` subroutine for `bitstring` to `<path>/dj.qasm`,
    /// or to `dj.qasm` in the current directory when `path` is `None`. Unless
    /// `quiet`, one confirmation line goes to `out`.
    ///
    /// Returns the file written.
    pub fn save_to_qasm_to<W: Write>(
        &self,
        bitstring: impl IntoBitstring,
        quiet: bool,
        path: Option<&Path>,
        out: &mut W,
    ) -> Result<PathBuf, DjError> {
        let bitstring = bitstring.into_bitstring()?;
        let _span = info_span!("save_to_qasm", bitstring = %bitstring).entered();
        // The subroutine template is written under the program's file name.
        let destination = self.emit(&bitstring, TemplateKind::Subroutine, "dj.qasm", path)?;
        if !quiet {
            confirm(
                out,
                format_args!("Subroutine '{}' has been added to {}", SUBROUTINE_NAME, destination.display()),
            )?;
        }
        Ok(destination)
    }

    /// Writes the oracle to `<path>/oracle.qasm` and prints a confirmation to stdout.
    pub fn generate_oracle(
        &self,
        bitstring: impl IntoBitstring,
        quiet: bool,
        path: Option<&Path>,
    ) -> Result<PathBuf, DjError> {
        self.generate_oracle_to(bitstring, quiet, path, &mut io::stdout())
    }

    /// Writes the `oracle` subroutine for `bitstring` to `<path>/oracle.qasm`,
    /// or to `oracle.qasm` in the current directory when `path` is `None`.
    /// Unless `quiet`, one confirmation line goes to `out`.
    ///
    /// Returns the file written.
    pub fn generate_oracle_to<W: Write>(
        &self,
        bitstring: impl IntoBitstring,
        quiet: bool,
        path: Option<&Path>,
        out: &mut W,
    ) -> Result<PathBuf, DjError> {
        let bitstring = bitstring.into_bitstring()?;
        let _span = info_span!("generate_oracle", bitstring = %bitstring).entered();
        let destination = self.emit(&bitstring, TemplateKind::Oracle, "oracle.qasm", path)?;
        if !quiet {
            confirm(
                out,
                format_args!("Oracle '{}' has been added to {}", ORACLE_NAME, destination.display()),
            )?;
        }
        Ok(destination)
    }

    fn emit(
        &self,
        bitstring: &Bitstring,
        kind: TemplateKind,
        file_name: &str,
        path: Option<&Path>,
    ) -> Result<PathBuf, DjError> {
        let directory = match path {
            Some(dir) => dir.to_path_buf(),
            None => env::current_dir().map_err(|source| DjError::Destination {
                path: PathBuf::from("."),
                source,
            })?,
        };
        let destination = directory.join(file_name);
        copy_template(&self.config, kind, &destination, &generate_replacements(bitstring))?;
        info!(destination = %destination.display(), template = %kind, "wrote template");
        Ok(destination)
    }
}

fn confirm<W: Write>(out: &mut W, line: fmt::Arguments<'_>) -> Result<(), DjError> {
    writeln!(out, "{}", line).map_err(|source| DjError::Console { source })
}

/// Generates and loads the Deutsch-Jozsa program for `bitstring`.
///
/// # Errors
/// `DjError::InvalidBitstring` for bad input, `DjError::TemplateUnavailable`
/// when a template is missing, `DjError::Staging` for temporary directory
/// failures, and `DjError::Load` when the loader rejects the program.
pub fn generate_program(bitstring: impl IntoBitstring) -> Result<QasmModule, DjError> {
    DeutschJozsa::from_env().generate_program(bitstring)
}

/// Writes the `deutsch_jozsa` subroutine to `dj.qasm` under `path` (default:
/// the current directory) and returns the file written.
pub fn save_to_qasm(bitstring: impl IntoBitstring, quiet: bool, path: Option<&Path>) -> Result<PathBuf, DjError> {
    DeutschJozsa::from_env().save_to_qasm(bitstring, quiet, path)
}

/// Writes the `oracle` subroutine to `oracle.qasm` under `path` (default: the
/// current directory) and returns the file written.
pub fn generate_oracle(bitstring: impl IntoBitstring, quiet: bool, path: Option<&Path>) -> Result<PathBuf, DjError> {
    DeutschJozsa::from_env().generate_oracle(bitstring, quiet, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qasm::QasmError;
    use crate::simulation::Simulator;
    use std::error::Error;
    use std::fs;
    use tempdir::TempDir;

    fn counts(entries: &[(&str, usize)]) -> Counts {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify(&counts(&[("000", 100)])), Verdict::Constant);
        assert_eq!(classify(&counts(&[("000", 99), ("010", 1)])), Verdict::Balanced);
        assert_eq!(classify(&counts(&[("000", 5), ("100", 0)])), Verdict::Constant);
        assert_eq!(classify(&Counts::new()), Verdict::Constant);
    }

    #[test]
    fn test_program_measures_hidden_bitstring() -> Result<(), Box<dyn Error>> {
        let generator = DeutschJozsa::default();
        for bits in ["1", "0", "10", "001", "1101", "0000", "101100111"] {
            let module = generator.generate_program(bits)?;
            assert_eq!(module.num_qubits(), bits.len() + 1);
            assert_eq!(module.num_clbits(), bits.len());

            let result = module.simulate_with(&Simulator::with_seed(5), 32)?;
            assert_eq!(result.get(bits), 32, "bitstring {}: {}", bits, result);
            let expected = if bits.contains('1') { Verdict::Balanced } else { Verdict::Constant };
            assert_eq!(classify(result.counts()), expected);
        }
        Ok(())
    }

    struct FailingLoader;

    impl ModuleLoader for FailingLoader {
        type Module = ();

        fn load(&self, path: &Path) -> Result<(), QasmError> {
            assert!(path.is_file());
            Err(QasmError::Simulation { message: "rejected".to_string() })
        }
    }

    #[test]
    fn test_staging_removed_after_loader_failure() -> Result<(), Box<dyn Error>> {
        let root = TempDir::new("djqasm-staging")?;
        let generator = DeutschJozsa::new(TemplateConfig::default().with_staging_root(root.path()));

        let err = generator.generate_program_with(&FailingLoader, "11").unwrap_err();
        assert!(matches!(err, DjError::Load(QasmError::Simulation { .. })), "{}", err);
        assert_eq!(err.to_string(), "Simulation Process Error: rejected");
        assert_eq!(fs::read_dir(root.path())?.count(), 0);

        generator.generate_program("11")?;
        assert_eq!(fs::read_dir(root.path())?.count(), 0);
        Ok(())
    }

    #[test]
    fn test_quiet_and_confirmation_lines() -> Result<(), Box<dyn Error>> {
        let dir = TempDir::new("djqasm-emit")?;
        let generator = DeutschJozsa::default();

        let mut quiet = Vec::new();
        generator.save_to_qasm_to("101", true, Some(dir.path()), &mut quiet)?;
        generator.generate_oracle_to("101", true, Some(dir.path()), &mut quiet)?;
        assert!(quiet.is_empty());

        let mut loud = Vec::new();
        let written = generator.save_to_qasm_to("101", false, Some(dir.path()), &mut loud)?;
        assert_eq!(
            String::from_utf8(loud)?,
            format!("Subroutine 'deutsch_jozsa' has been added to {}\n", written.display())
        );

        let mut loud = Vec::new();
        let written = generator.generate_oracle_to("101", false, Some(dir.path()), &mut loud)?;
        assert_eq!(written, dir.path().join("oracle.qasm"));
        assert_eq!(
            String::from_utf8(loud)?,
            format!("Oracle 'oracle' has been added to {}\n", written.display())
        );
        Ok(())
    }

    #[test]
    fn test_invalid_bitstring_touches_nothing() -> Result<(), Box<dyn Error>> {
        let dir = TempDir::new("djqasm-emit")?;
        let mut out = Vec::new();
        let err = DeutschJozsa::default()
            .save_to_qasm_to("12", false, Some(dir.path()), &mut out)
            .unwrap_err();
        assert!(matches!(err, DjError::InvalidBitstring { .. }));
        assert!(out.is_empty());
        assert_eq!(fs::read_dir(dir.path())?.count(), 0);
        Ok(())
    }
}
