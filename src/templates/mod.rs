// src/templates/mod.rs

//! Bundled OpenQASM templates and the placeholder substitution applied to them.
//!
//! The templates are compiled into the crate. A resource directory can be
//! configured to read them from disk instead. A template is copied to its
//! destination first and then rewritten in place, so the destination always
//! ends up as a complete, substituted program.

use std::borrow::Cow;
use std::env;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempdir::TempDir;
use tracing::{debug, trace};

use crate::core::{DjError, Replacements};

/// Overrides the directory the templates are read from.
pub const RESOURCE_DIR_ENV: &str = "DJQASM_RESOURCE_DIR";

/// Overrides where temporary staging directories are created.
pub const STAGING_DIR_ENV: &str = "DJQASM_STAGING_DIR";

const STAGING_PREFIX: &str = "djqasm";

/// The three bundled template files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKind {
    /// Full program: declares registers, calls the subroutine, measures.
    Program,
    /// The `deutsch_jozsa` subroutine definition.
    Subroutine,
    /// The standalone `oracle` subroutine.
    Oracle,
}

impl TemplateKind {
    /// File name of the template inside the resource directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            TemplateKind::Program => "dj.qasm",
            TemplateKind::Subroutine => "dj_subroutine.qasm",
            TemplateKind::Oracle => "oracle.qasm",
        }
    }

    /// The template text compiled into the crate.
    pub fn bundled(&self) -> &'static str {
        match self {
            TemplateKind::Program => include_str!("../../qasm_resources/dj.qasm"),
            TemplateKind::Subroutine => include_str!("../../qasm_resources/dj_subroutine.qasm"),
            TemplateKind::Oracle => include_str!("../../qasm_resources/oracle.qasm"),
        }
    }
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// Where templates come from and where staging happens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateConfig {
    /// Directory holding `dj.qasm`, `dj_subroutine.qasm` and `oracle.qasm`.
    /// `None` uses the bundled copies.
    pub resource_dir: Option<PathBuf>,
    /// Parent directory for temporary staging. `None` uses the system default.
    pub staging_root: Option<PathBuf>,
}

impl TemplateConfig {
    /// The default configuration with `DJQASM_RESOURCE_DIR` and
    /// `DJQASM_STAGING_DIR` applied when they are set and non-empty.
    pub fn from_env() -> Self {
        Self {
            resource_dir: env_path(RESOURCE_DIR_ENV),
            staging_root: env_path(STAGING_DIR_ENV),
        }
    }

    pub fn with_resource_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.resource_dir = Some(dir.into());
        self
    }

    pub fn with_staging_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_root = Some(dir.into());
        self
    }

    /// Path a template is read from, or `None` when the bundled copy is used.
    pub fn template_path(&self, kind: TemplateKind) -> Option<PathBuf> {
        self.resource_dir.as_ref().map(|dir| dir.join(kind.file_name()))
    }

    /// The text of a template.
    ///
    /// # Errors
    /// `DjError::TemplateUnavailable` when a configured resource directory
    /// does not hold a readable copy.
    pub fn load_template(&self, kind: TemplateKind) -> Result<Cow<'static, str>, DjError> {
        match self.template_path(kind) {
            Some(path) => fs::read_to_string(&path)
                .map(Cow::Owned)
                .map_err(|source| DjError::TemplateUnavailable { path, source }),
            None => Ok(Cow::Borrowed(kind.bundled())),
        }
    }

    /// Creates a fresh staging directory. It is removed when the returned
    /// guard is dropped.
    pub fn create_staging_dir(&self) -> Result<TempDir, DjError> {
        let dir = match &self.staging_root {
            Some(root) => TempDir::new_in(root, STAGING_PREFIX),
            None => TempDir::new(STAGING_PREFIX),
        }
        .map_err(|source| DjError::Staging { source })?;
        debug!(path = %dir.path().display(), "created staging directory");
        Ok(dir)
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key).filter(|value| !value.is_empty()).map(PathBuf::from)
}

/// Replaces every occurrence of every key in `text`.
pub fn substitute(text: &str, replacements: &Replacements) -> String {
    replacements
        .iter()
        .fold(text.to_string(), |acc, (key, value)| acc.replace(*key, value))
}

/// Rewrites the file at `path` in place with `replacements` applied.
///
/// # Errors
/// `DjError::Destination` when the file cannot be read back or rewritten.
pub fn prep_qasm_file(path: &Path, replacements: &Replacements) -> Result<(), DjError> {
    let destination_error = |source: io::Error| DjError::Destination {
        path: path.to_path_buf(),
        source,
    };
    let text = fs::read_to_string(path).map_err(destination_error)?;
    fs::write(path, substitute(&text, replacements)).map_err(destination_error)?;
    trace!(path = %path.display(), "substituted placeholders");
    Ok(())
}

/// Copies a bundled template to `destination`, overwriting it, and
/// substitutes the placeholders.
///
/// # Errors
/// * `DjError::TemplateUnavailable` if the template cannot be read.
/// * `DjError::Destination` if the destination cannot be written.
pub fn copy_template(
    config: &TemplateConfig,
    kind: TemplateKind,
    destination: &Path,
    replacements: &Replacements,
) -> Result<(), DjError> {
    // Reading first tells a missing template apart from an unwritable destination.
    let template = config.load_template(kind)?;
    fs::write(destination, template.as_bytes()).map_err(|err| DjError::Destination {
        path: destination.to_path_buf(),
        source: err,
    })?;
    debug!(template = %kind, destination = %destination.display(), "copied template");
    prep_qasm_file(destination, replacements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{generate_replacements, Bitstring, SECRET_PLACEHOLDER, SIZE_PLACEHOLDER};
    use std::error::Error;

    fn replacements(bits: &str) -> Replacements {
        generate_replacements(&bits.parse::<Bitstring>().unwrap())
    }

    #[test]
    fn test_substitute_replaces_every_occurrence() {
        let text = format!(
            "qubit[{size}] q; // {size}\nint s = {secret};\nint t = {secret} + 1;",
            size = SIZE_PLACEHOLDER,
            secret = SECRET_PLACEHOLDER
        );
        let out = substitute(&text, &replacements("110"));
        assert_eq!(out, "qubit[3] q; // 3\nint s = 3;\nint t = 3 + 1;");
    }

    #[test]
    fn test_default_config_uses_bundled_templates() -> Result<(), DjError> {
        let config = TemplateConfig::default();
        for kind in [TemplateKind::Program, TemplateKind::Subroutine, TemplateKind::Oracle] {
            assert_eq!(config.template_path(kind), None);
            let text = config.load_template(kind)?;
            assert_eq!(text, kind.bundled());
            assert!(text.contains(SIZE_PLACEHOLDER), "{} lacks the size placeholder", kind);
        }
        Ok(())
    }

    #[test]
    fn test_resource_dir_overrides_bundled_copy() -> Result<(), Box<dyn Error>> {
        let dir = TempDir::new("djqasm-test")?;
        fs::write(dir.path().join("oracle.qasm"), "// custom {}\n".replace("{}", SIZE_PLACEHOLDER))?;
        let config = TemplateConfig::default().with_resource_dir(dir.path());
        assert_eq!(config.template_path(TemplateKind::Oracle), Some(dir.path().join("oracle.qasm")));

        let destination = dir.path().join("out.qasm");
        copy_template(&config, TemplateKind::Oracle, &destination, &replacements("101"))?;
        assert_eq!(fs::read_to_string(&destination)?, "// custom 3\n");
        Ok(())
    }

    #[test]
    fn test_copy_template_substitutes_destination() -> Result<(), Box<dyn Error>> {
        let dir = TempDir::new("djqasm-test")?;
        let destination = dir.path().join("oracle.qasm");
        fs::write(&destination, "stale contents")?;

        copy_template(&TemplateConfig::default(), TemplateKind::Oracle, &destination, &replacements("1011"))?;
        let text = fs::read_to_string(&destination)?;
        assert!(!text.contains(SIZE_PLACEHOLDER) && !text.contains(SECRET_PLACEHOLDER));
        assert!(text.contains("qubit[4] q"), "{}", text);
        assert!(text.contains("13"), "{}", text);
        assert!(!text.contains("stale"));
        Ok(())
    }

    #[test]
    fn test_missing_template_and_bad_destination() -> Result<(), Box<dyn Error>> {
        let dir = TempDir::new("djqasm-test")?;
        let empty = TemplateConfig::default().with_resource_dir(dir.path());
        let err = copy_template(&empty, TemplateKind::Program, &dir.path().join("out.qasm"), &replacements("1"))
            .unwrap_err();
        assert!(matches!(err, DjError::TemplateUnavailable { .. }), "{}", err);

        let unwritable = dir.path().join("no_such_dir").join("out.qasm");
        let err = copy_template(&TemplateConfig::default(), TemplateKind::Program, &unwritable, &replacements("1"))
            .unwrap_err();
        assert!(matches!(err, DjError::Destination { ref path, .. } if path == &unwritable), "{}", err);
        Ok(())
    }

    #[test]
    fn test_staging_dir_is_removed_on_drop() -> Result<(), Box<dyn Error>> {
        let root = TempDir::new("djqasm-test")?;
        let config = TemplateConfig::default().with_staging_root(root.path());
        let staged = config.create_staging_dir()?;
        let path = staged.path().to_path_buf();
        assert!(path.starts_with(root.path()) && path.is_dir());
        drop(staged);
        assert!(!path.exists());
        Ok(())
    }
}
