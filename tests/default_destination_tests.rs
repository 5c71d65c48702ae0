// tests/default_destination_tests.rs
//
// Kept in its own test binary: it changes the process working directory.

use std::env;
use std::error::Error;
use std::fs;

use djqasm::{generate_oracle, save_to_qasm};
use tempdir::TempDir;

#[test]
fn test_default_destination_is_current_directory() -> Result<(), Box<dyn Error>> {
    let dir = TempDir::new("djqasm-cwd")?;
    let previous = env::current_dir()?;
    env::set_current_dir(dir.path())?;

    let saved = save_to_qasm("10", true, None);
    let oracle = generate_oracle("10", true, None);
    env::set_current_dir(previous)?;

    let cwd = fs::canonicalize(dir.path())?;
    assert_eq!(fs::canonicalize(saved?)?, cwd.join("dj.qasm"));
    assert_eq!(fs::canonicalize(oracle?)?, cwd.join("oracle.qasm"));
    Ok(())
}
