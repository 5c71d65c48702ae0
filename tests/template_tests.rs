// tests/template_tests.rs

use std::error::Error;
use std::fs;
use std::path::Path;

use djqasm::core::{SECRET_PLACEHOLDER, SIZE_PLACEHOLDER};
use djqasm::templates::{prep_qasm_file, substitute, TemplateConfig, TemplateKind};
use djqasm::{
    generate_oracle, generate_replacements, save_to_qasm, Bitstring, DeutschJozsa, DjError, ModuleLoader, QasmLoader,
};
use tempdir::TempDir;

// Helper asserting a written file is fully substituted
fn check_substituted(path: &Path) -> Result<String, Box<dyn Error>> {
    let text = fs::read_to_string(path)?;
    assert!(!text.contains(SIZE_PLACEHOLDER), "size placeholder left in {}", path.display());
    assert!(!text.contains(SECRET_PLACEHOLDER), "secret placeholder left in {}", path.display());
    Ok(text)
}

#[test]
fn test_save_to_qasm_writes_subroutine_as_dj_qasm() -> Result<(), Box<dyn Error>> {
    let dir = TempDir::new("djqasm-save")?;
    let written = save_to_qasm("1101", true, Some(dir.path()))?;
    assert_eq!(written, dir.path().join("dj.qasm"));

    let text = check_substituted(&written)?;
    assert!(text.contains("def deutsch_jozsa(qubit[4] q, qubit ancilla)"), "{}", text);
    // "1101" reversed is "1011", which is 11.
    assert!(text.contains("((11 >> i) & 1)"), "{}", text);
    assert!(text.contains("[0:4 - 1]"), "{}", text);
    Ok(())
}

#[test]
fn test_generate_oracle_writes_oracle_qasm() -> Result<(), Box<dyn Error>> {
    let dir = TempDir::new("djqasm-oracle")?;
    let written = generate_oracle(vec![0u8, 0, 1], true, Some(dir.path()))?;
    assert_eq!(written, dir.path().join("oracle.qasm"));

    let text = check_substituted(&written)?;
    assert!(text.contains("def oracle(qubit[3] q, qubit ancilla)"), "{}", text);
    assert!(text.contains("((4 >> i) & 1)"), "{}", text);
    Ok(())
}

#[test]
fn test_emitted_files_are_loadable() -> Result<(), Box<dyn Error>> {
    let dir = TempDir::new("djqasm-emit")?;
    let generator = DeutschJozsa::default();
    generator.save_to_qasm("011", true, Some(dir.path()))?;
    generator.generate_oracle("011", true, Some(dir.path()))?;

    let main = dir.path().join("main.qasm");
    fs::write(
        &main,
        "OPENQASM 3.0;\ninclude \"stdgates.inc\";\ninclude \"dj.qasm\";\ninclude \"oracle.qasm\";\n\
         qubit[3] q;\nqubit a;\nbit[3] c;\n\
         deutsch_jozsa(q, a);\nc = measure q;\n\
         oracle(q, a);\n",
    )?;
    let module = QasmLoader::new().load(&main)?;
    assert_eq!(module.includes().len(), 2);
    assert_eq!(module.num_qubits(), 4);
    Ok(())
}

#[test]
fn test_overwrites_existing_destination() -> Result<(), Box<dyn Error>> {
    let dir = TempDir::new("djqasm-overwrite")?;
    let generator = DeutschJozsa::default();
    generator.generate_oracle("1", true, Some(dir.path()))?;
    let written = generator.generate_oracle("01", true, Some(dir.path()))?;
    let text = check_substituted(&written)?;
    assert!(text.contains("qubit[2] q"), "{}", text);
    assert!(!text.contains("qubit[1] q"), "{}", text);
    Ok(())
}

#[test]
fn test_default_output_comes_from_compiled_templates() -> Result<(), Box<dyn Error>> {
    let config = TemplateConfig::default();
    assert_eq!(config.resource_dir, None);

    let dir = TempDir::new("djqasm-bundled")?;
    let bits: Bitstring = "011".parse()?;
    let written = DeutschJozsa::new(config).save_to_qasm(&bits, true, Some(dir.path()))?;
    let expected = substitute(TemplateKind::Subroutine.bundled(), &generate_replacements(&bits));
    assert_eq!(fs::read_to_string(&written)?, expected);
    Ok(())
}

#[test]
fn test_missing_template_is_fatal() -> Result<(), Box<dyn Error>> {
    let empty = TempDir::new("djqasm-resources")?;
    let out = TempDir::new("djqasm-out")?;
    let generator = DeutschJozsa::new(TemplateConfig::default().with_resource_dir(empty.path()));

    let mut console = Vec::new();
    let err = generator
        .generate_oracle_to("10", false, Some(out.path()), &mut console)
        .unwrap_err();
    match &err {
        DjError::TemplateUnavailable { path, .. } => assert_eq!(path, &empty.path().join("oracle.qasm")),
        other => panic!("expected TemplateUnavailable, got {}", other),
    }
    assert!(console.is_empty(), "no confirmation after a failure");
    assert!(matches!(generator.generate_program("10"), Err(DjError::TemplateUnavailable { .. })));
    Ok(())
}

#[test]
fn test_unwritable_destination_is_fatal() -> Result<(), Box<dyn Error>> {
    let dir = TempDir::new("djqasm-dest")?;
    let missing = dir.path().join("does").join("not").join("exist");
    let err = save_to_qasm("1", true, Some(missing.as_path())).unwrap_err();
    assert!(matches!(err, DjError::Destination { .. }), "{}", err);
    assert!(err.to_string().starts_with("Destination Not Writable"), "{}", err);
    Ok(())
}

#[test]
fn test_prep_qasm_file_rewrites_in_place() -> Result<(), Box<dyn Error>> {
    let dir = TempDir::new("djqasm-prep")?;
    let path = dir.path().join("custom.qasm");
    fs::write(&path, format!("qubit[{0}] r;\nconst int s = {1};\n", SIZE_PLACEHOLDER, SECRET_PLACEHOLDER))?;

    let bits: djqasm::Bitstring = "0101".parse()?;
    prep_qasm_file(&path, &djqasm::generate_replacements(&bits))?;
    assert_eq!(fs::read_to_string(&path)?, "qubit[4] r;\nconst int s = 10;\n");

    let err = prep_qasm_file(&dir.path().join("absent.qasm"), &djqasm::generate_replacements(&bits)).unwrap_err();
    assert!(matches!(err, DjError::Destination { .. }));
    Ok(())
}
