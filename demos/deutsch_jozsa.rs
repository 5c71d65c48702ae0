//! Example: Deutsch-Jozsa over OpenQASM 3 templates.
//! Decides whether f(x) = s.x (mod 2) is constant or balanced with a single
//! oracle query, then writes the subroutine and oracle out for reuse.
//!
//! Run with `RUST_LOG=djqasm=debug` to see staging and loading.

use djqasm::{classify, DeutschJozsa, Simulator, TemplateConfig};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("--- djqasm Example: Deutsch-Jozsa ---");
    let generator = DeutschJozsa::new(TemplateConfig::from_env());
    let simulator = Simulator::with_seed(2025);

    for secret in ["0000", "1011"] {
        // --- Generate and load the program ---
        let module = generator.generate_program(secret)?;
        println!("\nHidden bitstring s = {}", secret);
        println!("{}", module);
        println!("Unrolled program:\n{}", module.unrolled_qasm());

        // --- Sample the input register ---
        let result = module.simulate_with(&simulator, 256)?;
        println!("{}", result);

        let measured = result.most_frequent().map(|(key, _)| key).unwrap_or_default();
        println!("- Measured string = {}", measured);
        println!("- f is {}", classify(result.counts()));
        assert_eq!(measured, secret, "Measured string should match the secret string!");
    }

    // --- Emit reusable files ---
    let out_dir = std::env::temp_dir().join("djqasm-demo");
    std::fs::create_dir_all(&out_dir)?;
    generator.save_to_qasm("1011", false, Some(out_dir.as_path()))?;
    generator.generate_oracle("1011", false, Some(out_dir.as_path()))?;

    Ok(())
}
