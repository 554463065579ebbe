use std::env;
use std::fs;
use std::path::Path;

/// Copies the workspace config.toml next to the built binary
fn main() {
    println!("cargo:rerun-if-changed=../../config.toml");

    let (Ok(out_dir), Ok(profile)) = (env::var("OUT_DIR"), env::var("PROFILE")) else {
        println!("cargo:warning=OUT_DIR/PROFILE not set, config.toml not copied");
        return;
    };

    // OUT_DIR is typically: target/debug/build/backend-xxx/out
    let Some(target_dir) = Path::new(&out_dir).ancestors().find(|p| p.ends_with(&profile)) else {
        println!("cargo:warning=target/{} not found, config.toml not copied", profile);
        return;
    };

    let workspace_root = Path::new(env!("CARGO_MANIFEST_DIR")).join("../..");
    let source_config = workspace_root.join("config.toml");
    let dest_config = target_dir.join("config.toml");

    if !source_config.exists() {
        println!(
            "cargo:warning=config.toml not found at {:?}, using default config",
            source_config
        );
        return;
    }

    if let Err(e) = fs::copy(&source_config, &dest_config) {
        println!("cargo:warning=Failed to copy config.toml: {}", e);
    }
}
