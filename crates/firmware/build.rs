use std::env;
use std::fs;
use std::path::PathBuf;

fn main() -> std::io::Result<()> {
    println!("cargo:rerun-if-changed=build.rs");

    // Host builds link no linker script.
    if env::var_os("CARGO_FEATURE_HARDWARE").is_none() {
        return Ok(());
    }

    // Put `memory.x` in OUT_DIR and put OUT_DIR on the linker search path.
    let Some(out_dir) = env::var_os("OUT_DIR") else {
        return Err(std::io::Error::other("OUT_DIR not set"));
    };
    let out = PathBuf::from(out_dir);
    fs::write(out.join("memory.x"), include_bytes!("../../memory.x"))?;

    println!("cargo:rustc-link-search={}", out.display());
    println!("cargo:rerun-if-changed=../../memory.x");
    Ok(())
}
