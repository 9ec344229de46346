// Builds the wasm bundle for wasm targets and mirrors static/ into dist/.
use std::process::Command;
use std::{env, fs, path::Path};

use fs_extra::dir::{copy, CopyOptions};

// Set on the nested wasm-pack invocation so it does not recurse into itself.
const NESTED: &str = "BACKDROP_FX_NESTED_BUILD";

fn main() {
    println!("cargo:rerun-if-changed=static");
    println!("cargo:rerun-if-env-changed={NESTED}");

    let target = env::var("TARGET").unwrap_or_default();
    if target == "wasm32-unknown-unknown" && env::var_os(NESTED).is_none() {
        let status = Command::new("wasm-pack")
            .args(["build", "--release", "--target", "web", "--out-dir", "static/pkg"])
            .env(NESTED, "1")
            .status();

        match status {
            Ok(st) if st.success() => {}
            Ok(_) => println!("cargo:warning=wasm-pack build failed"),
            Err(_) => println!("cargo:warning=wasm-pack not installed, skipping bundle"),
        }
    }

    let out_dir = Path::new("dist");
    if out_dir.exists() {
        fs::remove_dir_all(out_dir).ok();
    }
    fs::create_dir_all(out_dir).ok();

    let static_dir = Path::new("static");
    if static_dir.exists() {
        let options = CopyOptions { overwrite: true, content_only: true, ..CopyOptions::new() };
        if let Err(err) = copy(static_dir, out_dir, &options) {
            println!("cargo:warning=copying static assets failed: {err}");
        }
    }
}
