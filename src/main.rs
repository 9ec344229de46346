//! Host-side helper: `cargo run` builds the wasm bundle into `static/pkg`
//! and serves `static/` locally so the effects can be checked in a browser.

use std::process::{Command, ExitCode, Stdio};
use std::env;

const DEFAULT_PORT: u16 = 8000;

fn port() -> u16 {
    match env::var("BACKDROP_PORT") {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            eprintln!("BACKDROP_PORT={raw} is not a port, using {DEFAULT_PORT}");
            DEFAULT_PORT
        }),
        Err(_) => DEFAULT_PORT,
    }
}

fn main() -> ExitCode {
    // Only meaningful on non-wasm targets.
    if env::var("TARGET").unwrap_or_default() == "wasm32-unknown-unknown" {
        return ExitCode::SUCCESS;
    }

    println!("Building WASM pkg …");
    match Command::new("wasm-pack")
        .args(["build", "--release", "--target", "web", "--out-dir", "static/pkg"])
        .env("BACKDROP_FX_NESTED_BUILD", "1")
        .status()
    {
        Ok(st) if st.success() => {}
        Ok(_) => {
            eprintln!("wasm-pack finished with errors. Ensure wasm-pack is installed (https://rustwasm.github.io/wasm-pack/).");
            return ExitCode::FAILURE;
        }
        Err(_) => {
            eprintln!("wasm-pack not found in PATH. Serving whatever is already in static/pkg.");
        }
    }

    let port = port().to_string();
    println!("Serving static/ at http://127.0.0.1:{port} …");
    let server = Command::new("python3")
        .args(["-m", "http.server", &port, "--directory", "static"])
        .stdout(Stdio::null())
        .stderr(Stdio::inherit())
        .status();

    match server {
        Ok(st) if st.success() => ExitCode::SUCCESS,
        Ok(st) => {
            eprintln!("http server exited with {st}");
            ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!("failed to start http server: {err}");
            ExitCode::FAILURE
        }
    }
}
