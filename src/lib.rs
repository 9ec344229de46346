#![cfg_attr(target_arch = "wasm32", allow(dead_code))]

//! Decorative WebGL layers for the landing page: the hero particle
//! background, the custom cursor trail and the countdown intro.
//!
//! Everything that decides *what* happens (lifecycle, smoothing, buffers,
//! fallback) is plain Rust and runs in host tests. The browser plumbing is
//! confined to the wasm-only module below.

pub mod backend;
pub mod camera;
pub mod config;
pub mod context;
pub mod cursor;
pub mod error;
pub mod host;
pub mod intro;
pub mod particles;
pub mod pointer;
pub mod prefs;
pub mod scene;
pub mod schedule;
pub mod shaders;
pub mod signal;

#[cfg(test)]
mod testing;

pub use config::{Quality, SceneOptions, Viewport};
pub use error::{FxError, FxResult};
pub use host::{BackgroundHost, HostPhase};
pub use scene::SceneController;

// Only compile wasm-specific code when targeting wasm32.

#[cfg(target_arch = "wasm32")]
mod wasm {
    use std::sync::OnceLock;

    use wasm_bindgen::prelude::*;

    mod dom;
    mod exports;
    mod render;

    pub use exports::{grant_chat_consent, has_chat_consent, BackgroundFx, CursorFx, IntroFx, Preferences};

    fn init_logging_once() {
        static INIT: OnceLock<()> = OnceLock::new();
        INIT.get_or_init(|| {
            console_error_panic_hook::set_once();
            let _ = wasm_logger::init(wasm_logger::Config::default());
        });
    }

    #[wasm_bindgen(start)]
    pub fn main() {
        init_logging_once();
        log::debug!("backdrop_fx loaded");
    }
}

#[cfg(target_arch = "wasm32")]
pub use wasm::{grant_chat_consent, has_chat_consent, BackgroundFx, CursorFx, IntroFx, Preferences};

// When compiling for non-wasm targets (e.g., `cargo test` on host),
// provide an empty stub so the crate still builds.
#[cfg(not(target_arch = "wasm32"))]
pub fn main() {}
