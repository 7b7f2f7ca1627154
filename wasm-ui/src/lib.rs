//! Web UI for portfolio-rs
//!
//! A Yew front end that shows the intro loader until the shell gate opens,
//! then mounts the portfolio content.

mod app;
mod components;
mod loader;

use wasm_bindgen::prelude::*;

/// Browser entry point: install the panic hook and mount the shell.
#[wasm_bindgen(start)]
pub fn run_app() {
    console_error_panic_hook::set_once();
    yew::Renderer::<app::App>::new().render();
}
