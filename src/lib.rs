//! Right-hand, scroll-synchronized table of contents for documentation pages.
//!
//! The crate builds to WebAssembly. The host page calls `initialize()` once the
//! document is ready and `onContentChanged()` after every in-app navigation.
//! Everything below [`toc_core`] is plain Rust and testable without a browser;
//! the `app` and `dom` modules bind it to the live page.

pub mod anchor;
pub mod config;
pub mod error;
pub mod host;
pub mod outline;
pub mod scroll;
pub mod toc_core;
pub mod visibility;

mod app;
mod dom;
mod logging;

#[cfg(test)]
mod test_support;

use wasm_bindgen::prelude::*;

pub use config::TocConfig;
pub use error::TocError;
pub use toc_core::{TocController, TocView};

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    logging::init(TocConfig::default().log_level_filter());
}

/// Binds the page-wide listeners and builds the panel. `options` may be
/// omitted, a settings object or a JSON string. Safe to call more than once.
#[wasm_bindgen]
pub fn initialize(options: JsValue) {
    app::initialize(options);
}

/// Rebuilds the panel for the page content currently in the document.
#[wasm_bindgen(js_name = onContentChanged)]
pub fn on_content_changed() {
    app::on_content_changed();
}
