/// Smart Bookmarks - private per-user bookmark manager
/// Built with Rust + WASM + Yew on top of Supabase

mod bookmark;
mod config;
mod controller;
mod error;
mod normalize;
mod queries;
mod realtime;
mod session;
mod state;
mod subscription;
mod supabase;
pub mod ui;

#[cfg(test)]
mod testing;

use std::rc::Rc;

use wasm_bindgen::prelude::*;

pub use crate::config::AppConfig;
use crate::error::ConfigError;

// Set up panic hook for better error messages in the browser console
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::new(log::Level::Trace));
    log::set_max_level(log::LevelFilter::Info);
}

// Exposed so the page can validate input the same way the form does
#[wasm_bindgen]
pub fn normalize_url(raw: &str) -> Result<String, JsValue> {
    normalize::normalize_url(raw).map_err(|e| JsValue::from_str(e.code()))
}

/// Mount the app into the document body.
///
/// `config` is a plain object: `{ supabaseUrl, supabaseAnonKey, oauthProvider?, redirectTo?, logLevel? }`.
#[wasm_bindgen]
pub fn start_app(config: JsValue) -> Result<(), JsValue> {
    let config = serde_wasm_bindgen::from_value::<AppConfig>(config)
        .map_err(|e| ConfigError::Malformed(e.to_string()))
        .and_then(AppConfig::validate)
        .map_err(|e| {
            log::error!("{}", e);
            JsValue::from_str(&e.to_string())
        })?;

    log::set_max_level(config.log_filter());
    log::info!("Starting Smart Bookmarks against {}", config.supabase_url);

    yew::Renderer::<ui::app::App>::with_props(ui::app::AppProps {
        config: Rc::new(config),
    })
    .render();
    Ok(())
}
