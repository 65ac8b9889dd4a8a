//! Energy Cards for the browser
//!
//! Registers the energy cards as custom elements a Home Assistant dashboard
//! can use, and publishes their descriptors on `window.customCards`.
//!
//! # Architecture
//!
//! Card behavior lives in the `energy-cards` crate. This crate only supplies
//! the browser side of each capability:
//!
//! - [`host::HassHost`]: the Lovelace `hass` object
//! - [`api::FetchPriceApi`]: the energy price API over `fetch`
//! - [`components::CanvasChart`]: bar charts on an HTML5 canvas

use wasm_bindgen::prelude::*;

pub mod api;
pub mod components;
mod element;
pub mod host;

#[wasm_bindgen(start)]
pub fn start() {
    // Set up panic hook for better error messages in WASM
    console_error_panic_hook::set_once();
    tracing_wasm::set_as_global_default();

    element::define_cards();
}
