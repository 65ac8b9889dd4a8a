//! HTTP clients used from the browser

mod client;

pub use client::FetchPriceApi;
