//! Price API client
//!
//! Fetches price series and day summaries with `gloo-net`.

use async_trait::async_trait;
use energy_cards::config::{EnergyType, DEFAULT_API_URL};
use energy_cards::error::{CardError, CardResult};
use energy_cards::price_card::api::{prices_url, summary_url};
use energy_cards::price_card::{DaySummary, PriceApi, PriceSeries};
use gloo_net::http::Request;
use serde::de::DeserializeOwned;
use std::cell::RefCell;

/// Price API over `fetch`; the base URL follows the card configuration
pub struct FetchPriceApi {
    base_url: RefCell<String>,
}

impl Default for FetchPriceApi {
    fn default() -> Self {
        Self {
            base_url: RefCell::new(DEFAULT_API_URL.to_string()),
        }
    }
}

impl FetchPriceApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_base_url(&self, url: &str) {
        *self.base_url.borrow_mut() = url.trim_end_matches('/').to_string();
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> CardResult<T> {
        let response = Request::get(url)
            .send()
            .await
            .map_err(|e| CardError::Network(e.to_string()))?;

        if !response.ok() {
            return Err(CardError::HttpStatus(response.status()));
        }

        response
            .json()
            .await
            .map_err(|e| CardError::Decode(e.to_string()))
    }
}

#[async_trait(?Send)]
impl PriceApi for FetchPriceApi {
    async fn fetch_prices(&self, energy: EnergyType, date: &str) -> CardResult<PriceSeries> {
        let url = prices_url(&self.base_url.borrow(), energy, date);
        self.get_json(&url).await
    }

    async fn fetch_summary(&self, date: &str) -> CardResult<DaySummary> {
        let url = summary_url(&self.base_url.borrow(), date);
        self.get_json(&url).await
    }
}
