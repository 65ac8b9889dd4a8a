//! Energy price API
//!
//! Response types and endpoint layout of the price backend, the capability
//! the price card fetches through, and its reqwest implementation.

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::EnergyType;
use crate::error::CardResult;

/// Price card data source
#[async_trait(?Send)]
pub trait PriceApi {
    /// `GET {base}/api/energy/data/{type}?date={date}`
    async fn fetch_prices(&self, energy: EnergyType, date: &str) -> CardResult<PriceSeries>;

    /// `GET {base}/api/energy/summary/{date}`
    async fn fetch_summary(&self, date: &str) -> CardResult<DaySummary>;
}

/// Response body of the data endpoint
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PriceSeries {
    pub data: PriceData,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PriceData {
    #[serde(rename = "Prices", default)]
    pub prices: Vec<PriceReading>,
    #[serde(default)]
    pub average: f64,
}

/// One price point
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PriceReading {
    /// ISO-8601 timestamp as sent by the backend
    #[serde(rename = "readingDate")]
    pub reading_date: String,
    pub price: f64,
}

impl PriceReading {
    pub fn new(reading_date: impl Into<String>, price: f64) -> Self {
        Self {
            reading_date: reading_date.into(),
            price,
        }
    }
}

impl PriceSeries {
    pub fn new(prices: Vec<PriceReading>, average: f64) -> Self {
        Self {
            data: PriceData { prices, average },
        }
    }

    pub fn readings(&self) -> &[PriceReading] {
        &self.data.prices
    }

    pub fn average(&self) -> f64 {
        self.data.average
    }
}

/// Response body of the summary endpoint
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DaySummary {
    #[serde(default)]
    pub message: Option<String>,
}

/// URL of the price series for one energy type and date
pub fn prices_url(base: &str, energy: EnergyType, date: &str) -> String {
    format!(
        "{}/api/energy/data/{}?date={}",
        base.trim_end_matches('/'),
        energy.as_str(),
        urlencoding::encode(date)
    )
}

/// URL of the day summary
pub fn summary_url(base: &str, date: &str) -> String {
    format!(
        "{}/api/energy/summary/{}",
        base.trim_end_matches('/'),
        urlencoding::encode(date)
    )
}

#[cfg(feature = "native")]
pub use http::HttpPriceApi;

#[cfg(feature = "native")]
mod http {
    use super::*;
    #[cfg(feature = "native")]
    use crate::error::CardError;
    use reqwest::Client;
    use serde::de::DeserializeOwned;

    /// Price API over reqwest, one attempt per request
    pub struct HttpPriceApi {
        client: Client,
        base_url: String,
    }

    impl HttpPriceApi {
        pub fn new(base_url: impl Into<String>) -> CardResult<Self> {
            let client = Client::builder()
                .user_agent(concat!("energy-cards/", env!("CARGO_PKG_VERSION")))
                .build()
                .map_err(|e| CardError::Network(format!("Failed to create HTTP client: {}", e)))?;

            Ok(Self {
                client,
                base_url: base_url.into().trim_end_matches('/').to_string(),
            })
        }

        async fn get_json<T: DeserializeOwned>(&self, url: &str) -> CardResult<T> {
            tracing::debug!(url, "Fetching");

            let response = self.client.get(url).send().await?;
            if !response.status().is_success() {
                return Err(CardError::HttpStatus(response.status().as_u16()));
            }

            Ok(response.json().await?)
        }
    }

    #[async_trait(?Send)]
    impl PriceApi for HttpPriceApi {
        async fn fetch_prices(&self, energy: EnergyType, date: &str) -> CardResult<PriceSeries> {
            self.get_json(&prices_url(&self.base_url, energy, date))
                .await
        }

        async fn fetch_summary(&self, date: &str) -> CardResult<DaySummary> {
            self.get_json(&summary_url(&self.base_url, date)).await
        }
    }
}
