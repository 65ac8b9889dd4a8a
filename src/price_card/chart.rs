//! Price chart model
//!
//! Turns a price series into bars (label, value, color, tooltip) and defines
//! the chart capability that draws them.

use async_trait::async_trait;
use std::fmt;

use super::api::PriceSeries;
use crate::config::EnergyType;
use crate::error::CardResult;

/// An sRGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub fn css(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({}, {}, {})", self.0, self.1, self.2)
    }
}

/// Bars with a negative price (rebate)
pub const NEGATIVE_PRICE_COLOR: Rgb = Rgb(0, 0, 255);
/// Cheapest non-negative end of the scale
pub const LOW_PRICE_COLOR: Rgb = Rgb(0, 255, 0);
/// Series maximum
pub const HIGH_PRICE_COLOR: Rgb = Rgb(255, 0, 0);

/// Color of one bar given the series maximum
pub fn bar_color(price: f64, max: f64) -> Rgb {
    if price < 0.0 {
        return NEGATIVE_PRICE_COLOR;
    }

    let fraction = if max > 0.0 {
        (price / max).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let mix = |low: u8, high: u8| -> u8 {
        (low as f64 + (high as f64 - low as f64) * fraction).round() as u8
    };

    Rgb(
        mix(LOW_PRICE_COLOR.0, HIGH_PRICE_COLOR.0),
        mix(LOW_PRICE_COLOR.1, HIGH_PRICE_COLOR.1),
        mix(LOW_PRICE_COLOR.2, HIGH_PRICE_COLOR.2),
    )
}

/// `HH:MM` part of an ISO-8601 timestamp
pub fn reading_label(reading_date: &str) -> String {
    reading_date
        .get(11..16)
        .unwrap_or(reading_date)
        .to_string()
}

/// Symbol-prefixed amount with two decimals, sign first
pub fn format_currency(symbol: &str, amount: f64) -> String {
    if amount < 0.0 {
        format!("-{}{:.2}", symbol, amount.abs())
    } else {
        format!("{}{:.2}", symbol, amount)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub label: String,
    pub value: f64,
    pub color: Rgb,
    pub tooltip: String,
}

/// Everything a chart library needs to draw the price chart
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub title: String,
    pub subtitle: String,
    pub bars: Vec<Bar>,
}

impl ChartSpec {
    pub fn from_series(series: &PriceSeries, energy: EnergyType, date: &str, currency: &str) -> Self {
        let max = series
            .readings()
            .iter()
            .map(|r| r.price)
            .fold(f64::NEG_INFINITY, f64::max);

        let bars = series
            .readings()
            .iter()
            .map(|reading| {
                let label = reading_label(&reading.reading_date);
                Bar {
                    tooltip: format!("{}: {}", label, format_currency(currency, reading.price)),
                    label,
                    value: reading.price,
                    color: bar_color(reading.price, max),
                }
            })
            .collect();

        Self {
            title: format!("{} Prices - {}", energy.label(), date),
            subtitle: format!("Average: {}", format_currency(currency, series.average())),
            bars,
        }
    }

    pub fn labels(&self) -> Vec<&str> {
        self.bars.iter().map(|b| b.label.as_str()).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.value).collect()
    }
}

/// Charting capability injected into the price card
#[async_trait(?Send)]
pub trait ChartLibrary {
    /// Make the library ready; cheap when already loaded
    async fn ensure_loaded(&self) -> CardResult<()>;

    /// Draw a new chart instance
    fn render(&self, spec: &ChartSpec) -> CardResult<Box<dyn ChartHandle>>;
}

/// A live chart instance
pub trait ChartHandle {
    /// Tear the chart down, releasing its canvas and listeners
    fn destroy(&mut self);
}
