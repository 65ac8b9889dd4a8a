//! Price card view state
//!
//! The static layout (controls, summary, canvas, error area) and what each
//! region currently shows.

use chrono::{Duration, NaiveDate};

use super::chart::ChartSpec;
use crate::config::{EnergyType, PriceCardConfig};

/// Days offered in the date selector
pub const DATE_OPTIONS: usize = 7;

#[derive(Debug, Clone, PartialEq)]
pub struct CardView {
    pub title: String,
    pub energy_types: Vec<EnergyType>,
    pub selected_type: EnergyType,
    /// `YYYY-MM-DD`, most recent first
    pub dates: Vec<String>,
    pub selected_date: Option<String>,
    pub loading: bool,
    /// Error area text; hidden when `None`
    pub error: Option<String>,
    /// Summary area text; hidden when `None`
    pub summary: Option<String>,
    /// Chart currently drawn on the canvas
    pub chart: Option<ChartSpec>,
}

impl CardView {
    /// Layout built once on the first host update
    pub fn build(config: &PriceCardConfig, today: NaiveDate) -> Self {
        let dates = recent_dates(today, DATE_OPTIONS);
        let selected_date = dates.first().cloned();

        Self {
            title: config.title.clone(),
            energy_types: EnergyType::ALL.to_vec(),
            selected_type: config.default_type,
            dates,
            selected_date,
            loading: false,
            error: None,
            summary: None,
            chart: None,
        }
    }
}

/// The `count` calendar dates ending today, today first
pub fn recent_dates(today: NaiveDate, count: usize) -> Vec<String> {
    (0..count as i64)
        .map(|offset| (today - Duration::days(offset)).format("%Y-%m-%d").to_string())
        .collect()
}
