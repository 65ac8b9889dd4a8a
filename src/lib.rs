//! # Energy Cards
//!
//! Dashboard cards for energy prices and usage, written against injected
//! capabilities so they run the same in the browser and in tests.
//!
//! ## Cards
//!
//! - [`sensor_panel`]: reads power, gas and available-dates sensors from the
//!   host and renders a date selector with a data summary
//! - [`price_card`]: fetches a day of prices from the energy API and charts
//!   them, colored by sign and magnitude
//!
//! ## Capabilities
//!
//! - [`host::Host`]: state snapshot and service calls of the dashboard
//! - [`price_card::PriceApi`]: the energy price backend
//! - [`price_card::ChartLibrary`]: whatever draws the chart
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use energy_cards::host::MemoryHost;
//! use energy_cards::sensor_panel::SensorPanel;
//! use std::rc::Rc;
//!
//! let host = Rc::new(MemoryHost::new());
//! host.set_state("sensor.dates", r#"{"common":["2024-01-01"]}"#);
//!
//! let panel = SensorPanel::new(host);
//! panel.set_config(&serde_json::json!({
//!     "power_entity": "sensor.power",
//!     "gas_entity": "sensor.gas",
//!     "dates_entity": "sensor.dates",
//! }))?;
//!
//! println!("{}", panel.update()?.to_html());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod host;
pub mod price_card;
pub mod registry;
pub mod sensor_panel;

pub use config::{
    generate_default_config, ConfigError, EnergyType, LoggingConfig, PreviewConfig,
    PriceCardConfig, SensorPanelConfig,
};
pub use diagnostics::{Diagnostic, DiagnosticSource, Diagnostics};
pub use error::{CardError, CardResult};
pub use host::{Host, HostError, HostResult, MemoryHost, ServiceCall, StateRecord};
pub use price_card::{ChartLibrary, ChartSpec, PriceApi, PriceCard, RefreshOutcome};
pub use registry::{CardDescriptor, CardRegistry, PRICE_CARD, SENSOR_PANEL};
pub use sensor_panel::{PanelView, SensorPanel};

#[cfg(feature = "native")]
pub use host::HomeAssistantClient;
#[cfg(feature = "native")]
pub use price_card::api::HttpPriceApi;
