//! Sensor-Bound Energy Panel
//!
//! Reads power, gas and available-dates sensors from the host and renders a
//! date selector with a data-availability summary. Data itself is refreshed
//! by the host's sensor polling; the panel only asks for it.

mod payload;
mod view;

pub use payload::{AvailableDates, PanelData, SensorData};
pub use view::{escape_html, PanelView, NO_DATES_MESSAGE};

use serde_json::Value;
use std::cell::RefCell;
use std::rc::Rc;

use crate::config::{ConfigError, SensorPanelConfig};
use crate::diagnostics::Diagnostics;
use crate::error::{CardError, CardResult};
use crate::host::{Host, ServiceCall};

/// Layout hint reported to the dashboard
pub const PANEL_CARD_SIZE: u32 = 5;

pub struct SensorPanel {
    host: Rc<dyn Host>,
    config: RefCell<Option<SensorPanelConfig>>,
    selected_date: RefCell<Option<String>>,
    diagnostics: Diagnostics,
}

impl SensorPanel {
    pub fn new(host: Rc<dyn Host>) -> Self {
        Self {
            host,
            config: RefCell::new(None),
            selected_date: RefCell::new(None),
            diagnostics: Diagnostics::new(),
        }
    }

    /// Validate and store the card configuration
    ///
    /// A rejected configuration leaves the previous one in place.
    pub fn set_config(&self, raw: &Value) -> Result<(), ConfigError> {
        let config = SensorPanelConfig::from_value(raw)?;
        tracing::info!(
            power = %config.power_entity,
            gas = %config.gas_entity,
            dates = %config.dates_entity,
            "Energy panel configured"
        );
        *self.config.borrow_mut() = Some(config);
        Ok(())
    }

    pub fn config(&self) -> Option<SensorPanelConfig> {
        self.config.borrow().clone()
    }

    pub fn card_size(&self) -> u32 {
        PANEL_CARD_SIZE
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Re-read the sensors and build a fresh view
    pub fn update(&self) -> CardResult<PanelView> {
        let config = self.current_config()?;
        let data = PanelData::read(self.host.as_ref(), &config, &self.diagnostics);
        let selected = self.selected_date.borrow().clone();

        Ok(PanelView::new(&config.title, &data, selected))
    }

    /// Handle a date picked in the selector
    ///
    /// Writes the date input first (when configured) so the refreshed
    /// sensors read the new date.
    pub async fn select_date(&self, date: &str) -> CardResult<()> {
        let config = self.current_config()?;
        *self.selected_date.borrow_mut() = Some(date.to_string());

        match config.date_input.as_deref() {
            Some(input) => {
                tracing::info!(date, input, "Setting energy panel date");
                self.host
                    .call_service(ServiceCall::set_date(input, date))
                    .await?;
            }
            None => {
                tracing::warn!(
                    date,
                    "No date_input configured, sensors will refresh for their own date"
                );
            }
        }

        for entity_id in config.data_entities() {
            self.host
                .call_service(ServiceCall::update_entity(entity_id))
                .await?;
        }

        Ok(())
    }

    fn current_config(&self) -> CardResult<SensorPanelConfig> {
        self.config.borrow().clone().ok_or(CardError::NotConfigured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticSource;
    use crate::host::MemoryHost;
    use serde_json::json;

    fn panel_config(date_input: Option<&str>) -> Value {
        let mut config = json!({
            "power_entity": "sensor.power",
            "gas_entity": "sensor.gas",
            "dates_entity": "sensor.dates"
        });
        if let Some(input) = date_input {
            config["date_input"] = json!(input);
        }
        config
    }

    fn panel(host: &Rc<MemoryHost>) -> SensorPanel {
        let host: Rc<dyn Host> = host.clone();
        SensorPanel::new(host)
    }

    #[test]
    fn test_missing_entity_rejected_before_render() {
        let host = Rc::new(MemoryHost::new());
        let panel = panel(&host);

        for key in ["power_entity", "gas_entity", "dates_entity"] {
            let mut config = panel_config(None);
            config.as_object_mut().unwrap().remove(key);
            assert!(panel.set_config(&config).is_err(), "{key} should be required");
        }

        assert!(panel.config().is_none());
        assert!(matches!(panel.update(), Err(CardError::NotConfigured)));
    }

    #[test]
    fn test_card_size() {
        let host = Rc::new(MemoryHost::new());
        assert_eq!(panel(&host).card_size(), 5);
    }

    #[test]
    fn test_update_renders_dates_and_availability() {
        let host = Rc::new(MemoryHost::new());
        host.set_state("sensor.power", r#"{"Prices":[{"price":0.2}]}"#);
        host.set_state("sensor.gas", "unavailable");
        host.set_state(
            "sensor.dates",
            r#"{"power":[],"gas":[],"common":["2024-01-01","2024-01-02"]}"#,
        );

        let panel = panel(&host);
        panel.set_config(&panel_config(None)).unwrap();

        let view = panel.update().unwrap();
        assert_eq!(view.title, "Energy Panel");
        assert_eq!(view.dates, vec!["2024-01-01", "2024-01-02"]);
        assert!(view.power_available);
        assert!(!view.gas_available);

        // Idempotent
        assert_eq!(panel.update().unwrap(), view);
    }

    #[test]
    fn test_bad_sensor_json_is_observable() {
        let host = Rc::new(MemoryHost::new());
        host.set_state("sensor.dates", "[1, 2");

        let panel = panel(&host);
        panel.set_config(&panel_config(None)).unwrap();

        let view = panel.update().unwrap();
        assert!(view.dates.is_empty());
        assert!(view.to_html().contains(NO_DATES_MESSAGE));
        assert_eq!(panel.diagnostics().count(DiagnosticSource::DatesSensor), 1);
    }

    #[test]
    fn test_bad_sensor_json_recorded_once_across_updates() {
        let host = Rc::new(MemoryHost::new());
        host.set_state("sensor.dates", "[1, 2");

        let panel = panel(&host);
        panel.set_config(&panel_config(None)).unwrap();

        for _ in 0..1000 {
            panel.update().unwrap();
        }
        assert_eq!(panel.diagnostics().len(), 1);

        host.set_state("sensor.dates", "{broken");
        panel.update().unwrap();
        assert_eq!(panel.diagnostics().count(DiagnosticSource::DatesSensor), 2);
    }

    #[tokio::test]
    async fn test_select_date_sets_input_before_refresh() {
        let host = Rc::new(MemoryHost::new());
        host.set_state("sensor.dates", r#"{"common":["2024-01-01","2024-01-02"]}"#);

        let panel = panel(&host);
        panel
            .set_config(&panel_config(Some("input_datetime.energy_date")))
            .unwrap();

        panel.select_date("2024-01-02").await.unwrap();

        let calls = host.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0], ServiceCall::set_date("input_datetime.energy_date", "2024-01-02"));
        assert_eq!(calls[1], ServiceCall::update_entity("sensor.power"));
        assert_eq!(calls[2], ServiceCall::update_entity("sensor.gas"));

        let view = panel.update().unwrap();
        assert_eq!(view.selected_date.as_deref(), Some("2024-01-02"));
    }

    #[tokio::test]
    async fn test_select_date_without_input_refreshes_sensors() {
        let host = Rc::new(MemoryHost::new());
        let panel = panel(&host);
        panel.set_config(&panel_config(None)).unwrap();

        panel.select_date("2024-01-01").await.unwrap();

        let names: Vec<String> = host.calls().iter().map(|c| c.name()).collect();
        assert_eq!(
            names,
            vec!["homeassistant.update_entity", "homeassistant.update_entity"]
        );
    }

    #[tokio::test]
    async fn test_service_failure_returned() {
        let host = Rc::new(MemoryHost::new());
        host.fail_service("input_datetime.set_datetime");

        let panel = panel(&host);
        panel
            .set_config(&panel_config(Some("input_datetime.energy_date")))
            .unwrap();

        let result = panel.select_date("2024-01-01").await;
        assert!(matches!(result, Err(CardError::Host(_))));
        // Sensors are not refreshed for a date that never reached them
        assert_eq!(host.calls().len(), 1);
    }
}
