//! Sensor payloads
//!
//! The panel's sensors carry JSON in their state string. Placeholder states
//! and unparseable payloads fall back to empty values; parse failures are
//! recorded in [`Diagnostics`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::config::SensorPanelConfig;
use crate::diagnostics::{DiagnosticSource, Diagnostics};
use crate::host::Host;

/// Power or gas payload; only its presence matters to the panel
pub type SensorData = Map<String, Value>;

/// Dates for which the sensors can serve data
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AvailableDates {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub power: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub gas: Vec<String>,
    /// Dates both sensors cover
    #[serde(default, deserialize_with = "null_as_empty")]
    pub common: Vec<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Everything the panel reads from the host on one update
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PanelData {
    pub power: SensorData,
    pub gas: SensorData,
    pub dates: AvailableDates,
}

impl PanelData {
    /// Read and parse the three configured sensors
    pub fn read(host: &dyn Host, config: &SensorPanelConfig, diagnostics: &Diagnostics) -> Self {
        Self {
            power: parse_sensor(
                host,
                &config.power_entity,
                DiagnosticSource::PowerSensor,
                diagnostics,
            ),
            gas: parse_sensor(
                host,
                &config.gas_entity,
                DiagnosticSource::GasSensor,
                diagnostics,
            ),
            dates: parse_sensor(
                host,
                &config.dates_entity,
                DiagnosticSource::DatesSensor,
                diagnostics,
            ),
        }
    }
}

fn parse_sensor<T>(
    host: &dyn Host,
    entity_id: &str,
    source: DiagnosticSource,
    diagnostics: &Diagnostics,
) -> T
where
    T: DeserializeOwned + Default,
{
    let record = match host.state(entity_id) {
        Some(record) if record.has_value() => record,
        Some(record) => {
            tracing::debug!(entity_id, state = %record.state, "Sensor has no value yet");
            return T::default();
        }
        None => {
            tracing::debug!(entity_id, "Sensor missing from host state");
            return T::default();
        }
    };

    match serde_json::from_str(&record.state) {
        Ok(value) => value,
        Err(e) => {
            diagnostics.record(source, entity_id, e.to_string());
            T::default()
        }
    }
}
