//! Configuration System
//!
//! Two layers live here:
//!
//! - Card configuration: the raw mapping the dashboard hands to `set_config`,
//!   validated and merged over defaults.
//! - Preview configuration: the TOML file read by `energy-cards-preview`, with
//!   environment variable overrides.

use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};

/// Energy carrier a price series belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EnergyType {
    #[default]
    Power,
    Gas,
}

impl EnergyType {
    pub const ALL: [EnergyType; 2] = [EnergyType::Power, EnergyType::Gas];

    /// Segment used in `/api/energy/data/{type}`
    pub fn as_str(&self) -> &'static str {
        match self {
            EnergyType::Power => "power",
            EnergyType::Gas => "gas",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            EnergyType::Power => "Power",
            EnergyType::Gas => "Gas",
        }
    }
}

impl fmt::Display for EnergyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EnergyType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "power" => Ok(EnergyType::Power),
            "gas" => Ok(EnergyType::Gas),
            other => Err(ConfigError::Invalid(format!(
                "unknown energy type '{}', expected power or gas",
                other
            ))),
        }
    }
}

// ============================================
// Sensor panel
// ============================================

/// Configuration of the sensor-bound energy panel
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SensorPanelConfig {
    pub power_entity: String,
    pub gas_entity: String,
    pub dates_entity: String,

    /// Optional `input_datetime` the sensors read their date from
    #[serde(default)]
    pub date_input: Option<String>,

    #[serde(default = "default_panel_title")]
    pub title: String,
}

fn default_panel_title() -> String {
    "Energy Panel".to_string()
}

impl SensorPanelConfig {
    const REQUIRED: [&'static str; 3] = ["power_entity", "gas_entity", "dates_entity"];

    /// Validate a raw card configuration
    pub fn from_value(value: &Value) -> Result<Self, ConfigError> {
        let missing = missing_fields(value, &Self::REQUIRED);
        if !missing.is_empty() {
            return Err(ConfigError::MissingFields(missing));
        }

        let mut config: SensorPanelConfig = serde_json::from_value(value.clone())
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        if config
            .date_input
            .as_deref()
            .map(|s| s.trim().is_empty())
            .unwrap_or(false)
        {
            config.date_input = None;
        }

        Ok(config)
    }

    /// Sensor entities refreshed when the date changes
    pub fn data_entities(&self) -> [&str; 2] {
        [&self.power_entity, &self.gas_entity]
    }
}

// ============================================
// Price card
// ============================================

/// Fallback base URL the caller's `api_url` replaces
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Configuration of the API-bound price card
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PriceCardConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default = "default_price_title")]
    pub title: String,

    #[serde(default)]
    pub default_type: EnergyType,

    /// Symbol prefixed to formatted prices
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_price_title() -> String {
    "Energy Prices".to_string()
}

fn default_currency() -> String {
    "€".to_string()
}

impl Default for PriceCardConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            title: default_price_title(),
            default_type: EnergyType::default(),
            currency: default_currency(),
        }
    }
}

impl PriceCardConfig {
    /// Validate a raw card configuration and merge it over the defaults
    pub fn from_value(value: &Value) -> Result<Self, ConfigError> {
        let missing = missing_fields(value, &["api_url"]);
        if !missing.is_empty() {
            return Err(ConfigError::MissingFields(missing));
        }

        let mut config: PriceCardConfig = serde_json::from_value(value.clone())
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        // Normalize: remove trailing slash
        config.api_url = config.api_url.trim().trim_end_matches('/').to_string();

        Ok(config)
    }
}

/// Keys that are absent, null, or blank strings
fn missing_fields(value: &Value, required: &[&'static str]) -> Vec<&'static str> {
    required
        .iter()
        .copied()
        .filter(|key| !value.get(key).map(is_present).unwrap_or(false))
        .collect()
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        _ => true,
    }
}

// ============================================
// Preview configuration
// ============================================

/// Configuration of the `energy-cards-preview` binary
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PreviewConfig {
    #[serde(default)]
    pub home_assistant: HomeAssistantConfig,

    /// Raw sensor panel card config, validated when used
    #[serde(default)]
    pub sensor_panel: Option<Value>,

    /// Raw price card config, validated when used
    #[serde(default)]
    pub price_card: Option<Value>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Home Assistant connection used to read sensor states
#[derive(Debug, Clone, Deserialize)]
pub struct HomeAssistantConfig {
    #[serde(default = "default_ha_url")]
    pub url: String,

    #[serde(default)]
    pub token: Option<String>,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_ha_url() -> String {
    "http://localhost:8123".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

impl Default for HomeAssistantConfig {
    fn default() -> Self {
        Self {
            url: default_ha_url(),
            token: None,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl PreviewConfig {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::from_toml_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = PreviewConfig::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    #[cfg(feature = "native")]
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("energy-cards").join("config.toml")),
            Some(PathBuf::from("/etc/energy-cards/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("ENERGY_CARDS_HA_URL") {
            self.home_assistant.url = url;
        }
        if let Ok(token) = std::env::var("ENERGY_CARDS_HA_TOKEN") {
            self.home_assistant.token = Some(token);
        }

        if let Ok(api_url) = std::env::var("ENERGY_CARDS_API_URL") {
            let card = self
                .price_card
                .get_or_insert_with(|| Value::Object(Default::default()));
            if let Value::Object(map) = card {
                map.insert("api_url".to_string(), Value::String(api_url));
            }
        }

        if let Ok(level) = std::env::var("ENERGY_CARDS_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("ENERGY_CARDS_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required option(s): {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("Invalid card configuration: {0}")]
    Invalid(String),

    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Energy Cards preview configuration
#
# Environment variables override these settings:
# - ENERGY_CARDS_HA_URL
# - ENERGY_CARDS_HA_TOKEN
# - ENERGY_CARDS_API_URL
# - ENERGY_CARDS_LOG_LEVEL
# - ENERGY_CARDS_LOG_FORMAT

[home_assistant]
# Home Assistant base URL
url = "http://localhost:8123"

# Long-lived access token
# token = ""

# Request timeout in seconds
request_timeout_secs = 10

[sensor_panel]
power_entity = "sensor.energy_power_prices"
gas_entity = "sensor.energy_gas_prices"
dates_entity = "sensor.energy_available_dates"
# date_input = "input_datetime.energy_date"
title = "Energy Panel"

[price_card]
# Base URL of the energy price API
api_url = "http://localhost:8000"
title = "Energy Prices"
# power or gas
default_type = "power"
currency = "€"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_panel_config_requires_all_entities() {
        let err = SensorPanelConfig::from_value(&json!({
            "power_entity": "sensor.power",
            "dates_entity": ""
        }))
        .unwrap_err();

        match err {
            ConfigError::MissingFields(fields) => {
                assert_eq!(fields, vec!["gas_entity", "dates_entity"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_panel_config_defaults() {
        let config = SensorPanelConfig::from_value(&json!({
            "type": "custom:ha-energy-panel",
            "power_entity": "sensor.power",
            "gas_entity": "sensor.gas",
            "dates_entity": "sensor.dates",
            "date_input": " "
        }))
        .unwrap();

        assert_eq!(config.title, "Energy Panel");
        assert_eq!(config.date_input, None);
        assert_eq!(config.data_entities(), ["sensor.power", "sensor.gas"]);
    }

    #[test]
    fn test_price_config_requires_api_url() {
        let err = PriceCardConfig::from_value(&json!({ "title": "Prices" })).unwrap_err();
        assert!(matches!(err, ConfigError::MissingFields(ref f) if f == &vec!["api_url"]));
    }

    #[test]
    fn test_price_config_overrides_defaults() {
        let config = PriceCardConfig::from_value(&json!({
            "api_url": "http://prices.local:9000/",
            "default_type": "gas"
        }))
        .unwrap();

        assert_eq!(config.api_url, "http://prices.local:9000");
        assert_eq!(config.default_type, EnergyType::Gas);
        assert_eq!(config.title, "Energy Prices");
        assert_eq!(config.currency, "€");
    }

    #[test]
    fn test_price_config_rejects_unknown_type() {
        let err = PriceCardConfig::from_value(&json!({
            "api_url": "http://prices.local",
            "default_type": "water"
        }))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_energy_type_parse() {
        assert_eq!("Gas".parse::<EnergyType>().unwrap(), EnergyType::Gas);
        assert!("oil".parse::<EnergyType>().is_err());
        assert_eq!(EnergyType::Power.label(), "Power");
    }

    #[test]
    fn test_generated_config_parses() {
        let config = PreviewConfig::from_toml_str(&generate_default_config()).unwrap();
        assert_eq!(config.home_assistant.url, "http://localhost:8123");
        assert_eq!(config.logging.format, "pretty");

        let panel = SensorPanelConfig::from_value(config.sensor_panel.as_ref().unwrap()).unwrap();
        assert_eq!(panel.gas_entity, "sensor.energy_gas_prices");

        let card = PriceCardConfig::from_value(config.price_card.as_ref().unwrap()).unwrap();
        assert_eq!(card.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[logging]\nlevel = \"debug\"\n").unwrap();

        let config = PreviewConfig::load(&path).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert!(config.price_card.is_none());

        let missing = PreviewConfig::load(&dir.path().join("absent.toml"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }
}
