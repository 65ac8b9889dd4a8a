//! Host Capability
//!
//! The dashboard runtime the cards live in. Cards receive it through their
//! constructor and never reach for a global:
//!
//! - **Host**: state lookup plus service invocation
//! - **MemoryHost**: in-memory snapshot that records service calls
//! - **HomeAssistantClient**: REST-backed host (native builds)

#[cfg(feature = "native")]
mod client;
mod memory;

#[cfg(feature = "native")]
pub use client::HomeAssistantClient;
pub use memory::MemoryHost;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

/// Sensor state the host reports when it has no value
pub const STATE_UNAVAILABLE: &str = "unavailable";
/// Sensor state the host reports before the first poll
pub const STATE_UNKNOWN: &str = "unknown";

/// Dashboard host the cards read state from and send service calls to
#[async_trait(?Send)]
pub trait Host {
    /// Current record of an entity, if the host knows it
    fn state(&self, entity_id: &str) -> Option<StateRecord>;

    /// Invoke a host service
    async fn call_service(&self, call: ServiceCall) -> HostResult<()>;
}

/// One entity in the host's state snapshot
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StateRecord {
    #[serde(default)]
    pub entity_id: String,
    pub state: String,
    #[serde(default)]
    pub attributes: Value,
}

impl StateRecord {
    pub fn new(entity_id: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            state: state.into(),
            attributes: Value::Null,
        }
    }

    /// True when the state carries a payload rather than a placeholder
    pub fn has_value(&self) -> bool {
        self.state != STATE_UNAVAILABLE && self.state != STATE_UNKNOWN
    }
}

/// A service invocation: `domain.service` with its data
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceCall {
    pub domain: String,
    pub service: String,
    pub data: Value,
}

impl ServiceCall {
    pub fn new(domain: impl Into<String>, service: impl Into<String>, data: Value) -> Self {
        Self {
            domain: domain.into(),
            service: service.into(),
            data,
        }
    }

    /// `homeassistant.update_entity`: ask the host to poll an entity now
    pub fn update_entity(entity_id: &str) -> Self {
        Self::new(
            "homeassistant",
            "update_entity",
            json!({ "entity_id": entity_id }),
        )
    }

    /// `input_datetime.set_datetime` with a date only
    pub fn set_date(entity_id: &str, date: &str) -> Self {
        Self::new(
            "input_datetime",
            "set_datetime",
            json!({ "entity_id": entity_id, "date": date }),
        )
    }

    /// `domain.service` name
    pub fn name(&self) -> String {
        format!("{}.{}", self.domain, self.service)
    }
}

/// Errors raised by a host
#[derive(Error, Debug)]
pub enum HostError {
    #[error("Service {service} failed: {message}")]
    Service { service: String, message: String },

    #[error("Host request failed: {0}")]
    Request(String),

    #[error("Host answered with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Host configuration error: {0}")]
    Config(String),
}

/// Result type for host operations
pub type HostResult<T> = Result<T, HostError>;
