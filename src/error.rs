//! Card error types
//!
//! Errors surfaced by the cards to their host. Configuration errors live in
//! [`crate::config`], host capability errors in [`crate::host`].

use thiserror::Error;

use crate::config::ConfigError;
use crate::host::HostError;

/// Errors that can occur while a card sets itself up or refreshes
#[derive(Error, Debug)]
pub enum CardError {
    /// Card used before `set_config` succeeded
    #[error("Card is not configured")]
    NotConfigured,

    /// Configured, but the first host update has not set the card up yet
    #[error("Card is not set up yet")]
    NotReady,

    /// Configuration rejected
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Chart library missing or failed to load
    #[error("Chart library error: {0}")]
    ChartLibrary(String),

    /// Endpoint answered with a non-success status
    #[error("HTTP error! status: {0}")]
    HttpStatus(u16),

    /// Request never produced a response
    #[error("Network error: {0}")]
    Network(String),

    /// Response body did not match the expected shape
    #[error("Invalid response: {0}")]
    Decode(String),

    /// Controls are missing a required selection
    #[error("Invalid selection: {0}")]
    Selection(String),

    /// Host service invocation failed
    #[error("Host error: {0}")]
    Host(#[from] HostError),
}

impl From<serde_json::Error> for CardError {
    fn from(err: serde_json::Error) -> Self {
        CardError::Decode(err.to_string())
    }
}

#[cfg(feature = "native")]
impl From<reqwest::Error> for CardError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            CardError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            CardError::HttpStatus(status.as_u16())
        } else {
            CardError::Network(err.to_string())
        }
    }
}

/// Result type alias for card operations
pub type CardResult<T> = Result<T, CardError>;
