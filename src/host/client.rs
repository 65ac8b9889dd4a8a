//! Home Assistant REST host
//!
//! Lets the cards run outside the browser: states are pulled from
//! `/api/states/{id}` into a local snapshot, service calls go to
//! `/api/services/{domain}/{service}`.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::cell::RefCell;
use std::collections::HashMap;
use std::time::Duration;

use super::{Host, HostError, HostResult, ServiceCall, StateRecord};
use crate::config::HomeAssistantConfig;

/// Home Assistant REST API client
pub struct HomeAssistantClient {
    client: Client,
    base_url: String,
    token: String,
    snapshot: RefCell<HashMap<String, StateRecord>>,
}

impl HomeAssistantClient {
    /// Create a new client for the given base URL and access token
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> HostResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HostError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            snapshot: RefCell::new(HashMap::new()),
        })
    }

    /// Create a client from the preview configuration
    pub fn from_config(config: &HomeAssistantConfig) -> HostResult<Self> {
        let token = config.token.clone().ok_or_else(|| {
            HostError::Config(
                "HA token not found in config or ENERGY_CARDS_HA_TOKEN environment variable"
                    .to_string(),
            )
        })?;

        tracing::info!("Initializing Home Assistant client: {}", config.url);
        Self::new(
            config.url.clone(),
            token,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Pull the current state of each entity into the snapshot
    ///
    /// Entities the host does not know are dropped from the snapshot.
    pub async fn refresh_states(&self, entity_ids: &[&str]) -> HostResult<()> {
        for entity_id in entity_ids {
            match self.fetch_state(entity_id).await? {
                Some(record) => {
                    tracing::debug!(entity_id = %entity_id, state = %record.state, "Fetched state");
                    self.snapshot
                        .borrow_mut()
                        .insert(entity_id.to_string(), record);
                }
                None => {
                    tracing::warn!(entity_id = %entity_id, "Entity not found");
                    self.snapshot.borrow_mut().remove(*entity_id);
                }
            }
        }
        Ok(())
    }

    async fn fetch_state(&self, entity_id: &str) -> HostResult<Option<StateRecord>> {
        let url = format!("{}/api/states/{}", self.base_url, entity_id);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| HostError::Request(e.to_string()))?;

        match response.status() {
            StatusCode::OK => response
                .json::<StateRecord>()
                .await
                .map(Some)
                .map_err(|e| HostError::Request(e.to_string())),
            StatusCode::NOT_FOUND => Ok(None),
            status => {
                let message = response.text().await.unwrap_or_default();
                Err(HostError::Status {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }
}

#[async_trait(?Send)]
impl Host for HomeAssistantClient {
    fn state(&self, entity_id: &str) -> Option<StateRecord> {
        self.snapshot.borrow().get(entity_id).cloned()
    }

    async fn call_service(&self, call: ServiceCall) -> HostResult<()> {
        let url = format!(
            "{}/api/services/{}/{}",
            self.base_url, call.domain, call.service
        );
        tracing::info!(service = %call.name(), data = %call.data, "Calling service");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&call.data)
            .send()
            .await
            .map_err(|e| HostError::Request(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let message = response.text().await.unwrap_or_default();
            Err(HostError::Service {
                service: call.name(),
                message: format!("status {}: {}", status.as_u16(), message),
            })
        }
    }
}
