//! Lovelace host
//!
//! Adapts the `hass` object the dashboard assigns to every card.

use async_trait::async_trait;
use energy_cards::host::{Host, HostError, HostResult, ServiceCall, StateRecord};
use js_sys::{Function, Promise, Reflect};
use std::cell::RefCell;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

/// Host backed by the latest `hass` object
pub struct HassHost {
    hass: RefCell<JsValue>,
}

impl Default for HassHost {
    fn default() -> Self {
        Self {
            hass: RefCell::new(JsValue::UNDEFINED),
        }
    }
}

impl HassHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the object from the latest `hass` assignment
    pub fn replace(&self, hass: JsValue) {
        *self.hass.borrow_mut() = hass;
    }

    pub fn is_connected(&self) -> bool {
        let hass = self.hass.borrow();
        !hass.is_undefined() && !hass.is_null()
    }
}

fn js_error(value: JsValue) -> String {
    value
        .as_string()
        .or_else(|| {
            Reflect::get(&value, &JsValue::from_str("message"))
                .ok()
                .and_then(|m| m.as_string())
        })
        .unwrap_or_else(|| format!("{:?}", value))
}

#[async_trait(?Send)]
impl Host for HassHost {
    fn state(&self, entity_id: &str) -> Option<StateRecord> {
        let hass = self.hass.borrow();
        let states = Reflect::get(&hass, &JsValue::from_str("states")).ok()?;
        let entity = Reflect::get(&states, &JsValue::from_str(entity_id)).ok()?;
        if entity.is_undefined() || entity.is_null() {
            return None;
        }

        let state = Reflect::get(&entity, &JsValue::from_str("state"))
            .ok()?
            .as_string()?;
        Some(StateRecord::new(entity_id, state))
    }

    async fn call_service(&self, call: ServiceCall) -> HostResult<()> {
        let hass = self.hass.borrow().clone();
        let call_service: Function = Reflect::get(&hass, &JsValue::from_str("callService"))
            .map_err(|e| HostError::Request(js_error(e)))?
            .dyn_into()
            .map_err(|_| HostError::Config("hass.callService is not available".to_string()))?;

        let data = js_sys::JSON::parse(&call.data.to_string())
            .map_err(|e| HostError::Request(js_error(e)))?;

        let result = call_service
            .call3(
                &hass,
                &JsValue::from_str(&call.domain),
                &JsValue::from_str(&call.service),
                &data,
            )
            .map_err(|e| HostError::Service {
                service: call.name(),
                message: js_error(e),
            })?;

        if let Ok(promise) = result.dyn_into::<Promise>() {
            JsFuture::from(promise)
                .await
                .map_err(|e| HostError::Service {
                    service: call.name(),
                    message: js_error(e),
                })?;
        }
        Ok(())
    }
}
