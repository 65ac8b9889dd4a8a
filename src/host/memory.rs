//! In-memory host
//!
//! Holds a state snapshot and records every service call it receives.

use async_trait::async_trait;
use std::cell::RefCell;
use std::collections::HashMap;

use super::{Host, HostError, HostResult, ServiceCall, StateRecord};

#[derive(Debug, Default)]
pub struct MemoryHost {
    states: RefCell<HashMap<String, StateRecord>>,
    calls: RefCell<Vec<ServiceCall>>,
    /// Services (`domain.service`) that fail when invoked
    failing: RefCell<Vec<String>>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or replace an entity's state string
    pub fn set_state(&self, entity_id: &str, state: impl Into<String>) {
        self.states
            .borrow_mut()
            .insert(entity_id.to_string(), StateRecord::new(entity_id, state));
    }

    pub fn remove_state(&self, entity_id: &str) {
        self.states.borrow_mut().remove(entity_id);
    }

    /// Make every call to `domain.service` fail
    pub fn fail_service(&self, name: &str) {
        self.failing.borrow_mut().push(name.to_string());
    }

    /// Service calls received so far, oldest first
    pub fn calls(&self) -> Vec<ServiceCall> {
        self.calls.borrow().clone()
    }
}

#[async_trait(?Send)]
impl Host for MemoryHost {
    fn state(&self, entity_id: &str) -> Option<StateRecord> {
        self.states.borrow().get(entity_id).cloned()
    }

    async fn call_service(&self, call: ServiceCall) -> HostResult<()> {
        let name = call.name();
        self.calls.borrow_mut().push(call);

        if self.failing.borrow().contains(&name) {
            return Err(HostError::Service {
                service: name,
                message: "service rejected".to_string(),
            });
        }
        Ok(())
    }
}
