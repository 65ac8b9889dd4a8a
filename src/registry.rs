//! Card Registry
//!
//! Descriptors the dashboard discovers at load time (`window.customCards`).

use serde::Serialize;
use thiserror::Error;

/// Metadata published for one card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CardDescriptor {
    /// Custom element tag name
    #[serde(rename = "type")]
    pub card_type: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

pub const SENSOR_PANEL: CardDescriptor = CardDescriptor {
    card_type: "ha-energy-panel",
    name: "Energy Panel Card",
    description: "A card that displays energy data from Home Assistant REST sensors",
};

pub const PRICE_CARD: CardDescriptor = CardDescriptor {
    card_type: "energy-prices-card",
    name: "Energy Prices Card",
    description: "A card that charts energy prices from the energy API",
};

#[derive(Error, Debug, PartialEq)]
pub enum RegistryError {
    #[error("Card type already registered: {0}")]
    Duplicate(&'static str),
}

/// Ordered set of card descriptors with unique tag names
#[derive(Debug, Default, Clone)]
pub struct CardRegistry {
    cards: Vec<CardDescriptor>,
}

impl CardRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding both energy cards
    pub fn with_builtin() -> Self {
        Self {
            cards: vec![SENSOR_PANEL, PRICE_CARD],
        }
    }

    pub fn register(&mut self, descriptor: CardDescriptor) -> Result<(), RegistryError> {
        if self.get(descriptor.card_type).is_some() {
            return Err(RegistryError::Duplicate(descriptor.card_type));
        }
        self.cards.push(descriptor);
        Ok(())
    }

    pub fn get(&self, card_type: &str) -> Option<&CardDescriptor> {
        self.cards.iter().find(|c| c.card_type == card_type)
    }

    /// Descriptors in registration order
    pub fn descriptors(&self) -> &[CardDescriptor] {
        &self.cards
    }

    /// JSON array in the shape the dashboard expects
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!(self.cards)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_duplicate_tags() {
        let mut registry = CardRegistry::new();
        registry.register(SENSOR_PANEL).unwrap();
        assert_eq!(
            registry.register(SENSOR_PANEL),
            Err(RegistryError::Duplicate("ha-energy-panel"))
        );
        registry.register(PRICE_CARD).unwrap();
        assert_eq!(registry.descriptors().len(), 2);
    }

    #[test]
    fn test_json_shape() {
        let json = CardRegistry::with_builtin().to_json();
        assert_eq!(json[0]["type"], "ha-energy-panel");
        assert_eq!(json[0]["name"], "Energy Panel Card");
        assert_eq!(json[1]["type"], "energy-prices-card");
        assert!(json[1]["description"].as_str().unwrap().contains("prices"));
    }
}
