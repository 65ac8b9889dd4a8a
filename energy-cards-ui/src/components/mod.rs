//! UI Components

mod chart;
mod loading;
mod price_card;

pub use chart::{CanvasChart, CANVAS_ID};
pub use loading::Loading;
pub use price_card::{PriceCardLayout, CARD_STYLE};
