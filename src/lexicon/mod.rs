//! Entity linking: prices and item slots mentioned in utterances.

pub mod price_tracker;
pub mod slot_detector;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::data::markers;

/// How an entity is rendered when a token sequence is turned into words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityForm {
    /// Normalised value (scaled price, slot word).
    Canonical,
    /// Entity type marker only.
    Type,
    /// Text as written.
    Surface,
}

/// A word or a linked entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Token {
    Word(String),
    Price { surface: String, value: f64 },
    Slot { surface: String, value: String },
}

impl Token {
    pub fn word(text: impl Into<String>) -> Self {
        Self::Word(text.into())
    }

    pub fn is_entity(&self) -> bool {
        !matches!(self, Self::Word(_))
    }

    pub fn surface(&self) -> &str {
        match self {
            Self::Word(text) => text,
            Self::Price { surface, .. } | Self::Slot { surface, .. } => surface,
        }
    }

    /// Render the token as a vocabulary entry.
    pub fn render(&self, form: EntityForm) -> String {
        match (self, form) {
            (Self::Word(text), _) => text.clone(),
            (Self::Price { surface, .. }, EntityForm::Surface)
            | (Self::Slot { surface, .. }, EntityForm::Surface) => surface.clone(),
            (Self::Price { .. }, EntityForm::Type) => markers::PRICE.to_string(),
            (Self::Slot { .. }, EntityForm::Type) => markers::START_SLOT.to_string(),
            (Self::Price { value, .. }, EntityForm::Canonical) => canonical_price(*value),
            (Self::Slot { value, .. }, EntityForm::Canonical) => value.clone(),
        }
    }
}

/// Prices are bucketed to one decimal so the vocabulary stays bounded.
pub fn canonical_price(value: f64) -> String {
    let rounded = (value * 10.0).round() / 10.0 + 0.0;
    format!("<price:{rounded:.1}>")
}
