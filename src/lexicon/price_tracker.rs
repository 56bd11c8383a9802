//! Price mention detection and role-relative price scaling.

use std::{collections::HashSet, path::Path, path::PathBuf};

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    data::{
        dataset::read_json,
        scenario::{Kb, Role},
    },
    lexicon::Token,
};

/// Options for the price lexicon.
#[derive(Debug, Clone, ClapArgs, Serialize, Deserialize)]
pub struct PriceTrackerArgs {
    /// Path to the price lexicon (JSON with a `price_words` list).
    #[arg(long)]
    pub price_tracker_model: Option<PathBuf>,
    /// Scaled prices are clipped to [-clip, clip].
    #[arg(long, default_value_t = 4.0)]
    pub price_clip: f64,
}

const DEFAULT_PRICE_WORDS: &[&str] = &[
    "$", "dollar", "dollars", "bucks", "usd", "grand", "price", "offer", "firm", "obo", "cash",
];

/// Window around the listing price within which a bare number counts as a price.
const LISTING_RATIO: (f64, f64) = (0.3, 3.0);

static NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+(?:,\d{3})*(?:\.\d+)?k?$").expect("valid regex"));

#[derive(Debug, Deserialize)]
struct LexiconFile {
    price_words: Vec<String>,
}

/// Links numeric tokens that denote prices.
#[derive(Debug, Clone)]
pub struct PriceTracker {
    price_words: HashSet<String>,
}

impl PriceTracker {
    /// Load the lexicon from `model_path`, or fall back to the built-in word list.
    pub fn new(model_path: Option<&Path>) -> Result<Self> {
        let price_words = match model_path {
            Some(path) => {
                let file: LexiconFile = read_json(path)
                    .with_context(|| format!("load price lexicon {}", path.display()))?;
                info!(path = %path.display(), words = file.price_words.len(), "loaded price lexicon");
                file.price_words.into_iter().map(|w| w.to_lowercase()).collect()
            }
            None => DEFAULT_PRICE_WORDS.iter().map(|w| w.to_string()).collect(),
        };
        Ok(Self { price_words })
    }

    /// Parse `1,200`, `1200.5` or `1.2k`.
    pub fn parse_price(token: &str) -> Option<f64> {
        if !NUMBER.is_match(token) {
            return None;
        }
        let (digits, multiplier) = match token.strip_suffix('k') {
            Some(rest) => (rest, 1000.0),
            None => (token, 1.0),
        };
        digits
            .replace(',', "")
            .parse::<f64>()
            .ok()
            .map(|value| value * multiplier)
    }

    fn is_price(&self, tokens: &[String], idx: usize, value: f64, kb: Option<&Kb>) -> bool {
        let after_dollar = idx > 0 && tokens[idx - 1] == "$";
        let before_word = tokens
            .get(idx + 1)
            .is_some_and(|next| self.price_words.contains(next));
        if after_dollar || before_word {
            return true;
        }
        match kb {
            Some(kb) if kb.listing_price() > 0.0 => {
                let ratio = value / kb.listing_price();
                ratio >= LISTING_RATIO.0 && ratio <= LISTING_RATIO.1
            }
            _ => false,
        }
    }

    /// Replace price mentions in `tokens` with price entities.
    pub fn link_entity(
        &self,
        tokens: &[String],
        kb: Option<&Kb>,
        scale: bool,
        price_clip: Option<f64>,
    ) -> Vec<Token> {
        let mut linked = Vec::with_capacity(tokens.len());
        for (idx, token) in tokens.iter().enumerate() {
            let Some(price) = Self::parse_price(token) else {
                linked.push(Token::word(token.as_str()));
                continue;
            };
            if !self.is_price(tokens, idx, price, kb) {
                linked.push(Token::word(token.as_str()));
                continue;
            }
            let mut surface = token.clone();
            if idx > 0 && tokens[idx - 1] == "$" {
                linked.pop();
                surface = format!("${token}");
            }
            let value = match (scale, kb) {
                (true, Some(kb)) => PriceScaler::scale_price(kb, price, price_clip),
                _ => price,
            };
            linked.push(Token::Price { surface, value });
        }
        linked
    }
}

/// Maps prices onto the agent's bottomline→target axis.
pub struct PriceScaler;

impl PriceScaler {
    /// `(bottomline, target)` for the agent owning `kb`.
    pub fn price_range(kb: &Kb) -> (f64, f64) {
        let target = kb.personal.target.unwrap_or(kb.listing_price());
        let bottomline = kb.personal.bottomline.unwrap_or(match kb.role() {
            Role::Seller => target * 0.7,
            Role::Buyer => kb.listing_price(),
        });
        (bottomline, target)
    }

    pub fn scale_price(kb: &Kb, price: f64, clip: Option<f64>) -> f64 {
        let (bottomline, target) = Self::price_range(kb);
        let span = target - bottomline;
        let scaled = if span.abs() < f64::EPSILON {
            price / target.max(1.0)
        } else {
            (price - bottomline) / span
        };
        match clip {
            Some(clip) => scaled.clamp(-clip, clip),
            None => scaled,
        }
    }

    pub fn unscale_price(kb: &Kb, scaled: f64) -> f64 {
        let (bottomline, target) = Self::price_range(kb);
        let span = target - bottomline;
        if span.abs() < f64::EPSILON {
            scaled * target.max(1.0)
        } else {
            bottomline + scaled * span
        }
    }
}
