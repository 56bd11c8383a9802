//! Detects item attributes (slots) from the listing mentioned in utterances.

use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    data::{dataset::read_json, preprocess::tokenize, scenario::Kb},
    lexicon::Token,
};

/// Options for slot detection.
#[derive(Debug, Clone, ClapArgs, Serialize, Deserialize)]
pub struct SlotDetectorArgs {
    /// Path to per-category slot scores (JSON `{category: {word: score}}`).
    #[arg(long)]
    pub slot_scores: Option<PathBuf>,
    /// Minimum score for a listing word to be treated as a slot.
    #[arg(long, default_value_t = 0.5)]
    pub slot_threshold: f64,
}

type SlotScores = HashMap<String, HashMap<String, f64>>;

const MIN_SLOT_LEN: usize = 3;

#[derive(Debug, Clone)]
pub struct SlotDetector {
    scores: Option<SlotScores>,
    threshold: f64,
}

impl SlotDetector {
    pub fn new(slot_scores_path: Option<&Path>, threshold: f64) -> Result<Self> {
        let scores = match slot_scores_path {
            Some(path) => {
                let scores: SlotScores = read_json(path)
                    .with_context(|| format!("load slot scores {}", path.display()))?;
                info!(path = %path.display(), categories = scores.len(), "loaded slot scores");
                Some(scores)
            }
            None => None,
        };
        Ok(Self { scores, threshold })
    }

    /// Score of `word` for `category`; `None` when the category or word is unscored.
    pub fn score(&self, category: &str, word: &str) -> Option<f64> {
        self.scores
            .as_ref()?
            .get(category)
            .and_then(|words| words.get(word))
            .copied()
    }

    fn is_slot(&self, category: &str, word: &str) -> bool {
        match &self.scores {
            Some(_) => self
                .score(category, word)
                .is_some_and(|score| score >= self.threshold),
            None => word.chars().count() >= MIN_SLOT_LEN,
        }
    }

    /// Mark listing words in `tokens` as slot entities.
    pub fn detect_slots(&self, tokens: Vec<Token>, kb: &Kb) -> Vec<Token> {
        let listing: HashSet<String> = tokenize(&kb.item_text()).into_iter().collect();
        let category = kb.category();
        tokens
            .into_iter()
            .map(|token| match token {
                Token::Word(word)
                    if listing.contains(&word)
                        && word.chars().all(char::is_alphanumeric)
                        && self.is_slot(category, &word) =>
                {
                    Token::Slot {
                        surface: word.clone(),
                        value: word,
                    }
                }
                other => other,
            })
            .collect()
    }
}
