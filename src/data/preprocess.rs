//! Turns transcripts into tokenised, entity-linked dialogues.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args as ClapArgs;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    data::{
        dataset::{Action, EvalExample, Event, Example},
        dialogue::Dialogue,
        markers,
        scenario::{Kb, Role, Schema},
    },
    lexicon::{
        price_tracker::{PriceScaler, PriceTracker},
        slot_detector::SlotDetector,
        EntityForm, Token,
    },
};

/// Options controlling preprocessing and batch caching.
#[derive(Debug, Clone, ClapArgs, Serialize, Deserialize)]
pub struct PreprocessArgs {
    /// Entity form fed to the encoder.
    #[arg(long, value_enum, default_value = "canonical")]
    pub entity_encoding_form: EntityForm,
    /// Entity form fed to the decoder.
    #[arg(long, value_enum, default_value = "canonical")]
    pub entity_decoding_form: EntityForm,
    /// Entity form of decoder targets.
    #[arg(long, value_enum, default_value = "canonical")]
    pub entity_target_form: EntityForm,
    /// Precomputed candidate responses (JSON `{uuid: [[candidate, ...] per turn]}`).
    #[arg(long, num_args = 0.., value_delimiter = ',')]
    pub candidates_path: Vec<PathBuf>,
    /// Directory for cached preprocessed dialogues.
    #[arg(long, default_value = ".cache")]
    pub cache: PathBuf,
    /// Preprocess again even when a cache exists.
    #[arg(long)]
    pub ignore_cache: bool,
    /// Path of the vocabulary mappings (JSON).
    #[arg(long)]
    pub mappings: Option<PathBuf>,
}

static TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d+(?:,\d{3})*(?:\.\d+)?k?|[a-z][a-z0-9']*|[^\sa-z0-9]").expect("valid regex")
});

/// Lowercase and split an utterance into words, numbers and punctuation.
pub fn tokenize(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    TOKEN
        .find_iter(&lower)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Binds schema, lexicon and entity forms used to encode dialogues.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    pub schema: Schema,
    lexicon: PriceTracker,
    pub entity_encoding_form: EntityForm,
    pub entity_decoding_form: EntityForm,
    pub entity_target_form: EntityForm,
    pub slot_filling: bool,
    slot_detector: SlotDetector,
    price_clip: Option<f64>,
}

impl Preprocessor {
    pub fn new(
        schema: Schema,
        lexicon: PriceTracker,
        entity_encoding_form: EntityForm,
        entity_decoding_form: EntityForm,
        entity_target_form: EntityForm,
        slot_filling: bool,
        slot_detector: SlotDetector,
    ) -> Self {
        Self {
            schema,
            lexicon,
            entity_encoding_form,
            entity_decoding_form,
            entity_target_form,
            slot_filling,
            slot_detector,
            price_clip: None,
        }
    }

    pub fn with_price_clip(mut self, clip: f64) -> Self {
        self.price_clip = Some(clip);
        self
    }

    pub fn price_clip(&self) -> Option<f64> {
        self.price_clip
    }

    /// Tokenise, link prices relative to `kb` and, when slot filling, mark slots.
    pub fn process_utterance(&self, text: &str, kb: &Kb) -> Vec<Token> {
        let tokens = tokenize(text);
        let linked = self
            .lexicon
            .link_entity(&tokens, Some(kb), true, self.price_clip);
        if self.slot_filling {
            self.slot_detector.detect_slots(linked, kb)
        } else {
            linked
        }
    }

    /// Tokens for one event, or `None` for events without a surface form.
    pub fn process_event(&self, event: &Event, kb: &Kb) -> Option<Vec<Token>> {
        match event.action {
            Action::Message => event.message().map(|text| self.process_utterance(text, kb)),
            Action::Offer => event.offer_price().map(|price| {
                vec![
                    Token::word(markers::OFFER),
                    Token::Price {
                        surface: format!("${price}"),
                        value: PriceScaler::scale_price(kb, price, self.price_clip),
                    },
                ]
            }),
            Action::Accept => Some(vec![Token::word(markers::ACCEPT)]),
            Action::Reject => Some(vec![Token::word(markers::REJECT)]),
            Action::Quit => Some(vec![Token::word(markers::QUIT)]),
        }
    }

    fn new_dialogue(&self, uuid: &str, agent: usize, kb: &Kb) -> Dialogue {
        let mut dialogue = Dialogue::new(uuid, agent, kb.clone());
        dialogue.title = tokenize(&kb.item.title);
        dialogue.description = tokenize(&kb.item.description.join(" "));
        dialogue
    }

    /// One dialogue per agent for every example.
    pub fn preprocess(&self, examples: &[Example]) -> Result<Vec<Dialogue>> {
        let mut dialogues = Vec::with_capacity(examples.len() * 2);
        for example in examples {
            let scenario = example.scenario()?;
            for (agent, kb) in scenario.kbs.iter().enumerate() {
                let mut dialogue = self.new_dialogue(&example.uuid, agent, kb);
                for event in &example.events {
                    let Some(tokens) = self.process_event(event, kb) else {
                        continue;
                    };
                    let role = scenario
                        .kb(event.agent)
                        .map(Kb::role)
                        .unwrap_or_else(|| opposite(kb.role()));
                    dialogue.add_utterance(role, tokens);
                }
                debug!(uuid = %example.uuid, agent, turns = dialogue.num_turns(), "preprocessed dialogue");
                dialogues.push(dialogue);
            }
        }
        info!(examples = examples.len(), dialogues = dialogues.len(), "preprocessed examples");
        Ok(dialogues)
    }

    /// History turns followed by the target turn, which carries the candidates.
    pub fn preprocess_eval(&self, example: &EvalExample) -> Dialogue {
        let kb = &example.kb;
        let mut dialogue = self.new_dialogue(&example.uuid, example.agent, kb);
        for (text, role) in example.prev_turns.iter().zip(&example.prev_roles) {
            dialogue.add_utterance(*role, self.process_utterance(text, kb));
        }
        let candidates = example
            .candidates
            .iter()
            .map(|text| self.process_utterance(text, kb))
            .collect();
        // The target always opens its own turn, even after an utterance by the same role.
        dialogue.push_turn(
            example.role,
            self.process_utterance(&example.target, kb),
            candidates,
        );
        dialogue
    }
}

fn opposite(role: Role) -> Role {
    match role {
        Role::Buyer => Role::Seller,
        Role::Seller => Role::Buyer,
    }
}
