//! Agent-centric view of a transcript after preprocessing.

use serde::{Deserialize, Serialize};

use crate::{
    data::scenario::{Kb, Role},
    lexicon::Token,
};

/// Consecutive utterances of one speaker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub tokens: Vec<Token>,
}

/// A transcript as seen by one of its agents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dialogue {
    pub uuid: String,
    pub agent: usize,
    pub role: Role,
    pub category: String,
    /// Knowledge base of `agent`.
    pub kb: Kb,
    pub title: Vec<String>,
    pub description: Vec<String>,
    pub turns: Vec<Turn>,
    /// Candidate responses per turn; empty when a turn has none.
    pub candidates: Vec<Vec<Vec<Token>>>,
}

impl Dialogue {
    pub fn new(uuid: impl Into<String>, agent: usize, kb: Kb) -> Self {
        Self {
            uuid: uuid.into(),
            agent,
            role: kb.role(),
            category: kb.category().to_string(),
            kb,
            title: Vec::new(),
            description: Vec::new(),
            turns: Vec::new(),
            candidates: Vec::new(),
        }
    }

    /// Append tokens, merging with the last turn when the speaker is unchanged.
    pub fn add_utterance(&mut self, role: Role, tokens: Vec<Token>) {
        match self.turns.last_mut() {
            Some(last) if last.role == role => last.tokens.extend(tokens),
            _ => {
                self.turns.push(Turn { role, tokens });
                self.candidates.push(Vec::new());
            }
        }
    }

    /// Start a new turn regardless of the previous speaker.
    pub fn push_turn(&mut self, role: Role, tokens: Vec<Token>, candidates: Vec<Vec<Token>>) {
        self.turns.push(Turn { role, tokens });
        self.candidates.push(candidates);
    }

    pub fn num_turns(&self) -> usize {
        self.turns.len()
    }

    /// Listing title followed by description words.
    pub fn context_tokens(&self) -> impl Iterator<Item = &String> {
        self.title.iter().chain(self.description.iter())
    }

    pub fn set_candidates(&mut self, turn: usize, candidates: Vec<Vec<Token>>) {
        if turn < self.candidates.len() {
            self.candidates[turn] = candidates;
        }
    }

    /// Plain text of the turns before `turn`, oldest first.
    pub fn history_text(&self, turn: usize) -> Vec<String> {
        self.turns[..turn.min(self.turns.len())]
            .iter()
            .map(|t| {
                t.tokens
                    .iter()
                    .map(Token::surface)
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect()
    }
}
