//! Candidate response retrieval from an index of past utterances.

use std::{
    cmp::Ordering,
    fs::{self, File},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use serde::{Deserialize, Serialize};
use strsim::sorensen_dice;
use tracing::{info, warn};

use crate::data::{
    dataset::{read_json, Action, Event, Example},
    markers,
    preprocess::tokenize,
    scenario::Role,
};

/// Options for the retrieval-based candidate generator.
#[derive(Debug, Clone, ClapArgs, Serialize, Deserialize)]
pub struct RetrieverArgs {
    /// Attach retrieved candidate responses to every turn.
    #[arg(long)]
    pub retrieve: bool,
    /// Path of the retrieval index (JSON).
    #[arg(long)]
    pub index: Option<PathBuf>,
    /// Number of previous turns used as the retrieval query.
    #[arg(long, default_value_t = 2)]
    pub retriever_context_len: usize,
    /// Number of candidates returned per query.
    #[arg(long, default_value_t = 20)]
    pub num_candidates: usize,
}

/// One indexed response and the context it followed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub category: String,
    pub role: Role,
    pub context: String,
    pub response: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct RetrievalIndex {
    context_size: usize,
    entries: Vec<IndexEntry>,
}

#[derive(Debug, Clone)]
pub struct Retriever {
    entries: Vec<IndexEntry>,
    context_size: usize,
    num_candidates: usize,
}

/// Lowercased tokens joined by single spaces. Index contexts, responses and
/// queries are all compared in this form.
pub fn normalize(text: &str) -> String {
    tokenize(text).join(" ")
}

/// Surface text of an event as the preprocessor renders it, markers included.
fn event_text(event: &Event) -> Option<String> {
    match event.action {
        Action::Message => event.message().map(str::to_string),
        Action::Offer => event
            .offer_price()
            .map(|price| format!("{} ${price}", markers::OFFER)),
        Action::Accept => Some(markers::ACCEPT.to_string()),
        Action::Reject => Some(markers::REJECT.to_string()),
        Action::Quit => Some(markers::QUIT.to_string()),
    }
}

impl Retriever {
    /// Open an index written by [`Retriever::build_index`].
    pub fn new(index: &Path, context_size: usize, num_candidates: usize) -> Result<Self> {
        let stored: RetrievalIndex = read_json(index)
            .with_context(|| format!("open retrieval index {}", index.display()))?;
        if stored.context_size != context_size {
            warn!(
                path = %index.display(),
                indexed = stored.context_size,
                requested = context_size,
                "retrieval index was built with a different context length"
            );
        }
        info!(
            path = %index.display(),
            entries = stored.entries.len(),
            context_size,
            num_candidates,
            "opened retrieval index"
        );
        Ok(Self {
            entries: stored.entries,
            context_size,
            num_candidates,
        })
    }

    /// Index every message of `examples` with the `context_size` turns before its own.
    ///
    /// Consecutive events by one speaker form a turn, the way the preprocessor
    /// groups them, so stored contexts line up with dialogue history queries.
    pub fn build_index(examples: &[Example], context_size: usize, path: &Path) -> Result<usize> {
        let mut entries = Vec::new();
        for example in examples {
            let scenario = example.scenario()?;
            let mut turns: Vec<(Role, Vec<String>)> = Vec::new();
            for event in &example.events {
                let Some(kb) = scenario.kb(event.agent) else {
                    continue;
                };
                let Some(text) = event_text(event) else {
                    continue;
                };
                let role = kb.role();
                if turns.last().map_or(true, |(last, _)| *last != role) {
                    turns.push((role, Vec::new()));
                }
                let current = turns.len() - 1;
                if let Some(message) = event.message() {
                    let history: Vec<String> = turns[..current]
                        .iter()
                        .map(|(_, parts)| parts.join(" "))
                        .collect();
                    entries.push(IndexEntry {
                        category: scenario.category.clone(),
                        role,
                        context: normalize(&join_tail(&history, context_size)),
                        response: normalize(message),
                    });
                }
                turns[current].1.push(text);
            }
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
        let count = entries.len();
        serde_json::to_writer(file, &RetrievalIndex { context_size, entries })?;
        info!(path = %path.display(), entries = count, "wrote retrieval index");
        Ok(count)
    }

    /// Responses by `role` in `category` whose context best matches the last turns of `context`.
    pub fn search(&self, role: Role, category: &str, context: &[String]) -> Vec<String> {
        let query = normalize(&join_tail(context, self.context_size));
        let mut scored: Vec<(f64, &IndexEntry)> = self
            .entries
            .iter()
            .filter(|e| e.role == role && e.category == category)
            .map(|e| (sorensen_dice(&query, &e.context), e))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
        scored
            .into_iter()
            .take(self.num_candidates)
            .map(|(_, e)| e.response.clone())
            .collect()
    }
}

fn join_tail(turns: &[String], n: usize) -> String {
    let start = turns.len().saturating_sub(n);
    turns[start..].join(" ")
}
