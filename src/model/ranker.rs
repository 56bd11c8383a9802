//! Candidate rankers.

use std::collections::HashSet;

use clap::{Args as ClapArgs, ValueEnum};
use serde::{Deserialize, Serialize};

/// Options for ranking retrieved candidates.
#[derive(Debug, Clone, ClapArgs, Serialize, Deserialize)]
pub struct RankerArgs {
    /// Rank candidates instead of generating.
    #[arg(long, value_enum)]
    pub ranker: Option<RankerType>,
    /// Softmax temperature of the encdec ranker.
    #[arg(long, default_value_t = 0.0)]
    pub temperature: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankerType {
    /// Oracle: picks the candidate closest to the gold response.
    Cheat,
    /// Picks the top retrieved candidate.
    Ir,
    /// Scores candidates with an encoder-decoder.
    Encdec,
    /// Scores slot-filled candidates.
    Sf,
}

/// Oracle baseline with access to the gold response.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CheatRanker;

impl CheatRanker {
    /// Index of the candidate sharing the most distinct tokens with `target`.
    /// Ties go to the earliest candidate.
    pub fn select<S: AsRef<str>>(&self, candidates: &[Vec<S>], target: &[S]) -> Option<usize> {
        let gold: HashSet<&str> = target.iter().map(AsRef::as_ref).collect();
        let mut best: Option<(usize, usize)> = None;
        for (i, candidate) in candidates.iter().enumerate() {
            let tokens: HashSet<&str> = candidate.iter().map(AsRef::as_ref).collect();
            let overlap = tokens.intersection(&gold).count();
            if best.map_or(true, |(_, b)| overlap > b) {
                best = Some((i, overlap));
            }
        }
        best.map(|(i, _)| i)
    }
}

/// Retrieval baseline: trusts the retriever's ordering.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct IrRanker;

impl IrRanker {
    pub fn select<S>(&self, candidates: &[Vec<S>]) -> Option<usize> {
        if candidates.is_empty() {
            None
        } else {
            Some(0)
        }
    }
}
