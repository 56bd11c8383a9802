//! Dialogue history encoders.

use serde::Serialize;

use crate::model::{
    graph::KeepProb, sequence_embedder::SequenceEmbedder, word_embedder::WordEmbedder,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EncoderKind {
    /// Encodes the previous turn only.
    Basic,
    /// Encodes the last `num_context` turns.
    Context { num_context: usize },
}

#[derive(Debug, Clone, Serialize)]
pub struct Encoder {
    pub kind: EncoderKind,
    pub word_embedder: WordEmbedder,
    pub seq_embedder: SequenceEmbedder,
    pub pad: usize,
    pub keep_prob: KeepProb,
}

impl Encoder {
    pub fn basic(
        word_embedder: WordEmbedder,
        seq_embedder: SequenceEmbedder,
        pad: usize,
        keep_prob: KeepProb,
    ) -> Self {
        Self {
            kind: EncoderKind::Basic,
            word_embedder,
            seq_embedder,
            pad,
            keep_prob,
        }
    }

    pub fn context(
        word_embedder: WordEmbedder,
        seq_embedder: SequenceEmbedder,
        num_context: usize,
        pad: usize,
        keep_prob: KeepProb,
    ) -> Self {
        Self {
            kind: EncoderKind::Context { num_context },
            word_embedder,
            seq_embedder,
            pad,
            keep_prob,
        }
    }
}
