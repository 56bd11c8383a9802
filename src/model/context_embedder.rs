//! Embeds the listing (title, description) and its category.

use clap::{Args as ClapArgs, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::model::{
    sequence_embedder::{EmbedderType, SequenceEmbedder},
    word_embedder::WordEmbedder,
};

/// Options for the listing context embedder.
#[derive(Debug, Clone, ClapArgs, Serialize, Deserialize)]
pub struct ContextEmbedderArgs {
    /// Sequence embedder applied to listing text.
    #[arg(long, value_enum, default_value = "bow")]
    pub context_encoder: ContextEncoderType,
    /// Embedding size of listing words.
    #[arg(long, default_value_t = 20)]
    pub context_size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextEncoderType {
    Bow,
    Rnn,
}

impl From<ContextEncoderType> for EmbedderType {
    fn from(value: ContextEncoderType) -> Self {
        match value {
            ContextEncoderType::Bow => EmbedderType::Bow,
            ContextEncoderType::Rnn => EmbedderType::Rnn,
        }
    }
}

/// Size of the category embeddings.
pub const CATEGORY_EMBED_SIZE: usize = 10;

#[derive(Debug, Clone, Serialize)]
pub struct ContextEmbedder {
    pub num_categories: usize,
    pub context_word_embedder: WordEmbedder,
    pub category_word_embedder: WordEmbedder,
    pub seq_embedder: SequenceEmbedder,
    pub pad: usize,
}

impl ContextEmbedder {
    pub fn new(
        num_categories: usize,
        context_word_embedder: WordEmbedder,
        category_word_embedder: WordEmbedder,
        seq_embedder: SequenceEmbedder,
        pad: usize,
    ) -> Self {
        Self {
            num_categories,
            context_word_embedder,
            category_word_embedder,
            seq_embedder,
            pad,
        }
    }

    /// Width of the listing plus category representation.
    pub fn output_size(&self) -> usize {
        self.seq_embedder.output_size() + self.category_word_embedder.embed_size
    }
}
