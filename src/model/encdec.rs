//! Encoder-decoder and language-model options and top-level models.

use std::{fmt, path::PathBuf};

use clap::{Args as ClapArgs, ValueEnum};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::model::{
    decoder::Decoder,
    encoder::Encoder,
    graph::KeepProb,
    sampler::Decoding,
    sequence_embedder::{EmbedderType, RnnType},
};

/// Architecture-independent model options.
#[derive(Debug, Clone, ClapArgs, Serialize, Deserialize)]
pub struct BasicModelArgs {
    /// Model architecture.
    #[arg(long, value_enum)]
    pub model: Option<ModelType>,
    /// Hidden size of recurrent layers.
    #[arg(long, default_value_t = 20)]
    pub rnn_size: usize,
    /// Recurrent cell type.
    #[arg(long, value_enum, default_value = "lstm")]
    pub rnn_type: RnnType,
    /// Number of recurrent layers.
    #[arg(long, default_value_t = 1)]
    pub num_layers: usize,
    /// Word embedding size.
    #[arg(long, default_value_t = 20)]
    pub word_embed_size: usize,
    /// Pretrained word vectors (one `word v1 .. vd` row per line).
    #[arg(long)]
    pub pretrained_wordvec: Option<PathBuf>,
    /// Dropout rate.
    #[arg(long, default_value_t = 0.0)]
    pub dropout: f64,
    /// Sequence embedder of the encoder.
    #[arg(long, value_enum, default_value = "rnn")]
    pub encoder: EmbedderType,
    /// Decoder architecture.
    #[arg(long, value_enum, default_value = "rnn")]
    pub decoder: DecoderType,
    /// Decoding method, `sample:<temperature>`.
    #[arg(long, default_value = "sample:0")]
    pub decoding: Decoding,
    /// Use sampled softmax loss.
    #[arg(long)]
    pub sampled_loss: bool,
    /// Tie output projection to the word embedding.
    #[arg(long)]
    pub tied: bool,
}

/// Negotiation-specific encoder-decoder options.
#[derive(Debug, Clone, ClapArgs, Serialize, Deserialize)]
pub struct EncDecArgs {
    /// Memory attended by the rnn-attn decoder.
    #[arg(long, value_enum, num_args = 0.., value_delimiter = ',')]
    pub attention_memory: Vec<AttentionMemory>,
    /// Number of previous turns fed to the encoder.
    #[arg(long, default_value_t = 0)]
    pub num_context: usize,
    /// Carry the decoder state across turns.
    #[arg(long)]
    pub stateful: bool,
    /// Listing fields embedded as context.
    #[arg(long, value_enum, num_args = 0.., value_delimiter = ',')]
    pub context: Vec<ContextField>,
    /// Generate templates whose slots are filled from the listing.
    #[arg(long)]
    pub slot_filling: bool,
    /// Predict prices alongside words.
    #[arg(long)]
    pub predict_price: bool,
}

impl EncDecArgs {
    pub fn context_enabled(&self) -> bool {
        !self.context.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelType {
    Encdec,
    Lm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DecoderType {
    Rnn,
    RnnAttn,
}

impl From<DecoderType> for EmbedderType {
    fn from(_: DecoderType) -> Self {
        EmbedderType::Rnn
    }
}

/// Listing field usable as context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextField {
    Title,
    Description,
}

/// Source attended over by the attention decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttentionMemory {
    Encoder,
    Title,
    Description,
}

impl AttentionMemory {
    pub fn is_listing_field(&self) -> bool {
        matches!(self, Self::Title | Self::Description)
    }
}

impl fmt::Display for AttentionMemory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Encoder => "encoder",
            Self::Title => "title",
            Self::Description => "description",
        })
    }
}

/// Encoder over the dialogue history feeding a decoder.
#[derive(Debug)]
pub struct EncoderDecoder {
    pub encoder: Encoder,
    pub decoder: Box<dyn Decoder>,
    pub pad: usize,
    pub keep_prob: KeepProb,
    pub stateful: bool,
}

impl EncoderDecoder {
    pub fn new(
        encoder: Encoder,
        decoder: Box<dyn Decoder>,
        pad: usize,
        keep_prob: KeepProb,
        stateful: bool,
    ) -> Self {
        Self {
            encoder,
            decoder,
            pad,
            keep_prob,
            stateful,
        }
    }

    pub fn summary(&self) -> Value {
        json!({
            "type": "encdec",
            "stateful": self.stateful,
            "encoder": serde_json::to_value(&self.encoder).unwrap_or(Value::Null),
            "decoder": self.decoder.summary(),
        })
    }
}

/// A decoder trained as a language model over whole dialogues.
#[derive(Debug)]
pub struct LanguageModel {
    pub decoder: Box<dyn Decoder>,
    pub pad: usize,
}

impl LanguageModel {
    pub fn new(decoder: Box<dyn Decoder>, pad: usize) -> Self {
        Self { decoder, pad }
    }

    pub fn summary(&self) -> Value {
        json!({ "type": "lm", "decoder": self.decoder.summary() })
    }
}
