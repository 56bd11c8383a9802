//! Decoders and the decorator stages that wrap them.

use std::fmt;

use serde::Serialize;
use serde_json::{json, Value};

use crate::{
    error::ConfigError,
    model::{
        context_embedder::ContextEmbedder,
        encdec::{AttentionMemory, ContextField},
        graph::{GraphContext, KeepProb, Variable},
        price_predictor::PricePredictor,
        sampler::Sampler,
        sequence_embedder::SequenceEmbedder,
        word_embedder::WordEmbedder,
    },
};

/// Capability shared by base decoders and the stages wrapping them.
pub trait Decoder: fmt::Debug {
    fn name(&self) -> &'static str;

    /// The wrapped decoder, for decorator stages.
    fn inner(&self) -> Option<&dyn Decoder> {
        None
    }

    /// Embedding, recurrent core and output layer shared by every stage.
    fn core(&self) -> &DecoderCore;

    fn summary(&self) -> Value;
}

/// Stage names from the outermost wrapper down to the base decoder.
pub fn decoder_stack(decoder: &dyn Decoder) -> Vec<&'static str> {
    let mut names = Vec::new();
    let mut current = Some(decoder);
    while let Some(stage) = current {
        names.push(stage.name());
        current = stage.inner();
    }
    names
}

fn to_json<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

#[derive(Debug, Clone, Serialize)]
pub struct DecoderCore {
    pub word_embedder: WordEmbedder,
    pub seq_embedder: SequenceEmbedder,
    pub pad: usize,
    pub keep_prob: KeepProb,
    pub vocab_size: usize,
    pub sampler: Sampler,
    pub sampled_loss: bool,
    pub tied: bool,
    /// Absent when the output layer is tied to the word embedding.
    pub output_projection: Option<Variable>,
}

impl DecoderCore {
    /// Output projection `[hidden, vocab]` under scope `Decoder`, unless tied.
    pub fn output_projection(
        ctx: &mut GraphContext,
        hidden: usize,
        vocab_size: usize,
        tied: bool,
    ) -> Result<Option<Variable>, ConfigError> {
        if tied {
            return Ok(None);
        }
        ctx.scoped("Decoder", |ctx| ctx.variable("output_projection", [hidden, vocab_size]))
            .map(Some)
    }
}

/// Recurrent decoder conditioned only on its input sequence.
#[derive(Debug)]
pub struct BasicDecoder {
    pub core: DecoderCore,
}

impl Decoder for BasicDecoder {
    fn name(&self) -> &'static str {
        "basic"
    }

    fn core(&self) -> &DecoderCore {
        &self.core
    }

    fn summary(&self) -> Value {
        json!({ "type": self.name(), "core": to_json(&self.core) })
    }
}

/// Recurrent decoder that also reads the embedded listing fields.
#[derive(Debug)]
pub struct ContextDecoder {
    pub core: DecoderCore,
    pub context_embedder: ContextEmbedder,
    pub context: Vec<ContextField>,
}

impl Decoder for ContextDecoder {
    fn name(&self) -> &'static str {
        "context"
    }

    fn core(&self) -> &DecoderCore {
        &self.core
    }

    fn summary(&self) -> Value {
        json!({
            "type": self.name(),
            "core": to_json(&self.core),
            "context": to_json(&self.context),
            "context_embedder": to_json(&self.context_embedder),
            "context_width": self.context_embedder.output_size(),
        })
    }
}

/// Decoder attending over encoder states and/or listing fields.
#[derive(Debug)]
pub struct AttentionDecoder {
    pub core: DecoderCore,
    pub context_embedder: Option<ContextEmbedder>,
    pub attention_memory: Vec<AttentionMemory>,
}

impl AttentionDecoder {
    pub fn new(
        core: DecoderCore,
        context_embedder: Option<ContextEmbedder>,
        attention_memory: Vec<AttentionMemory>,
    ) -> Result<Self, ConfigError> {
        if context_embedder.is_none() {
            if let Some(field) = attention_memory.iter().find(|m| m.is_listing_field()) {
                return Err(ConfigError::AttentionMemoryWithoutContext(field.to_string()));
            }
        }
        Ok(Self {
            core,
            context_embedder,
            attention_memory,
        })
    }
}

impl Decoder for AttentionDecoder {
    fn name(&self) -> &'static str {
        "attention"
    }

    fn core(&self) -> &DecoderCore {
        &self.core
    }

    fn summary(&self) -> Value {
        json!({
            "type": self.name(),
            "core": to_json(&self.core),
            "attention_memory": to_json(&self.attention_memory),
            "context_embedder": to_json(&self.context_embedder),
        })
    }
}

/// Adds a price prediction head on top of another decoder.
#[derive(Debug)]
pub struct PriceDecoder {
    pub inner: Box<dyn Decoder>,
    pub price_predictor: PricePredictor,
}

impl Decoder for PriceDecoder {
    fn name(&self) -> &'static str {
        "price"
    }

    fn inner(&self) -> Option<&dyn Decoder> {
        Some(self.inner.as_ref())
    }

    fn core(&self) -> &DecoderCore {
        self.inner.core()
    }

    fn summary(&self) -> Value {
        json!({
            "type": self.name(),
            "price_predictor": to_json(&self.price_predictor),
            "inner": self.inner.summary(),
        })
    }
}

/// Restricts generation to filling listing slots.
#[derive(Debug)]
pub struct SlotFillingDecoder {
    pub inner: Box<dyn Decoder>,
}

impl Decoder for SlotFillingDecoder {
    fn name(&self) -> &'static str {
        "slot_filling"
    }

    fn inner(&self) -> Option<&dyn Decoder> {
        Some(self.inner.as_ref())
    }

    fn core(&self) -> &DecoderCore {
        self.inner.core()
    }

    fn summary(&self) -> Value {
        json!({ "type": self.name(), "inner": self.inner.summary() })
    }
}
