//! Word embedding tables.

use ndarray::Array2;
use serde::Serialize;

use crate::{
    error::ConfigError,
    model::graph::{GraphContext, Variable},
};

/// Embedding lookup table for one vocabulary. The pad row is all zeros.
#[derive(Debug, Clone, Serialize)]
pub struct WordEmbedder {
    pub vocab_size: usize,
    pub embed_size: usize,
    pub pad: usize,
    pub embedding: Variable,
}

impl WordEmbedder {
    /// Create the `embedding` parameter in the current scope of `ctx`,
    /// copying `pretrained` when given.
    pub fn new(
        ctx: &mut GraphContext,
        vocab_size: usize,
        embed_size: usize,
        pretrained: Option<&Array2<f32>>,
        pad: usize,
    ) -> Result<Self, ConfigError> {
        let shape = [vocab_size, embed_size];
        let embedding = match pretrained {
            Some(init) => ctx.variable_from("embedding", shape, init)?,
            None => ctx.variable("embedding", shape)?,
        };
        if pad < vocab_size {
            if let Some(table) = ctx.get_mut(&embedding) {
                table.row_mut(pad).fill(0.0);
            }
        }
        Ok(Self {
            vocab_size,
            embed_size,
            pad,
            embedding,
        })
    }
}
