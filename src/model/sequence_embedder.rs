//! Sequence embedders mapping token embeddings to sequence representations.

use clap::{Args as ClapArgs, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::model::graph::KeepProb;

/// Options for the convolutional sequence embedder.
#[derive(Debug, Clone, ClapArgs, Serialize, Deserialize)]
pub struct SequenceEmbedderArgs {
    /// Convolution widths of the cnn embedder.
    #[arg(long, value_delimiter = ',', default_value = "2,3,4")]
    pub cnn_filter_sizes: Vec<usize>,
    /// Filters per width of the cnn embedder.
    #[arg(long, default_value_t = 8)]
    pub cnn_num_filters: usize,
}

/// Kind of sequence embedder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedderType {
    Rnn,
    Bow,
    Cnn,
}

/// Recurrent cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RnnType {
    Lstm,
    Gru,
}

/// Everything a sequence embedder constructor may consume.
#[derive(Debug, Clone)]
pub struct SequenceEmbedderOptions {
    pub vocab_size: usize,
    pub embed_size: usize,
    pub rnn_size: usize,
    pub rnn_type: RnnType,
    pub num_layers: usize,
    pub keep_prob: KeepProb,
    pub cnn_filter_sizes: Vec<usize>,
    pub cnn_num_filters: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SequenceEmbedder {
    Rnn {
        rnn_type: RnnType,
        rnn_size: usize,
        num_layers: usize,
        keep_prob: KeepProb,
    },
    Bow {
        vocab_size: usize,
        embed_size: usize,
    },
    Cnn {
        filter_sizes: Vec<usize>,
        num_filters: usize,
        keep_prob: KeepProb,
    },
}

impl SequenceEmbedder {
    /// Width of the sequence representation.
    pub fn output_size(&self) -> usize {
        match self {
            Self::Rnn { rnn_size, .. } => *rnn_size,
            Self::Bow { embed_size, .. } => *embed_size,
            Self::Cnn {
                filter_sizes,
                num_filters,
                ..
            } => filter_sizes.len() * num_filters,
        }
    }
}

pub fn get_sequence_embedder(kind: EmbedderType, opts: &SequenceEmbedderOptions) -> SequenceEmbedder {
    match kind {
        EmbedderType::Rnn => SequenceEmbedder::Rnn {
            rnn_type: opts.rnn_type,
            rnn_size: opts.rnn_size,
            num_layers: opts.num_layers,
            keep_prob: opts.keep_prob,
        },
        EmbedderType::Bow => SequenceEmbedder::Bow {
            vocab_size: opts.vocab_size,
            embed_size: opts.embed_size,
        },
        EmbedderType::Cnn => SequenceEmbedder::Cnn {
            filter_sizes: opts.cnn_filter_sizes.clone(),
            num_filters: opts.cnn_num_filters,
            keep_prob: opts.keep_prob,
        },
    }
}
