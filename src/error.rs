//! Configuration error types raised while validating flags and assembling models.

use std::path::PathBuf;

/// Inconsistent or unsupported configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("pretrained word vectors have dimension {found} but --word-embed-size is {expected}")]
    EmbeddingSizeMismatch { expected: usize, found: usize },

    #[error("pretrained word vectors have dimension {found} but --context-size is {expected} (bow context encoder)")]
    ContextSizeMismatch { expected: usize, found: usize },

    #[error("word vector file {0} has an empty first line")]
    MalformedWordVectors(PathBuf),

    #[error("slot filling in test mode requires --batch-size 1 (got {0})")]
    SlotFillingBatchSize(usize),

    #[error("decoder rnn-attn requires at least one --attention-memory source")]
    MissingAttentionMemory,

    #[error("attention memory {0} needs a context embedder; pass --context")]
    AttentionMemoryWithoutContext(String),

    #[error("--num-context {0} cannot be combined with --stateful")]
    StatefulWithContext(usize),

    #[error("invalid temperature: {0} (must be >= 0)")]
    NegativeTemperature(f64),

    #[error("unknown decoding method: {0} (must be sample:<temperature>)")]
    UnknownDecoding(String),

    #[error("no model configured; pass --model or a ranker that does not need one")]
    MissingModel,

    #[error("parameter {0} already exists in the graph")]
    DuplicateVariable(String),

    #[error("pretrained matrix for {name} has shape {found:?}, expected {expected:?}")]
    PretrainedShape {
        name: String,
        expected: [usize; 2],
        found: [usize; 2],
    },

    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
