//! Model components and the composed model graph.

pub mod context_embedder;
pub mod decoder;
pub mod encdec;
pub mod encoder;
pub mod graph;
pub mod price_predictor;
pub mod ranker;
pub mod sampler;
pub mod sequence_embedder;
pub mod word_embedder;

use clap::Args as ClapArgs;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use self::{
    context_embedder::ContextEmbedderArgs,
    decoder::Decoder,
    encdec::{BasicModelArgs, EncDecArgs, EncoderDecoder, LanguageModel},
    price_predictor::PricePredictorArgs,
    ranker::{CheatRanker, IrRanker, RankerArgs},
    sequence_embedder::SequenceEmbedderArgs,
};

/// Hyperparameters of every model component.
#[derive(Debug, Clone, ClapArgs, Serialize, Deserialize)]
pub struct ModelArgs {
    #[command(flatten)]
    pub basic: BasicModelArgs,
    #[command(flatten)]
    pub encdec: EncDecArgs,
    #[command(flatten)]
    pub sequence_embedder: SequenceEmbedderArgs,
    #[command(flatten)]
    pub price_predictor: PricePredictorArgs,
    #[command(flatten)]
    pub context_embedder: ContextEmbedderArgs,
    #[command(flatten)]
    pub ranker: RankerArgs,
}

/// Fully composed model.
#[derive(Debug)]
pub enum Model {
    EncoderDecoder(EncoderDecoder),
    LanguageModel(LanguageModel),
    CheatRanker(CheatRanker),
    IrRanker(IrRanker),
    /// Scores candidates by likelihood under `model` at `temperature`.
    EncDecRanker { model: Box<Model>, temperature: f64 },
    /// Scores slot-filled candidates with `model`.
    SlotFillingRanker { model: Box<Model> },
}

impl Model {
    pub fn name(&self) -> &'static str {
        match self {
            Self::EncoderDecoder(_) => "encdec",
            Self::LanguageModel(_) => "lm",
            Self::CheatRanker(_) => "cheat",
            Self::IrRanker(_) => "ir",
            Self::EncDecRanker { .. } => "encdec_ranker",
            Self::SlotFillingRanker { .. } => "sf_ranker",
        }
    }

    /// The model wrapped by a learned ranker.
    pub fn inner(&self) -> Option<&Model> {
        match self {
            Self::EncDecRanker { model, .. } | Self::SlotFillingRanker { model } => Some(model.as_ref()),
            _ => None,
        }
    }

    /// Outermost decoder stage, if the model has one.
    pub fn decoder(&self) -> Option<&dyn Decoder> {
        match self {
            Self::EncoderDecoder(m) => Some(m.decoder.as_ref()),
            Self::LanguageModel(m) => Some(m.decoder.as_ref()),
            Self::CheatRanker(_) | Self::IrRanker(_) => None,
            Self::EncDecRanker { model, .. } | Self::SlotFillingRanker { model } => model.decoder(),
        }
    }

    pub fn summary(&self) -> Value {
        match self {
            Self::EncoderDecoder(m) => m.summary(),
            Self::LanguageModel(m) => m.summary(),
            Self::CheatRanker(_) | Self::IrRanker(_) => json!({ "type": self.name() }),
            Self::EncDecRanker { model, temperature } => json!({
                "type": self.name(),
                "temperature": temperature,
                "model": model.summary(),
            }),
            Self::SlotFillingRanker { model } => json!({
                "type": self.name(),
                "model": model.summary(),
            }),
        }
    }
}
