//! Aggregated command-line options for the negotiation pipeline.

use clap::{Args as ClapArgs, Command, Parser};
use serde::{Deserialize, Serialize};

use crate::{
    data::{
        dataset::DatasetArgs, preprocess::PreprocessArgs, retriever::RetrieverArgs,
        scenario::ScenarioArgs,
    },
    lexicon::{price_tracker::PriceTrackerArgs, slot_detector::SlotDetectorArgs},
    model::ModelArgs,
};

/// Options owned by the data pipeline subsystems.
#[derive(Debug, Clone, ClapArgs, Serialize, Deserialize)]
pub struct DataGeneratorArgs {
    #[command(flatten)]
    pub scenario: ScenarioArgs,
    #[command(flatten)]
    pub preprocess: PreprocessArgs,
    #[command(flatten)]
    pub dataset: DatasetArgs,
    #[command(flatten)]
    pub retriever: RetrieverArgs,
    #[command(flatten)]
    pub price_tracker: PriceTrackerArgs,
    #[command(flatten)]
    pub slot_detector: SlotDetectorArgs,
}

/// Run mode and reproducibility switches.
#[derive(Debug, Clone, ClapArgs, Serialize, Deserialize)]
pub struct RunArgs {
    /// Evaluate on the test split.
    #[arg(long)]
    pub test: bool,
    /// Score candidates of evaluation examples.
    #[arg(long)]
    pub eval: bool,
    /// Examples per minibatch.
    #[arg(long, default_value_t = 16)]
    pub batch_size: usize,
    /// Seed of the graph and data shuffling.
    #[arg(long, default_value_t = 1)]
    pub random_seed: u64,
}

/// Every option understood by the pipeline.
#[derive(Debug, Clone, Parser, Serialize, Deserialize)]
#[command(name = "negotiator")]
pub struct Arguments {
    #[command(flatten)]
    pub data: DataGeneratorArgs,
    #[command(flatten)]
    pub run: RunArgs,
    #[command(flatten)]
    pub model: ModelArgs,
}

/// Register the data pipeline options on `cmd`.
pub fn add_data_generator_arguments(cmd: Command) -> Command {
    DataGeneratorArgs::augment_args(cmd)
}

/// Register the model construction options on `cmd`.
pub fn add_model_arguments(cmd: Command) -> Command {
    ModelArgs::augment_args(cmd)
}
