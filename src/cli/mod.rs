//! Command-line interface wiring for negotiator.

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use crate::{
    config::Settings,
    data::{
        dataset::JsonExampleSource,
        scenario::{ScenarioDb, Schema},
        vocab::Mappings,
    },
    negotiation::Arguments,
};

pub mod batches;
pub mod build;
pub mod check;
pub mod index;
pub mod vocab;

/// Top-level CLI definition.
#[derive(Debug, Parser)]
#[command(author, version, about = "Negotiation dialogue model assembly", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Parse CLI arguments from the environment.
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    /// Dispatch the selected sub-command.
    pub fn dispatch(self, settings: Settings) -> Result<()> {
        match self.command {
            Commands::Check(args) => check::run(args, settings),
            Commands::Vocab(args) => vocab::run(args, settings),
            Commands::Index(args) => index::run(args, settings),
            Commands::Batches(args) => batches::run(args, settings),
            Commands::Build(args) => build::run(args, settings),
        }
    }
}

/// Supported sub-commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Validate model flags.
    Check(Arguments),
    /// Build vocabulary mappings from the training split.
    Vocab(Arguments),
    /// Build the retrieval index from the training split.
    Index(Arguments),
    /// Build batches and report their counts.
    Batches(Arguments),
    /// Validate, batch and assemble the model graph.
    Build(Arguments),
}

/// Fill paths left unset on the command line from `settings`.
pub(crate) fn resolve_paths(args: &mut Arguments, settings: &Settings) {
    if args.data.retriever.index.is_none() {
        args.data.retriever.index = Some(settings.join_data("index.json"));
    }
    if args.data.preprocess.mappings.is_none() {
        args.data.preprocess.mappings = Some(settings.join_output("mappings.json"));
    }
}

pub(crate) fn load_schema(args: &Arguments) -> Result<Schema> {
    let Some(path) = &args.data.scenario.schema_path else {
        bail!("--schema-path is required");
    };
    Schema::from_path(path)
}

pub(crate) fn example_source(args: &Arguments, schema: &Schema) -> Result<JsonExampleSource> {
    let scenario_db = match &args.data.scenario.scenarios_path {
        Some(path) => Some(ScenarioDb::from_path(schema, path)?),
        None => None,
    };
    Ok(JsonExampleSource::new(scenario_db))
}

pub(crate) fn load_mappings(args: &Arguments) -> Result<Mappings> {
    let Some(path) = &args.data.preprocess.mappings else {
        bail!("--mappings is required");
    };
    let mappings = Mappings::load(path)?;
    info!(path = %path.display(), vocab = mappings.vocab.size(), "loaded mappings");
    Ok(mappings)
}
