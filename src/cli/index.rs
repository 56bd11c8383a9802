//! CLI entry-point for building the retrieval index.

use anyhow::{Context, Result};
use tracing::{info, instrument};

use crate::{
    cli::{example_source, load_schema, resolve_paths},
    config::Settings,
    data::{dataset::ExampleSource, retriever::Retriever},
    negotiation::Arguments,
};

#[instrument(skip_all)]
pub fn run(mut args: Arguments, settings: Settings) -> Result<()> {
    resolve_paths(&mut args, &settings);
    let schema = load_schema(&args)?;
    let source = example_source(&args, &schema)?;
    let dataset = source.read_dataset(&args.data.dataset)?;
    let path = args.data.retriever.index.as_deref().context("no index path")?;
    let entries = Retriever::build_index(
        &dataset.train_examples,
        args.data.retriever.retriever_context_len,
        path,
    )?;
    info!(entries, path = %path.display(), "retrieval index ready");
    Ok(())
}
