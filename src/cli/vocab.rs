//! CLI entry-point for building vocabulary mappings.

use anyhow::{Context, Result};
use tracing::{info, instrument};

use crate::{
    cli::{example_source, load_schema, resolve_paths},
    config::Settings,
    data::{dataset::ExampleSource, vocab::Mappings},
    negotiation::{generator::build_preprocessor, Arguments},
};

#[instrument(skip_all)]
pub fn run(mut args: Arguments, settings: Settings) -> Result<()> {
    resolve_paths(&mut args, &settings);
    let schema = load_schema(&args)?;
    let source = example_source(&args, &schema)?;
    let dataset = source.read_dataset(&args.data.dataset)?;
    let preprocessor = build_preprocessor(&args.data, &args.model, &schema)?;
    let dialogues = preprocessor.preprocess(&dataset.train_examples)?;

    let forms = [
        preprocessor.entity_encoding_form,
        preprocessor.entity_decoding_form,
        preprocessor.entity_target_form,
    ];
    let mappings = Mappings::build(&dialogues, &schema, &forms);
    let path = args
        .data
        .preprocess
        .mappings
        .as_deref()
        .context("no mappings path")?;
    mappings.save(path)?;
    info!(dialogues = dialogues.len(), path = %path.display(), "vocabulary ready");
    Ok(())
}
