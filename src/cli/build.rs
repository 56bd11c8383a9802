//! CLI entry-point for assembling the model graph.

use std::fs;

use anyhow::{Context, Result};
use tracing::{info, instrument};

use crate::{
    cli::{example_source, load_mappings, load_schema, resolve_paths},
    config::Settings,
    data::generator::Split,
    model::graph::GraphContext,
    negotiation::{build_model, check_model_args, get_data_generator, Arguments},
};

#[instrument(skip_all)]
pub fn run(mut args: Arguments, settings: Settings) -> Result<()> {
    resolve_paths(&mut args, &settings);
    check_model_args(&args)?;
    let schema = load_schema(&args)?;
    let mappings = load_mappings(&args)?;
    let source = example_source(&args, &schema)?;
    let generator = get_data_generator(
        &args.data,
        &args.run,
        &mut args.model,
        &mappings,
        &schema,
        &source,
    )?;
    let batches: usize = Split::ALL.iter().map(|s| generator.num_batches(*s)).sum();

    let mut ctx = GraphContext::new(args.run.random_seed);
    let model = build_model(&mappings, &args, &mut ctx)?;

    let graph_path = settings.join_output("model_graph.json");
    let summary = serde_json::json!({
        "model": model.summary(),
        "seed": ctx.seed(),
        "variables": ctx.variable_names().collect::<Vec<_>>(),
        "num_parameters": ctx.num_parameters(),
    });
    fs::write(&graph_path, serde_json::to_string_pretty(&summary)?)
        .with_context(|| format!("write {}", graph_path.display()))?;

    let args_path = settings.join_output("model_args.json");
    fs::write(&args_path, serde_json::to_string_pretty(&args.model)?)
        .with_context(|| format!("write {}", args_path.display()))?;

    info!(
        model = model.name(),
        batches,
        graph = %graph_path.display(),
        "model assembled"
    );
    Ok(())
}
