//! CLI entry-point for building batches and reporting their sizes.

use anyhow::Result;
use rand::{rngs::StdRng, SeedableRng};
use tracing::{debug, info, instrument};

use crate::{
    cli::{example_source, load_mappings, load_schema, resolve_paths},
    config::Settings,
    data::generator::Split,
    negotiation::{get_data_generator, Arguments},
};

#[instrument(skip_all)]
pub fn run(mut args: Arguments, settings: Settings) -> Result<()> {
    resolve_paths(&mut args, &settings);
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
    for split in Split::ALL {
        info!(
            kind = generator.kind(),
            %split,
            batches = generator.num_batches(split),
            examples = generator.num_examples(split),
            "batches"
        );
    }
    let mut rng = StdRng::seed_from_u64(args.run.random_seed);
    let order = generator.shuffled(Split::Train, &mut rng);
    debug!(first = ?order.first().map(|b| &b.uuids), "shuffled training batches");
    Ok(())
}
