//! CLI entry-point for validating model flags.

use anyhow::Result;
use tracing::{info, instrument};

use crate::{
    config::Settings,
    negotiation::{check_model_args, Arguments},
};

#[instrument(skip_all)]
pub fn run(args: Arguments, _settings: Settings) -> Result<()> {
    check_model_args(&args)?;
    info!(model = ?args.model.basic.model, ranker = ?args.model.ranker.ranker, "model arguments are consistent");
    Ok(())
}
