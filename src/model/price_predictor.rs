//! Feed-forward price prediction head used by price-aware decoders.

use clap::Args as ClapArgs;
use serde::{Deserialize, Serialize};

use crate::{
    error::ConfigError,
    model::graph::{GraphContext, Variable},
};

/// Options for the price predictor.
#[derive(Debug, Clone, ClapArgs, Serialize, Deserialize)]
pub struct PricePredictorArgs {
    /// Hidden layer size of the price predictor.
    #[arg(long, default_value_t = 20)]
    pub price_predictor_hidden_size: usize,
    /// Number of past prices of each agent fed to the predictor.
    #[arg(long, default_value_t = 1)]
    pub price_hist_len: usize,
}

impl PricePredictorArgs {
    /// Current price plus both agents' histories.
    pub fn input_size(&self) -> usize {
        1 + 2 * self.price_hist_len
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PricePredictor {
    pub hidden_size: usize,
    pub input_size: usize,
    pub hidden: Variable,
    pub output: Variable,
}

impl PricePredictor {
    pub fn new(ctx: &mut GraphContext, hidden_size: usize, input_size: usize) -> Result<Self, ConfigError> {
        ctx.scoped("PricePredictor", |ctx| {
            let hidden = ctx.variable("hidden", [input_size, hidden_size])?;
            let output = ctx.variable("output", [hidden_size, 1])?;
            Ok(Self {
                hidden_size,
                input_size,
                hidden,
                output,
            })
        })
    }
}
