//! Negotiation task wiring: options, data generator factory and model builder.

pub mod args;
pub mod builder;
pub mod generator;

pub use args::{add_data_generator_arguments, add_model_arguments, Arguments};
pub use builder::{build_model, check_model_args};
pub use generator::get_data_generator;
