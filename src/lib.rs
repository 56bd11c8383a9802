//! Negotiation dialogue data pipeline and model assembly.

pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod lexicon;
pub mod logging;
pub mod model;
pub mod negotiation;

pub use error::ConfigError;
