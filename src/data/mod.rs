//! Transcript ingestion, preprocessing and batch generation.

pub mod dataset;
pub mod dialogue;
pub mod generator;
pub mod markers;
pub mod preprocess;
pub mod retriever;
pub mod scenario;
pub mod vocab;
