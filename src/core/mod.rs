// src/core/mod.rs
mod aggregator;
mod documents;
mod engine;
mod export;
mod llm;
mod model;
mod plugins;
mod render;
mod retry;
mod routes;
mod scan;
mod schema;

pub use aggregator::AnalysisInput;
pub use engine::{Engine, RunOptions};
