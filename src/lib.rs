pub mod apis;
pub mod config;
pub mod constants;
pub mod error;
pub mod merge;
pub mod normalize;
pub mod pipeline;
pub mod snapshot;
pub mod types;

pub mod ingestion;
pub mod observability;

// Layered boundaries for application ports and infrastructure adapters
pub mod app;
pub mod infra;
