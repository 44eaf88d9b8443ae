//! Crawline Filter - advisory document filters over JSONL streams
//!
//! Annotates each document with a `filter` verdict (`keep` or the name of
//! the first criterion it fails). Verdicts are advisory: every document is
//! re-emitted, enforcement belongs to downstream consumers.

pub mod config;
pub mod filters;
pub mod runner;

pub use config::Config;
pub use runner::{FilterSummary, run};
