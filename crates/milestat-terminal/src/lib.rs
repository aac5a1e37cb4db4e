//! Terminal output formatting for milestat
//!
//! This crate provides table and JSON output formatters for events,
//! aggregate buckets, summaries, and the company registry.

pub mod output;

pub use output::{JsonFormatter, OutputFormatter, TableFormatter, get_formatter};
