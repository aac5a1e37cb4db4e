//! Core types, traits, and utilities for milestat
//!
//! This crate provides the domain types (events, buckets, namespaces),
//! the calendar rules that map a date to its aggregation period, the
//! store traits implemented by every backend, error handling, and
//! timezone configuration shared by all other milestat crates.

pub mod error;
pub mod period;
pub mod store;
pub mod timezone;
pub mod types;

// Re-export commonly used types
pub use error::{MilestatError, Result};
pub use store::{AggregateStore, CompanyDirectory, EventStore, LedgerStore};
pub use types::{
    AggregateBucket, BucketKey, CompanyName, Event, EventId, Granularity, Money, Namespace,
    NewEvent, Period, TotalsMatch, WeekStart,
};
