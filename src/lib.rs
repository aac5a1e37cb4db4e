//! milestat - Track mileage and pay events with rolling period aggregates
//!
//! This library provides functionality to:
//! - Record trips (odometer readings, pay, optional company) in a durable store
//! - Maintain daily, weekly, monthly and yearly totals incrementally
//! - Reconcile those totals when an event is deleted
//! - Keep separate aggregates for registered companies
//!
//! # Examples
//!
//! ```
//! use milestat::ledger::Ledger;
//! use milestat_core::{Granularity, Money, NewEvent, WeekStart};
//! use milestat_store_memory::MemoryStore;
//! use chrono::NaiveDate;
//!
//! #[tokio::main]
//! async fn main() -> milestat::Result<()> {
//!     let ledger = Ledger::open(MemoryStore::new(), WeekStart::Sunday).await?;
//!
//!     ledger.record_event(NewEvent {
//!         start_odometer: 100,
//!         end_odometer: 150,
//!         pay: "50".parse()?,
//!         company: None,
//!         occurred_at: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
//!     }).await?;
//!
//!     let summary = ledger.summary(None).await?;
//!     assert_eq!(summary[0].granularity, Granularity::Daily);
//!     assert_eq!(summary[0].total_pay, Money::from_cents(5000));
//!     Ok(())
//! }
//! ```

pub mod aggregation;
pub mod cli;
pub mod config;
pub mod ledger;
pub mod reconciliation;

// Re-export commonly used types
pub use aggregation::{AggregationEngine, RecomputeOutcome, RecomputeReport};
pub use ledger::Ledger;
pub use milestat_core::{MilestatError, Result};
pub use reconciliation::{ReconcileReport, ReconciliationEngine};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
