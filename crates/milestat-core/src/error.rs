//! Error types for milestat
//!
//! This module defines the error types used throughout the milestat crates.
//! All errors are derived from `thiserror` for convenient error handling
//! and automatic `From` implementations.
//!
//! Every variant that concerns a stored row carries its identifying key
//! (event id or bucket key) so failures can be diagnosed from the message.
//!
//! # Example
//!
//! ```
//! use milestat_core::error::{MilestatError, Result};
//! use milestat_core::types::EventId;
//!
//! fn load(id: EventId) -> Result<()> {
//!     Err(MilestatError::EventNotFound(id))
//! }
//!
//! assert_eq!(load(EventId::new(7)).unwrap_err().to_string(), "Event not found: #7");
//! ```

use std::fmt;
use thiserror::Error;

use crate::types::{BucketKey, EventId, Namespace, WeekStart};

/// Main error type for milestat operations
#[derive(Error, Debug)]
pub enum MilestatError {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A storage collaborator failed (connection, constraint violation, ...)
    #[error("Storage error during {operation}: {message}")]
    Storage {
        /// The store operation that failed
        operation: String,
        /// The backend's error message
        message: String,
    },

    /// No event with this id exists
    #[error("Event not found: {0}")]
    EventNotFound(EventId),

    /// No bucket with this key exists
    #[error("Bucket not found: {0}")]
    BucketNotFound(BucketKey),

    /// A deleted event had no bucket covering its date
    #[error("No bucket in {namespace} covered deleted event {event}")]
    Consistency {
        /// The deleted event
        event: EventId,
        /// The namespace that had no matching bucket
        namespace: Namespace,
    },

    /// A reconciliation pipeline stopped part way through
    #[error("Reconciliation of event {event} failed at {stage}: {source}")]
    Reconciliation {
        /// The event being reconciled
        event: EventId,
        /// The step that failed; earlier steps have been applied
        stage: ReconcileStage,
        /// The underlying failure
        #[source]
        source: Box<MilestatError>,
    },

    /// Summed event totals do not fit a bucket
    #[error("Totals overflow in bucket {0}")]
    TotalsOverflow(BucketKey),

    /// Event input failed validation
    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    /// Money amount could not be parsed
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Invalid date format
    #[error("Invalid date format: {0}")]
    InvalidDate(String),

    /// Company is not registered
    #[error("Unknown company: {0}")]
    UnknownCompany(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl MilestatError {
    /// Build a storage error for `operation` from any displayable backend error
    pub fn storage(operation: impl Into<String>, err: impl fmt::Display) -> Self {
        Self::Storage {
            operation: operation.into(),
            message: err.to_string(),
        }
    }

    /// The store already holds weekly buckets cut with another week start
    pub fn week_start_conflict(stored: WeekStart, requested: WeekStart) -> Self {
        Self::Config(format!(
            "store was created with weeks starting on {stored}, cannot use {requested}"
        ))
    }

    /// Whether the error means the addressed row does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::EventNotFound(_) | Self::BucketNotFound(_))
    }
}

/// Steps of the deletion reconciliation pipeline, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileStage {
    /// Removing the raw event row
    DeleteEvent,
    /// Deleting buckets that held only the deleted event
    PurgeExactMatches,
    /// Subtracting the event from overlapping buckets
    Decrement,
    /// Deleting buckets left with no distance and no pay
    PurgeExhausted,
}

impl fmt::Display for ReconcileStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeleteEvent => write!(f, "delete-event"),
            Self::PurgeExactMatches => write!(f, "purge-exact-matches"),
            Self::Decrement => write!(f, "decrement"),
            Self::PurgeExhausted => write!(f, "purge-exhausted"),
        }
    }
}

/// Convenience type alias for Results in milestat
///
/// # Example
///
/// ```
/// use milestat_core::Result;
///
/// fn process_data() -> Result<String> {
///     Ok("Processed successfully".to_string())
/// }
/// ```
pub type Result<T> = std::result::Result<T, MilestatError>;
