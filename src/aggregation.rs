//! Incremental aggregation of events into period buckets
//!
//! For a reference date and granularity the engine derives the period that
//! contains the date, re-sums every event of the namespace inside that
//! period, and writes the totals back through the store's idempotent upsert.
//! A bucket is first populated when its period holds exactly one event and
//! updated afterwards; the upsert keeps both paths correct even when the
//! store disagrees with that expectation.
//!
//! # Examples
//!
//! ```
//! use milestat::aggregation::{AggregationEngine, RecomputeOutcome};
//! use milestat_core::{EventStore, Granularity, Money, Namespace, NewEvent, WeekStart};
//! use milestat_store_memory::MemoryStore;
//! use chrono::NaiveDate;
//!
//! # async fn example() -> milestat::Result<()> {
//! let store = MemoryStore::new();
//! let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
//! store.insert_event(NewEvent {
//!     start_odometer: 100,
//!     end_odometer: 150,
//!     pay: Money::from_cents(5000),
//!     company: None,
//!     occurred_at: day,
//! }).await?;
//!
//! let engine = AggregationEngine::new(WeekStart::Sunday);
//! let outcome = engine.recompute(&store, &Namespace::Global, Granularity::Daily, day).await?;
//! assert!(matches!(outcome, RecomputeOutcome::Created(_)));
//! # Ok(())
//! # }
//! ```

use chrono::NaiveDate;
use milestat_core::period::Calendar;
use milestat_core::{
    AggregateBucket, AggregateStore, Event, EventStore, Granularity, MilestatError, Money,
    Namespace, Period, Result, WeekStart,
};
use tracing::{debug, info, warn};

/// What a single recompute did to its bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecomputeOutcome {
    /// The period holds no events with any distance or pay; nothing was written
    Skipped {
        period: Period,
    },
    /// First population of the bucket
    Created(AggregateBucket),
    /// Totals of an existing bucket were replaced
    Updated {
        bucket: AggregateBucket,
        /// The bucket as stored before the update, if there was one
        previous: Option<AggregateBucket>,
    },
}

impl RecomputeOutcome {
    /// The bucket as written, if anything was written
    pub fn bucket(&self) -> Option<&AggregateBucket> {
        match self {
            Self::Skipped { .. } => None,
            Self::Created(bucket) | Self::Updated { bucket, .. } => Some(bucket),
        }
    }
}

/// Per-granularity results of recomputing one namespace for one date
#[derive(Debug)]
pub struct RecomputeReport {
    pub namespace: Namespace,
    pub reference_date: NaiveDate,
    /// One entry per granularity, finest first
    pub results: Vec<(Granularity, Result<RecomputeOutcome>)>,
}

impl RecomputeReport {
    /// The result for one granularity
    pub fn result(&self, granularity: Granularity) -> Option<&Result<RecomputeOutcome>> {
        self.results
            .iter()
            .find(|(g, _)| *g == granularity)
            .map(|(_, result)| result)
    }

    /// The outcome for one granularity, if it succeeded
    pub fn outcome(&self, granularity: Granularity) -> Option<&RecomputeOutcome> {
        self.result(granularity).and_then(|result| result.as_ref().ok())
    }

    /// Granularities whose recompute failed
    pub fn failures(&self) -> impl Iterator<Item = (Granularity, &milestat_core::MilestatError)> {
        self.results
            .iter()
            .filter_map(|(g, result)| result.as_ref().err().map(|e| (*g, e)))
    }

    /// Whether every granularity succeeded
    pub fn is_complete(&self) -> bool {
        self.results.iter().all(|(_, result)| result.is_ok())
    }
}

/// Bucket derivation and insert-or-update over any event/aggregate store
#[derive(Debug, Clone, Copy, Default)]
pub struct AggregationEngine {
    calendar: Calendar,
}

impl AggregationEngine {
    /// Create an engine whose weekly buckets begin on `week_start`
    pub fn new(week_start: WeekStart) -> Self {
        Self {
            calendar: Calendar::new(week_start),
        }
    }

    /// The calendar used to derive bucket boundaries
    pub fn calendar(&self) -> &Calendar {
        &self.calendar
    }

    /// The period of `granularity` containing `date`
    pub fn period_for(&self, granularity: Granularity, date: NaiveDate) -> Period {
        self.calendar.period(granularity, date)
    }

    /// Recompute the bucket of `granularity` that contains `reference_date`
    pub async fn recompute<S>(
        &self,
        store: &S,
        namespace: &Namespace,
        granularity: Granularity,
        reference_date: NaiveDate,
    ) -> Result<RecomputeOutcome>
    where
        S: EventStore + AggregateStore + ?Sized,
    {
        let period = self.period_for(granularity, reference_date);
        let events = store
            .events_in_range(namespace, period.start, period.end)
            .await?;

        if events.is_empty() {
            debug!(%namespace, period = %period.label(), %granularity, "No events in period, skipping");
            return Ok(RecomputeOutcome::Skipped { period });
        }

        let (total_distance, total_pay) = sum_totals(&events).ok_or_else(|| {
            MilestatError::TotalsOverflow(self.calendar.bucket_key(
                namespace,
                granularity,
                reference_date,
            ))
        })?;
        let bucket = AggregateBucket::new(namespace.clone(), period, total_distance, total_pay);
        let previous = store.get_bucket(&bucket.key()).await?;

        if bucket.is_exhausted() {
            // zero-distance, zero-pay events never leave a bucket behind
            if previous.is_some() {
                store.delete_bucket(&bucket.key()).await?;
            }
            debug!(key = %bucket.key(), "Period totals are empty, no bucket kept");
            return Ok(RecomputeOutcome::Skipped { period });
        }

        store.upsert_bucket(&bucket).await?;

        if events.len() == 1 {
            match &previous {
                Some(existing) if existing != &bucket => warn!(
                    key = %bucket.key(),
                    "Bucket already existed for its first event, replaced its totals"
                ),
                Some(_) => debug!(key = %bucket.key(), "Bucket already up to date"),
                None => debug!(key = %bucket.key(), "Created bucket"),
            }
            Ok(RecomputeOutcome::Created(bucket))
        } else {
            if previous.is_none() {
                warn!(
                    key = %bucket.key(),
                    events = events.len(),
                    "Expected an existing bucket to update, inserted it instead"
                );
            }
            debug!(
                key = %bucket.key(),
                events = events.len(),
                distance = bucket.total_distance,
                pay = %bucket.total_pay,
                "Updated bucket"
            );
            Ok(RecomputeOutcome::Updated { bucket, previous })
        }
    }

    /// Recompute every granularity for `reference_date`
    ///
    /// Granularities are independent; a failure in one does not stop the
    /// others.
    pub async fn recompute_all<S>(
        &self,
        store: &S,
        namespace: &Namespace,
        reference_date: NaiveDate,
    ) -> RecomputeReport
    where
        S: EventStore + AggregateStore + ?Sized,
    {
        let mut results = Vec::with_capacity(Granularity::ALL.len());
        for granularity in Granularity::ALL {
            let result = self
                .recompute(store, namespace, granularity, reference_date)
                .await;
            if let Err(e) = &result {
                warn!(%namespace, %granularity, %reference_date, "Recompute failed: {e}");
            }
            results.push((granularity, result));
        }

        let report = RecomputeReport {
            namespace: namespace.clone(),
            reference_date,
            results,
        };
        info!(
            %namespace,
            %reference_date,
            failed = report.failures().count(),
            "Recomputed aggregates"
        );
        report
    }

    /// Recompute every granularity for the namespace's most recent event date
    ///
    /// Returns `None` when the namespace has no events.
    pub async fn recompute_latest<S>(
        &self,
        store: &S,
        namespace: &Namespace,
    ) -> Result<Option<RecomputeReport>>
    where
        S: EventStore + AggregateStore + ?Sized,
    {
        match store.max_event_date(namespace).await? {
            Some(date) => Ok(Some(self.recompute_all(store, namespace, date).await)),
            None => {
                debug!(%namespace, "No events recorded, nothing to recompute");
                Ok(None)
            }
        }
    }
}

fn sum_totals(events: &[Event]) -> Option<(i64, Money)> {
    events
        .iter()
        .try_fold((0i64, Money::ZERO), |(distance, pay), event| {
            Some((
                distance.checked_add(event.total_distance())?,
                pay.checked_add(event.pay)?,
            ))
        })
}
