//! Cascading reconciliation of aggregates when an event is deleted
//!
//! Deleting an event runs a fixed pipeline:
//!
//! 1. delete the raw event row;
//! 2. delete every bucket containing the event's date whose totals equal the
//!    event's own totals, because such a bucket held only this event;
//! 3. subtract the event from every remaining bucket containing its date;
//! 4. delete the decremented buckets left with no distance and no pay.
//!
//! Each step is applied to every namespace before the next step starts. The
//! first failing step aborts the pipeline and is reported with its stage so
//! the caller knows how much was applied.

use chrono::NaiveDate;
use milestat_core::error::ReconcileStage;
use milestat_core::period::Calendar;
use milestat_core::{
    AggregateBucket, AggregateStore, BucketKey, Event, EventId, EventStore, MilestatError,
    Namespace, Result, WeekStart,
};
use tracing::{debug, info, warn};

/// What a deletion changed
#[derive(Debug)]
pub struct ReconcileReport {
    pub event: EventId,
    /// Buckets deleted because they held only the deleted event
    pub purged_exact: Vec<BucketKey>,
    /// Buckets the event's totals were subtracted from
    pub decremented: Vec<BucketKey>,
    /// Decremented buckets deleted because they were left empty
    pub purged_exhausted: Vec<BucketKey>,
    /// Namespaces where no bucket covered the event; always `Consistency` errors
    pub findings: Vec<MilestatError>,
}

impl ReconcileReport {
    fn new(event: EventId) -> Self {
        Self {
            event,
            purged_exact: Vec::new(),
            decremented: Vec::new(),
            purged_exhausted: Vec::new(),
            findings: Vec::new(),
        }
    }

    /// Every bucket the deletion touched
    pub fn touched(&self) -> impl Iterator<Item = &BucketKey> {
        self.purged_exact.iter().chain(&self.decremented)
    }

    /// Whether every namespace had a bucket covering the event
    pub fn is_consistent(&self) -> bool {
        self.findings.is_empty()
    }
}

/// Keeps aggregate buckets consistent when source events are removed
#[derive(Debug, Clone, Copy, Default)]
pub struct ReconciliationEngine {
    calendar: Calendar,
}

impl ReconciliationEngine {
    /// Create an engine whose canonical weekly keys begin on `week_start`
    pub fn new(week_start: WeekStart) -> Self {
        Self {
            calendar: Calendar::new(week_start),
        }
    }

    /// Delete `event` and reconcile the buckets of `namespaces`
    ///
    /// Namespaces the event does not belong to are ignored. Errors are
    /// returned as [`MilestatError::Reconciliation`] carrying the failed
    /// stage; a missing event fails the first stage with `EventNotFound`.
    pub async fn reconcile_deletion<S>(
        &self,
        store: &S,
        event: &Event,
        namespaces: &[Namespace],
    ) -> Result<ReconcileReport>
    where
        S: EventStore + AggregateStore + ?Sized,
    {
        let fail = |stage: ReconcileStage| {
            move |source: MilestatError| MilestatError::Reconciliation {
                event: event.id,
                stage,
                source: Box::new(source),
            }
        };
        let date = event.occurred_at;
        let namespaces: Vec<&Namespace> = namespaces
            .iter()
            .filter(|namespace| event.belongs_to(namespace))
            .collect();
        let mut report = ReconcileReport::new(event.id);

        store
            .delete_event(event.id)
            .await
            .map_err(fail(ReconcileStage::DeleteEvent))?;
        debug!(event = %event.id, "Deleted event row");

        let mut covered = vec![false; namespaces.len()];

        for (idx, namespace) in namespaces.iter().enumerate() {
            let exact = store
                .query_overlapping(namespace, date, Some(event.totals()))
                .await
                .map_err(fail(ReconcileStage::PurgeExactMatches))?;
            for bucket in exact.iter().filter(|b| self.is_canonical(b, date)) {
                let key = bucket.key();
                store
                    .delete_bucket(&key)
                    .await
                    .map_err(fail(ReconcileStage::PurgeExactMatches))?;
                debug!(%key, "Deleted bucket holding only the deleted event");
                covered[idx] = true;
                report.purged_exact.push(key);
            }
        }

        let mut to_purge = Vec::new();
        for (idx, namespace) in namespaces.iter().enumerate() {
            let overlapping = store
                .query_overlapping(namespace, date, None)
                .await
                .map_err(fail(ReconcileStage::Decrement))?;
            for bucket in overlapping {
                let key = bucket.key();
                store
                    .decrement_bucket(&key, event.total_distance(), event.pay)
                    .await
                    .map_err(fail(ReconcileStage::Decrement))?;
                debug!(%key, distance = event.total_distance(), pay = %event.pay, "Decremented bucket");
                covered[idx] = true;
                to_purge.push(key);
            }
        }

        for key in to_purge {
            if store
                .delete_if_exhausted(&key)
                .await
                .map_err(fail(ReconcileStage::PurgeExhausted))?
            {
                debug!(%key, "Deleted exhausted bucket");
                report.purged_exhausted.push(key.clone());
            }
            report.decremented.push(key);
        }

        for (namespace, _) in namespaces
            .iter()
            .zip(&covered)
            .filter(|(_, covered)| !**covered)
        {
            let finding = MilestatError::Consistency {
                event: event.id,
                namespace: (*namespace).clone(),
            };
            warn!("{finding}");
            report.findings.push(finding);
        }

        info!(
            event = %event.id,
            purged_exact = report.purged_exact.len(),
            decremented = report.decremented.len(),
            purged_exhausted = report.purged_exhausted.len(),
            "Reconciled deleted event"
        );
        Ok(report)
    }

    /// Whether the bucket sits at the key derived from `date` for its granularity
    fn is_canonical(&self, bucket: &AggregateBucket, date: NaiveDate) -> bool {
        bucket.key() == self.calendar.bucket_key(&bucket.namespace, bucket.granularity, date)
    }
}
