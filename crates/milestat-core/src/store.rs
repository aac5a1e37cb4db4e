//! Store traits for events, aggregate buckets, and companies
//!
//! Every storage backend crate (memory, SQLite) implements these traits so
//! the aggregation and reconciliation engines can run against any of them
//! with generic code. Method names are prefixed by the row kind so a single
//! backend can implement all three traits without ambiguous calls.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::Result;
use crate::types::{
    AggregateBucket, BucketKey, CompanyName, Event, EventId, Granularity, Money, Namespace,
    NewEvent, TotalsMatch, WeekStart,
};

/// Durable store of raw mileage/pay events
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Validate and insert an event, assigning its id
    async fn insert_event(&self, event: NewEvent) -> Result<Event>;

    /// Look up a single event
    async fn get_event(&self, id: EventId) -> Result<Option<Event>>;

    /// Events of `namespace` whose date lies in `[start, end]`, ordered by date then id
    async fn events_in_range(
        &self,
        namespace: &Namespace,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Event>>;

    /// Date of the most recent event in `namespace`
    async fn max_event_date(&self, namespace: &Namespace) -> Result<Option<NaiveDate>>;

    /// Remove an event; `EventNotFound` if it does not exist
    async fn delete_event(&self, id: EventId) -> Result<()>;

    /// All events, optionally restricted to one company, ordered by date then id
    async fn list_events(&self, company: Option<&CompanyName>) -> Result<Vec<Event>>;
}

/// Durable store of aggregate buckets, one per (namespace, granularity, start)
#[async_trait]
pub trait AggregateStore: Send + Sync {
    /// Look up a bucket by key
    async fn get_bucket(&self, key: &BucketKey) -> Result<Option<AggregateBucket>>;

    /// Insert the bucket, or replace the totals of the bucket with the same key
    ///
    /// Must be idempotent: two upserts of the same bucket leave one row.
    async fn upsert_bucket(&self, bucket: &AggregateBucket) -> Result<()>;

    /// Buckets of `namespace` whose range contains `date`
    ///
    /// When `totals` is given only buckets whose totals equal it exactly are
    /// returned.
    async fn query_overlapping(
        &self,
        namespace: &Namespace,
        date: NaiveDate,
        totals: Option<TotalsMatch>,
    ) -> Result<Vec<AggregateBucket>>;

    /// Subtract from a bucket's totals; `BucketNotFound` if it does not exist
    async fn decrement_bucket(
        &self,
        key: &BucketKey,
        distance_delta: i64,
        pay_delta: Money,
    ) -> Result<()>;

    /// Delete the bucket if its distance and pay are both ≤ 0; returns whether it was removed
    async fn delete_if_exhausted(&self, key: &BucketKey) -> Result<bool>;

    /// Delete the bucket unconditionally; returns whether it existed
    async fn delete_bucket(&self, key: &BucketKey) -> Result<bool>;

    /// The bucket of `granularity` with the latest start in `namespace`
    async fn latest_bucket(
        &self,
        namespace: &Namespace,
        granularity: Granularity,
    ) -> Result<Option<AggregateBucket>>;

    /// Buckets of `namespace`, optionally of one granularity, ordered by granularity then start
    async fn list_buckets(
        &self,
        namespace: &Namespace,
        granularity: Option<Granularity>,
    ) -> Result<Vec<AggregateBucket>>;

    /// Delete every bucket of `namespace`; returns the number removed
    async fn drop_namespace(&self, namespace: &Namespace) -> Result<usize>;

    /// Pin the first day of the week that weekly buckets are cut with
    ///
    /// The first call records `week_start`. Later calls with a different
    /// value fail with `Config`, since the stored weekly buckets would no
    /// longer line up with the new weeks.
    async fn bind_week_start(&self, week_start: WeekStart) -> Result<()>;
}

/// Registry of companies that own an aggregate namespace
#[async_trait]
pub trait CompanyDirectory: Send + Sync {
    /// Register a company; returns false if it was already registered
    async fn register_company(&self, company: &CompanyName) -> Result<bool>;

    /// Registered companies, sorted by name
    async fn companies(&self) -> Result<Vec<CompanyName>>;

    /// Remove a company from the registry; returns whether it was registered
    async fn unregister_company(&self, company: &CompanyName) -> Result<bool>;
}

/// A backend providing every store the ledger needs
pub trait LedgerStore: EventStore + AggregateStore + CompanyDirectory {}

impl<T> LedgerStore for T where T: EventStore + AggregateStore + CompanyDirectory {}
