//! Common test utilities and helpers for milestat tests
//!
//! This module provides an event builder, a store wrapper that injects
//! storage failures, and small assertion helpers.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;
use milestat::Ledger;
use milestat_core::{
    AggregateBucket, AggregateStore, BucketKey, CompanyDirectory, CompanyName, Event, EventId,
    EventStore, Granularity, MilestatError, Money, Namespace, NewEvent, Result, TotalsMatch,
    WeekStart,
};
use milestat_store_memory::MemoryStore;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Builder for creating test NewEvent instances
#[derive(Clone)]
pub struct EventBuilder {
    start_odometer: i64,
    distance: i64,
    pay: Money,
    company: Option<CompanyName>,
    occurred_at: NaiveDate,
}

impl EventBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self {
            start_odometer: 1_000,
            distance: 50,
            pay: Money::from_cents(5_000),
            company: None,
            occurred_at: date(2024, 3, 1),
        }
    }

    pub fn on(mut self, occurred_at: NaiveDate) -> Self {
        self.occurred_at = occurred_at;
        self
    }

    pub fn from_odometer(mut self, start: i64) -> Self {
        self.start_odometer = start;
        self
    }

    pub fn distance(mut self, distance: i64) -> Self {
        self.distance = distance;
        self
    }

    pub fn pay(mut self, pay: &str) -> Self {
        self.pay = pay.parse().unwrap();
        self
    }

    pub fn pay_cents(mut self, cents: i64) -> Self {
        self.pay = Money::from_cents(cents);
        self
    }

    pub fn company(mut self, company: &str) -> Self {
        self.company = Some(CompanyName::new(company));
        self
    }

    /// Build the NewEvent
    pub fn build(self) -> NewEvent {
        NewEvent {
            start_odometer: self.start_odometer,
            end_odometer: self.start_odometer + self.distance,
            pay: self.pay,
            company: self.company,
            occurred_at: self.occurred_at,
        }
    }
}

impl Default for EventBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub async fn memory_ledger() -> Ledger<MemoryStore> {
    Ledger::open(MemoryStore::new(), WeekStart::Sunday)
        .await
        .unwrap()
}

/// Totals of a bucket, or `None` when it does not exist
pub async fn totals<S: AggregateStore>(
    store: &S,
    namespace: &Namespace,
    granularity: Granularity,
    start: NaiveDate,
) -> Option<(i64, Money)> {
    let key = BucketKey {
        namespace: namespace.clone(),
        granularity,
        start,
    };
    store
        .get_bucket(&key)
        .await
        .unwrap()
        .map(|b| (b.total_distance, b.total_pay))
}

/// Compare floats with a tolerance
pub fn assert_approx_eq(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

/// A MemoryStore wrapper that fails selected operations
///
/// Operations are named after the trait methods (`"decrement_bucket"`, ...).
/// A granularity can also be poisoned so that every bucket read or write of
/// that granularity fails.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    failing_ops: Mutex<HashSet<&'static str>>,
    failing_granularity: Mutex<Option<Granularity>>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(&self, op: &'static str) {
        self.failing_ops.lock().unwrap().insert(op);
    }

    pub fn heal(&self) {
        self.failing_ops.lock().unwrap().clear();
        *self.failing_granularity.lock().unwrap() = None;
    }

    pub fn fail_granularity(&self, granularity: Granularity) {
        *self.failing_granularity.lock().unwrap() = Some(granularity);
    }

    fn check(&self, op: &'static str) -> Result<()> {
        if self.failing_ops.lock().unwrap().contains(op) {
            return Err(MilestatError::storage(op, "injected failure"));
        }
        Ok(())
    }

    fn check_bucket(&self, op: &'static str, granularity: Granularity) -> Result<()> {
        self.check(op)?;
        if *self.failing_granularity.lock().unwrap() == Some(granularity) {
            return Err(MilestatError::storage(op, "injected failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl EventStore for FlakyStore {
    async fn insert_event(&self, event: NewEvent) -> Result<Event> {
        self.check("insert_event")?;
        self.inner.insert_event(event).await
    }

    async fn get_event(&self, id: EventId) -> Result<Option<Event>> {
        self.check("get_event")?;
        self.inner.get_event(id).await
    }

    async fn events_in_range(
        &self,
        namespace: &Namespace,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Event>> {
        self.check("events_in_range")?;
        self.inner.events_in_range(namespace, start, end).await
    }

    async fn max_event_date(&self, namespace: &Namespace) -> Result<Option<NaiveDate>> {
        self.check("max_event_date")?;
        self.inner.max_event_date(namespace).await
    }

    async fn delete_event(&self, id: EventId) -> Result<()> {
        self.check("delete_event")?;
        self.inner.delete_event(id).await
    }

    async fn list_events(&self, company: Option<&CompanyName>) -> Result<Vec<Event>> {
        self.check("list_events")?;
        self.inner.list_events(company).await
    }
}

#[async_trait]
impl AggregateStore for FlakyStore {
    async fn get_bucket(&self, key: &BucketKey) -> Result<Option<AggregateBucket>> {
        self.check_bucket("get_bucket", key.granularity)?;
        self.inner.get_bucket(key).await
    }

    async fn upsert_bucket(&self, bucket: &AggregateBucket) -> Result<()> {
        self.check_bucket("upsert_bucket", bucket.granularity)?;
        self.inner.upsert_bucket(bucket).await
    }

    async fn query_overlapping(
        &self,
        namespace: &Namespace,
        date: NaiveDate,
        totals: Option<TotalsMatch>,
    ) -> Result<Vec<AggregateBucket>> {
        self.check("query_overlapping")?;
        self.inner.query_overlapping(namespace, date, totals).await
    }

    async fn decrement_bucket(
        &self,
        key: &BucketKey,
        distance_delta: i64,
        pay_delta: Money,
    ) -> Result<()> {
        self.check_bucket("decrement_bucket", key.granularity)?;
        self.inner
            .decrement_bucket(key, distance_delta, pay_delta)
            .await
    }

    async fn delete_if_exhausted(&self, key: &BucketKey) -> Result<bool> {
        self.check_bucket("delete_if_exhausted", key.granularity)?;
        self.inner.delete_if_exhausted(key).await
    }

    async fn delete_bucket(&self, key: &BucketKey) -> Result<bool> {
        self.check_bucket("delete_bucket", key.granularity)?;
        self.inner.delete_bucket(key).await
    }

    async fn latest_bucket(
        &self,
        namespace: &Namespace,
        granularity: Granularity,
    ) -> Result<Option<AggregateBucket>> {
        self.check("latest_bucket")?;
        self.inner.latest_bucket(namespace, granularity).await
    }

    async fn list_buckets(
        &self,
        namespace: &Namespace,
        granularity: Option<Granularity>,
    ) -> Result<Vec<AggregateBucket>> {
        self.check("list_buckets")?;
        self.inner.list_buckets(namespace, granularity).await
    }

    async fn drop_namespace(&self, namespace: &Namespace) -> Result<usize> {
        self.check("drop_namespace")?;
        self.inner.drop_namespace(namespace).await
    }

    async fn bind_week_start(&self, week_start: WeekStart) -> Result<()> {
        self.check("bind_week_start")?;
        self.inner.bind_week_start(week_start).await
    }
}

#[async_trait]
impl CompanyDirectory for FlakyStore {
    async fn register_company(&self, company: &CompanyName) -> Result<bool> {
        self.check("register_company")?;
        self.inner.register_company(company).await
    }

    async fn companies(&self) -> Result<Vec<CompanyName>> {
        self.check("companies")?;
        self.inner.companies().await
    }

    async fn unregister_company(&self, company: &CompanyName) -> Result<bool> {
        self.check("unregister_company")?;
        self.inner.unregister_company(company).await
    }
}
