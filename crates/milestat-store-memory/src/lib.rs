//! In-memory store for milestat
//!
//! Implements every store trait over ordered maps behind a single
//! `tokio::sync::RwLock`. Useful for dry runs, tests, and benchmarks;
//! nothing survives the process.

use async_trait::async_trait;
use chrono::NaiveDate;
use milestat_core::{
    AggregateBucket, AggregateStore, BucketKey, CompanyDirectory, CompanyName, Event, EventId,
    EventStore, Granularity, MilestatError, Money, Namespace, NewEvent, Result, TotalsMatch,
    WeekStart,
};
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Default)]
struct State {
    next_id: i64,
    events: BTreeMap<EventId, Event>,
    buckets: BTreeMap<BucketKey, AggregateBucket>,
    companies: BTreeSet<CompanyName>,
    week_start: Option<WeekStart>,
}

/// Process-local implementation of the event, aggregate, and company stores
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored buckets across all namespaces
    pub async fn bucket_count(&self) -> usize {
        self.state.read().await.buckets.len()
    }
}

fn sort_events(events: &mut [Event]) {
    events.sort_by_key(|event| (event.occurred_at, event.id));
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn insert_event(&self, event: NewEvent) -> Result<Event> {
        event.validate()?;

        let mut state = self.state.write().await;
        state.next_id += 1;
        let event = event.into_event(EventId::new(state.next_id));
        state.events.insert(event.id, event.clone());
        debug!("Inserted event {} on {}", event.id, event.occurred_at);
        Ok(event)
    }

    async fn get_event(&self, id: EventId) -> Result<Option<Event>> {
        Ok(self.state.read().await.events.get(&id).cloned())
    }

    async fn events_in_range(
        &self,
        namespace: &Namespace,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Event>> {
        let state = self.state.read().await;
        let mut events: Vec<Event> = state
            .events
            .values()
            .filter(|event| event.belongs_to(namespace))
            .filter(|event| start <= event.occurred_at && event.occurred_at <= end)
            .cloned()
            .collect();
        sort_events(&mut events);
        Ok(events)
    }

    async fn max_event_date(&self, namespace: &Namespace) -> Result<Option<NaiveDate>> {
        let state = self.state.read().await;
        Ok(state
            .events
            .values()
            .filter(|event| event.belongs_to(namespace))
            .map(|event| event.occurred_at)
            .max())
    }

    async fn delete_event(&self, id: EventId) -> Result<()> {
        let mut state = self.state.write().await;
        state
            .events
            .remove(&id)
            .map(|_| ())
            .ok_or(MilestatError::EventNotFound(id))
    }

    async fn list_events(&self, company: Option<&CompanyName>) -> Result<Vec<Event>> {
        let state = self.state.read().await;
        let mut events: Vec<Event> = state
            .events
            .values()
            .filter(|event| company.is_none() || event.company.as_ref() == company)
            .cloned()
            .collect();
        sort_events(&mut events);
        Ok(events)
    }
}

#[async_trait]
impl AggregateStore for MemoryStore {
    async fn get_bucket(&self, key: &BucketKey) -> Result<Option<AggregateBucket>> {
        Ok(self.state.read().await.buckets.get(key).cloned())
    }

    async fn upsert_bucket(&self, bucket: &AggregateBucket) -> Result<()> {
        let mut state = self.state.write().await;
        state.buckets.insert(bucket.key(), bucket.clone());
        Ok(())
    }

    async fn query_overlapping(
        &self,
        namespace: &Namespace,
        date: NaiveDate,
        totals: Option<TotalsMatch>,
    ) -> Result<Vec<AggregateBucket>> {
        let state = self.state.read().await;
        Ok(state
            .buckets
            .values()
            .filter(|bucket| &bucket.namespace == namespace && bucket.contains(date))
            .filter(|bucket| totals.is_none_or(|totals| bucket.matches(&totals)))
            .cloned()
            .collect())
    }

    async fn decrement_bucket(
        &self,
        key: &BucketKey,
        distance_delta: i64,
        pay_delta: Money,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        let bucket = state
            .buckets
            .get_mut(key)
            .ok_or_else(|| MilestatError::BucketNotFound(key.clone()))?;
        bucket.total_distance -= distance_delta;
        bucket.total_pay -= pay_delta;
        Ok(())
    }

    async fn delete_if_exhausted(&self, key: &BucketKey) -> Result<bool> {
        let mut state = self.state.write().await;
        let exhausted = state
            .buckets
            .get(key)
            .is_some_and(AggregateBucket::is_exhausted);
        if exhausted {
            state.buckets.remove(key);
        }
        Ok(exhausted)
    }

    async fn delete_bucket(&self, key: &BucketKey) -> Result<bool> {
        Ok(self.state.write().await.buckets.remove(key).is_some())
    }

    async fn latest_bucket(
        &self,
        namespace: &Namespace,
        granularity: Granularity,
    ) -> Result<Option<AggregateBucket>> {
        let state = self.state.read().await;
        Ok(state
            .buckets
            .values()
            .filter(|bucket| &bucket.namespace == namespace && bucket.granularity == granularity)
            .max_by_key(|bucket| (bucket.start, bucket.end))
            .cloned())
    }

    async fn list_buckets(
        &self,
        namespace: &Namespace,
        granularity: Option<Granularity>,
    ) -> Result<Vec<AggregateBucket>> {
        let state = self.state.read().await;
        Ok(state
            .buckets
            .values()
            .filter(|bucket| &bucket.namespace == namespace)
            .filter(|bucket| granularity.is_none_or(|g| bucket.granularity == g))
            .cloned()
            .collect())
    }

    async fn drop_namespace(&self, namespace: &Namespace) -> Result<usize> {
        let mut state = self.state.write().await;
        let before = state.buckets.len();
        state.buckets.retain(|key, _| &key.namespace != namespace);
        Ok(before - state.buckets.len())
    }

    async fn bind_week_start(&self, week_start: WeekStart) -> Result<()> {
        let mut state = self.state.write().await;
        match state.week_start {
            Some(stored) if stored != week_start => {
                Err(MilestatError::week_start_conflict(stored, week_start))
            }
            Some(_) => Ok(()),
            None => {
                state.week_start = Some(week_start);
                Ok(())
            }
        }
    }
}

#[async_trait]
impl CompanyDirectory for MemoryStore {
    async fn register_company(&self, company: &CompanyName) -> Result<bool> {
        Ok(self.state.write().await.companies.insert(company.clone()))
    }

    async fn companies(&self) -> Result<Vec<CompanyName>> {
        Ok(self.state.read().await.companies.iter().cloned().collect())
    }

    async fn unregister_company(&self, company: &CompanyName) -> Result<bool> {
        Ok(self.state.write().await.companies.remove(company))
    }
}
