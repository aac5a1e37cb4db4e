//! Request pipelines over a single backend
//!
//! The ledger ties the store to the two engines: recording an event
//! recomputes the buckets of every namespace the event belongs to, and
//! deleting one reconciles them. It also owns the company registry, so a
//! company's namespace only receives aggregates once the company is
//! registered.

use chrono::NaiveDate;
use milestat_core::{
    AggregateBucket, CompanyName, Event, EventId, Granularity, LedgerStore, MilestatError,
    Namespace, NewEvent, Result, WeekStart,
};
use tracing::{debug, info};

use crate::aggregation::{AggregationEngine, RecomputeReport};
use crate::reconciliation::{ReconcileReport, ReconciliationEngine};

/// An inserted event together with the recompute of each affected namespace
#[derive(Debug)]
pub struct RecordedEvent {
    pub event: Event,
    pub reports: Vec<RecomputeReport>,
}

impl RecordedEvent {
    /// Whether every namespace and granularity was recomputed
    pub fn is_complete(&self) -> bool {
        self.reports.iter().all(RecomputeReport::is_complete)
    }
}

/// Result of registering a company
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyRegistration {
    /// False when the company was already registered
    pub newly_registered: bool,
    /// Number of distinct event dates whose company buckets were built
    pub backfilled_dates: usize,
}

/// Event ledger with aggregate maintenance
pub struct Ledger<S> {
    store: S,
    aggregation: AggregationEngine,
    reconciliation: ReconciliationEngine,
}

impl<S: LedgerStore> Ledger<S> {
    /// Create a ledger over `store` whose weeks begin on `week_start`
    ///
    /// Fails with `Config` when the store's weekly buckets were cut with a
    /// different week start.
    pub async fn open(store: S, week_start: WeekStart) -> Result<Self> {
        store.bind_week_start(week_start).await?;
        Ok(Self {
            store,
            aggregation: AggregationEngine::new(week_start),
            reconciliation: ReconciliationEngine::new(week_start),
        })
    }

    /// The underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The aggregation engine used by this ledger
    pub fn aggregation(&self) -> &AggregationEngine {
        &self.aggregation
    }

    /// Insert an event and recompute the buckets containing its date
    ///
    /// Namespaces are resolved before the insert, so an `Err` means nothing
    /// was stored.
    pub async fn record_event(&self, new_event: NewEvent) -> Result<RecordedEvent> {
        new_event.validate()?;
        let namespaces = self.namespaces_for(new_event.company.as_ref()).await?;
        let event = self.store.insert_event(new_event).await?;
        info!(event = %event.id, date = %event.occurred_at, "Recorded event");

        let mut reports = Vec::new();
        for namespace in namespaces {
            reports.push(
                self.aggregation
                    .recompute_all(&self.store, &namespace, event.occurred_at)
                    .await,
            );
        }

        Ok(RecordedEvent { event, reports })
    }

    /// Delete an event and reconcile every namespace it contributed to
    pub async fn delete_event(&self, id: EventId) -> Result<ReconcileReport> {
        let event = self
            .store
            .get_event(id)
            .await?
            .ok_or(MilestatError::EventNotFound(id))?;
        let namespaces = self.namespaces_for(event.company.as_ref()).await?;

        self.reconciliation
            .reconcile_deletion(&self.store, &event, &namespaces)
            .await
    }

    /// Register a company and build its aggregates from existing events
    pub async fn add_company(&self, company: &CompanyName) -> Result<CompanyRegistration> {
        let newly_registered = self.store.register_company(company).await?;
        if !newly_registered {
            debug!(%company, "Company already registered");
            return Ok(CompanyRegistration {
                newly_registered,
                backfilled_dates: 0,
            });
        }

        let namespace = Namespace::Company(company.clone());
        let mut dates: Vec<NaiveDate> = self
            .store
            .list_events(Some(company))
            .await?
            .into_iter()
            .map(|event| event.occurred_at)
            .collect();
        dates.dedup();

        for date in &dates {
            let report = self
                .aggregation
                .recompute_all(&self.store, &namespace, *date)
                .await;
            if let Some((_, e)) = report.failures().next() {
                return Err(MilestatError::storage(
                    format!("backfill {namespace} for {date}"),
                    e,
                ));
            }
        }

        info!(%company, dates = dates.len(), "Registered company");
        Ok(CompanyRegistration {
            newly_registered,
            backfilled_dates: dates.len(),
        })
    }

    /// Registered companies, sorted by name
    pub async fn companies(&self) -> Result<Vec<CompanyName>> {
        self.store.companies().await
    }

    /// Unregister a company and drop its aggregates; returns the buckets removed
    ///
    /// The company's events stay in the global aggregates.
    pub async fn remove_company(&self, company: &CompanyName) -> Result<usize> {
        if !self.store.unregister_company(company).await? {
            return Err(MilestatError::UnknownCompany(company.to_string()));
        }
        let dropped = self
            .store
            .drop_namespace(&Namespace::Company(company.clone()))
            .await?;
        info!(%company, buckets = dropped, "Removed company");
        Ok(dropped)
    }

    /// The latest bucket of each granularity, finest first
    pub async fn summary(&self, company: Option<&CompanyName>) -> Result<Vec<AggregateBucket>> {
        let namespace = self.namespace(company).await?;
        let mut latest = Vec::new();
        for granularity in Granularity::ALL {
            if let Some(bucket) = self.store.latest_bucket(&namespace, granularity).await? {
                latest.push(bucket);
            }
        }
        Ok(latest)
    }

    /// Buckets of a namespace, optionally of one granularity
    pub async fn buckets(
        &self,
        company: Option<&CompanyName>,
        granularity: Option<Granularity>,
    ) -> Result<Vec<AggregateBucket>> {
        let namespace = self.namespace(company).await?;
        self.store.list_buckets(&namespace, granularity).await
    }

    /// Raw events, optionally of one company
    pub async fn events(&self, company: Option<&CompanyName>) -> Result<Vec<Event>> {
        self.store.list_events(company).await
    }

    /// Recompute a namespace for `date`, or for its latest event date
    ///
    /// Returns `None` when no date was given and the namespace has no events.
    pub async fn recompute(
        &self,
        company: Option<&CompanyName>,
        date: Option<NaiveDate>,
    ) -> Result<Option<RecomputeReport>> {
        let namespace = self.namespace(company).await?;
        match date {
            Some(date) => Ok(Some(
                self.aggregation
                    .recompute_all(&self.store, &namespace, date)
                    .await,
            )),
            None => {
                self.aggregation
                    .recompute_latest(&self.store, &namespace)
                    .await
            }
        }
    }

    /// Resolve a company filter to a namespace, requiring registration
    async fn namespace(&self, company: Option<&CompanyName>) -> Result<Namespace> {
        match company {
            None => Ok(Namespace::Global),
            Some(company) => {
                if self.store.companies().await?.contains(company) {
                    Ok(Namespace::Company(company.clone()))
                } else {
                    Err(MilestatError::UnknownCompany(company.to_string()))
                }
            }
        }
    }

    /// Global plus the company's namespace when that company is registered
    async fn namespaces_for(&self, company: Option<&CompanyName>) -> Result<Vec<Namespace>> {
        let mut namespaces = vec![Namespace::Global];
        if let Some(company) = company {
            if self.store.companies().await?.contains(company) {
                namespaces.push(Namespace::Company(company.clone()));
            } else {
                debug!(%company, "Company not registered, only global aggregates updated");
            }
        }
        Ok(namespaces)
    }
}
