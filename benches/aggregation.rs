use chrono::{Days, NaiveDate};
use criterion::{Criterion, criterion_group, criterion_main};
use milestat::{AggregationEngine, Ledger, ReconciliationEngine};
use milestat_core::{EventStore, Granularity, Money, Namespace, NewEvent, WeekStart};
use milestat_store_memory::MemoryStore;
use milestat_store_sqlite::SqliteStore;
use std::hint::black_box;

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

fn create_test_events(count: usize) -> Vec<NewEvent> {
    (0..count)
        .map(|i| {
            let start = (i as i64) * 40;
            NewEvent {
                start_odometer: start,
                end_odometer: start + 10 + (i as i64 % 30),
                pay: Money::from_cents(500 + (i as i64 % 7) * 125),
                company: None,
                // ten events per day
                occurred_at: base_date() + Days::new((i / 10) as u64),
            }
        })
        .collect()
}

fn populated_store(runtime: &tokio::runtime::Runtime, count: usize) -> MemoryStore {
    let store = MemoryStore::new();
    runtime.block_on(async {
        for event in create_test_events(count) {
            store.insert_event(event).await.unwrap();
        }
    });
    store
}

fn benchmark_recompute(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let engine = AggregationEngine::new(WeekStart::Sunday);

    let mut group = c.benchmark_group("recompute");
    group.sample_size(20);

    for count in [100, 1000] {
        let store = populated_store(&runtime, count);
        let reference = base_date() + Days::new(15);

        group.bench_function(format!("yearly_over_{count}_events"), |b| {
            b.iter(|| {
                runtime.block_on(async {
                    let outcome = engine
                        .recompute(&store, &Namespace::Global, Granularity::Yearly, reference)
                        .await
                        .unwrap();
                    black_box(outcome);
                });
            });
        });

        group.bench_function(format!("all_granularities_over_{count}_events"), |b| {
            b.iter(|| {
                runtime.block_on(async {
                    black_box(
                        engine
                            .recompute_all(&store, &Namespace::Global, reference)
                            .await,
                    );
                });
            });
        });
    }

    group.finish();
}

fn benchmark_record_and_delete(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();

    let mut group = c.benchmark_group("ledger");
    group.sample_size(10);

    group.bench_function("record_100_events_memory", |b| {
        let events = create_test_events(100);
        b.iter(|| {
            runtime.block_on(async {
                let ledger = Ledger::open(MemoryStore::new(), WeekStart::Sunday)
                    .await
                    .unwrap();
                for event in events.iter().cloned() {
                    black_box(ledger.record_event(event).await.unwrap());
                }
            });
        });
    });

    group.bench_function("record_100_events_sqlite", |b| {
        let events = create_test_events(100);
        b.iter(|| {
            runtime.block_on(async {
                let store = SqliteStore::open_in_memory().unwrap();
                let ledger = Ledger::open(store, WeekStart::Sunday).await.unwrap();
                for event in events.iter().cloned() {
                    black_box(ledger.record_event(event).await.unwrap());
                }
            });
        });
    });

    group.bench_function("reconcile_deletion_memory", |b| {
        let engine = AggregationEngine::default();
        let reconciliation = ReconciliationEngine::default();
        b.iter(|| {
            runtime.block_on(async {
                let store = populated_store_async(&engine, 200).await;
                let victim = store.list_events(None).await.unwrap()[100].clone();
                black_box(
                    reconciliation
                        .reconcile_deletion(&store, &victim, &[Namespace::Global])
                        .await
                        .unwrap(),
                );
            });
        });
    });

    group.finish();
}

async fn populated_store_async(engine: &AggregationEngine, count: usize) -> MemoryStore {
    let store = MemoryStore::new();
    for event in create_test_events(count) {
        let event = store.insert_event(event).await.unwrap();
        engine
            .recompute_all(&store, &Namespace::Global, event.occurred_at)
            .await;
    }
    store
}

criterion_group!(benches, benchmark_recompute, benchmark_record_and_delete);
criterion_main!(benches);
