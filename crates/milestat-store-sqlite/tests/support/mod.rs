#![allow(dead_code)]

use std::path::PathBuf;

use chrono::NaiveDate;
use milestat_core::period::Calendar;
use milestat_core::{AggregateBucket, CompanyName, Granularity, Money, Namespace, NewEvent};
use milestat_store_sqlite::SqliteStore;
use tempfile::TempDir;

pub struct TestStore {
    pub _dir: TempDir,
    pub store: SqliteStore,
    pub path: PathBuf,
}

pub fn setup_store() -> TestStore {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("test.sqlite");
    let store = SqliteStore::open(&path).expect("open store");
    TestStore {
        _dir: dir,
        store,
        path,
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn make_event(start: i64, end: i64, pay_cents: i64, day: NaiveDate) -> NewEvent {
    NewEvent {
        start_odometer: start,
        end_odometer: end,
        pay: Money::from_cents(pay_cents),
        company: None,
        occurred_at: day,
    }
}

pub fn make_company_event(
    company: &str,
    start: i64,
    end: i64,
    pay_cents: i64,
    day: NaiveDate,
) -> NewEvent {
    NewEvent {
        company: Some(CompanyName::new(company)),
        ..make_event(start, end, pay_cents, day)
    }
}

pub fn make_bucket(
    namespace: Namespace,
    granularity: Granularity,
    day: NaiveDate,
    distance: i64,
    pay_cents: i64,
) -> AggregateBucket {
    let period = Calendar::default().period(granularity, day);
    AggregateBucket::new(namespace, period, distance, Money::from_cents(pay_cents))
}
