use chrono::NaiveDate;
use milestat_core::{
    AggregateBucket, CompanyName, Event, EventId, Granularity, MilestatError, Money, Namespace,
    Result,
};
use rusqlite::Row;

pub(crate) const EVENT_COLUMNS: &str =
    "id, start_odometer, end_odometer, pay_cents, company, occurred_at";

pub(crate) const BUCKET_COLUMNS: &str =
    "namespace, granularity, start_date, end_date, total_distance, total_pay_cents";

pub(crate) fn row_to_event(row: &Row<'_>) -> std::result::Result<Event, rusqlite::Error> {
    Ok(Event {
        id: EventId::new(row.get(0)?),
        start_odometer: row.get(1)?,
        end_odometer: row.get(2)?,
        pay: Money::from_cents(row.get(3)?),
        company: row.get::<_, Option<String>>(4)?.map(CompanyName::new),
        occurred_at: row.get(5)?,
    })
}

/// Raw bucket columns; namespace and granularity are decoded afterwards
pub(crate) struct BucketRow {
    namespace: String,
    granularity: String,
    start: NaiveDate,
    end: NaiveDate,
    total_distance: i64,
    total_pay_cents: i64,
}

pub(crate) fn row_to_bucket_row(row: &Row<'_>) -> std::result::Result<BucketRow, rusqlite::Error> {
    Ok(BucketRow {
        namespace: row.get(0)?,
        granularity: row.get(1)?,
        start: row.get(2)?,
        end: row.get(3)?,
        total_distance: row.get(4)?,
        total_pay_cents: row.get(5)?,
    })
}

impl TryFrom<BucketRow> for AggregateBucket {
    type Error = MilestatError;

    fn try_from(row: BucketRow) -> Result<Self> {
        let granularity: Granularity = row
            .granularity
            .parse()
            .map_err(|e: String| MilestatError::storage("decode bucket", e))?;
        Ok(AggregateBucket {
            namespace: Namespace::from_storage_key(&row.namespace)?,
            granularity,
            start: row.start,
            end: row.end,
            total_distance: row.total_distance,
            total_pay: Money::from_cents(row.total_pay_cents),
        })
    }
}

pub(crate) fn decode_buckets(rows: Vec<BucketRow>) -> Result<Vec<AggregateBucket>> {
    rows.into_iter().map(AggregateBucket::try_from).collect()
}

/// Company filter for a namespace: `None` matches every event
pub(crate) fn namespace_company(namespace: &Namespace) -> Option<&str> {
    match namespace {
        Namespace::Global => None,
        Namespace::Company(name) => Some(name.as_str()),
    }
}
