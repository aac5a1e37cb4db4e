use async_trait::async_trait;
use chrono::NaiveDate;
use milestat_core::{
    AggregateBucket, AggregateStore, BucketKey, Granularity, MilestatError, Money, Namespace,
    Result, TotalsMatch, WeekStart,
};
use rusqlite::{OptionalExtension, params};

use crate::SqliteStore;
use crate::helpers::{BUCKET_COLUMNS, decode_buckets, row_to_bucket_row};

const WEEK_START_KEY: &str = "week_start";

#[async_trait]
impl AggregateStore for SqliteStore {
    async fn get_bucket(&self, key: &BucketKey) -> Result<Option<AggregateBucket>> {
        let row = self.with_conn("get bucket", |conn| {
            conn.query_row(
                &format!(
                    r#"
                    SELECT {BUCKET_COLUMNS}
                    FROM aggregate_bucket
                    WHERE namespace = ?1 AND granularity = ?2 AND start_date = ?3
                    "#
                ),
                params![
                    key.namespace.storage_key(),
                    key.granularity.as_str(),
                    key.start
                ],
                row_to_bucket_row,
            )
            .optional()
        })?;
        row.map(AggregateBucket::try_from).transpose()
    }

    async fn upsert_bucket(&self, bucket: &AggregateBucket) -> Result<()> {
        self.with_conn("upsert bucket", |conn| {
            conn.execute(
                r#"
                INSERT INTO aggregate_bucket (
                  namespace, granularity, start_date, end_date, total_distance, total_pay_cents
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT(namespace, granularity, start_date) DO UPDATE SET
                  end_date = excluded.end_date,
                  total_distance = excluded.total_distance,
                  total_pay_cents = excluded.total_pay_cents
                "#,
                params![
                    bucket.namespace.storage_key(),
                    bucket.granularity.as_str(),
                    bucket.start,
                    bucket.end,
                    bucket.total_distance,
                    bucket.total_pay.cents(),
                ],
            )
        })?;
        Ok(())
    }

    async fn query_overlapping(
        &self,
        namespace: &Namespace,
        date: NaiveDate,
        totals: Option<TotalsMatch>,
    ) -> Result<Vec<AggregateBucket>> {
        let rows = self.with_conn("query overlapping buckets", |conn| {
            let mut stmt = conn.prepare(&format!(
                r#"
                SELECT {BUCKET_COLUMNS}
                FROM aggregate_bucket
                WHERE namespace = ?1
                  AND start_date <= ?2 AND end_date >= ?2
                  AND (?3 IS NULL OR total_distance = ?3)
                  AND (?4 IS NULL OR total_pay_cents = ?4)
                ORDER BY start_date
                "#
            ))?;
            let rows = stmt.query_map(
                params![
                    namespace.storage_key(),
                    date,
                    totals.map(|t| t.distance),
                    totals.map(|t| t.pay.cents()),
                ],
                row_to_bucket_row,
            )?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        })?;
        let mut buckets = decode_buckets(rows)?;
        buckets.sort_by_key(|bucket| (bucket.granularity, bucket.start));
        Ok(buckets)
    }

    async fn decrement_bucket(
        &self,
        key: &BucketKey,
        distance_delta: i64,
        pay_delta: Money,
    ) -> Result<()> {
        let updated = self.with_conn("decrement bucket", |conn| {
            conn.execute(
                r#"
                UPDATE aggregate_bucket
                SET total_distance = total_distance - ?4,
                    total_pay_cents = total_pay_cents - ?5
                WHERE namespace = ?1 AND granularity = ?2 AND start_date = ?3
                "#,
                params![
                    key.namespace.storage_key(),
                    key.granularity.as_str(),
                    key.start,
                    distance_delta,
                    pay_delta.cents(),
                ],
            )
        })?;
        if updated == 0 {
            return Err(MilestatError::BucketNotFound(key.clone()));
        }
        Ok(())
    }

    async fn delete_if_exhausted(&self, key: &BucketKey) -> Result<bool> {
        let removed = self.with_conn("delete exhausted bucket", |conn| {
            conn.execute(
                r#"
                DELETE FROM aggregate_bucket
                WHERE namespace = ?1 AND granularity = ?2 AND start_date = ?3
                  AND total_distance <= 0 AND total_pay_cents <= 0
                "#,
                params![
                    key.namespace.storage_key(),
                    key.granularity.as_str(),
                    key.start
                ],
            )
        })?;
        Ok(removed > 0)
    }

    async fn delete_bucket(&self, key: &BucketKey) -> Result<bool> {
        let removed = self.with_conn("delete bucket", |conn| {
            conn.execute(
                r#"
                DELETE FROM aggregate_bucket
                WHERE namespace = ?1 AND granularity = ?2 AND start_date = ?3
                "#,
                params![
                    key.namespace.storage_key(),
                    key.granularity.as_str(),
                    key.start
                ],
            )
        })?;
        Ok(removed > 0)
    }

    async fn latest_bucket(
        &self,
        namespace: &Namespace,
        granularity: Granularity,
    ) -> Result<Option<AggregateBucket>> {
        let row = self.with_conn("query latest bucket", |conn| {
            conn.query_row(
                &format!(
                    r#"
                    SELECT {BUCKET_COLUMNS}
                    FROM aggregate_bucket
                    WHERE namespace = ?1 AND granularity = ?2
                    ORDER BY start_date DESC, end_date DESC
                    LIMIT 1
                    "#
                ),
                params![namespace.storage_key(), granularity.as_str()],
                row_to_bucket_row,
            )
            .optional()
        })?;
        row.map(AggregateBucket::try_from).transpose()
    }

    async fn list_buckets(
        &self,
        namespace: &Namespace,
        granularity: Option<Granularity>,
    ) -> Result<Vec<AggregateBucket>> {
        let rows = self.with_conn("list buckets", |conn| {
            let mut stmt = conn.prepare(&format!(
                r#"
                SELECT {BUCKET_COLUMNS}
                FROM aggregate_bucket
                WHERE namespace = ?1 AND (?2 IS NULL OR granularity = ?2)
                ORDER BY start_date
                "#
            ))?;
            let rows = stmt.query_map(
                params![namespace.storage_key(), granularity.map(|g| g.as_str())],
                row_to_bucket_row,
            )?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        })?;
        let mut buckets = decode_buckets(rows)?;
        // granularity is stored as text; order it by enum position
        buckets.sort_by_key(|bucket| (bucket.granularity, bucket.start));
        Ok(buckets)
    }

    async fn drop_namespace(&self, namespace: &Namespace) -> Result<usize> {
        self.with_conn("drop namespace", |conn| {
            conn.execute(
                "DELETE FROM aggregate_bucket WHERE namespace = ?1",
                params![namespace.storage_key()],
            )
        })
    }

    async fn bind_week_start(&self, week_start: WeekStart) -> Result<()> {
        let stored: String = self.with_conn("bind week start", |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO setting (key, value) VALUES (?1, ?2)",
                params![WEEK_START_KEY, week_start.to_string()],
            )?;
            conn.query_row(
                "SELECT value FROM setting WHERE key = ?1",
                params![WEEK_START_KEY],
                |row| row.get(0),
            )
        })?;
        let stored: WeekStart = stored
            .parse()
            .map_err(|e: String| MilestatError::storage("bind week start", e))?;
        if stored != week_start {
            return Err(MilestatError::week_start_conflict(stored, week_start));
        }
        Ok(())
    }
}
