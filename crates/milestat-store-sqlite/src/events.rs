use async_trait::async_trait;
use chrono::NaiveDate;
use milestat_core::{
    CompanyName, Event, EventId, EventStore, MilestatError, Namespace, NewEvent, Result,
};
use rusqlite::{OptionalExtension, params};
use tracing::debug;

use crate::SqliteStore;
use crate::helpers::{EVENT_COLUMNS, namespace_company, row_to_event};

#[async_trait]
impl EventStore for SqliteStore {
    async fn insert_event(&self, event: NewEvent) -> Result<Event> {
        event.validate()?;

        let id = self.with_conn("insert event", |conn| {
            conn.execute(
                r#"
                INSERT INTO event (
                  start_odometer, end_odometer, total_distance, pay_cents, company, occurred_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    event.start_odometer,
                    event.end_odometer,
                    event.total_distance(),
                    event.pay.cents(),
                    event.company.as_ref().map(CompanyName::as_str),
                    event.occurred_at,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })?;

        debug!("Inserted event #{} on {}", id, event.occurred_at);
        Ok(event.into_event(EventId::new(id)))
    }

    async fn get_event(&self, id: EventId) -> Result<Option<Event>> {
        self.with_conn("get event", |conn| {
            conn.query_row(
                &format!("SELECT {EVENT_COLUMNS} FROM event WHERE id = ?1"),
                params![id.get()],
                row_to_event,
            )
            .optional()
        })
    }

    async fn events_in_range(
        &self,
        namespace: &Namespace,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Event>> {
        self.with_conn("query events by date range", |conn| {
            let mut stmt = conn.prepare(&format!(
                r#"
                SELECT {EVENT_COLUMNS}
                FROM event
                WHERE occurred_at BETWEEN ?1 AND ?2
                  AND (?3 IS NULL OR company = ?3)
                ORDER BY occurred_at, id
                "#
            ))?;
            let rows = stmt.query_map(
                params![start, end, namespace_company(namespace)],
                row_to_event,
            )?;
            rows.collect()
        })
    }

    async fn max_event_date(&self, namespace: &Namespace) -> Result<Option<NaiveDate>> {
        self.with_conn("query max event date", |conn| {
            conn.query_row(
                "SELECT MAX(occurred_at) FROM event WHERE (?1 IS NULL OR company = ?1)",
                params![namespace_company(namespace)],
                |row| row.get(0),
            )
        })
    }

    async fn delete_event(&self, id: EventId) -> Result<()> {
        let removed = self.with_conn("delete event", |conn| {
            conn.execute("DELETE FROM event WHERE id = ?1", params![id.get()])
        })?;
        if removed == 0 {
            return Err(MilestatError::EventNotFound(id));
        }
        Ok(())
    }

    async fn list_events(&self, company: Option<&CompanyName>) -> Result<Vec<Event>> {
        self.with_conn("list events", |conn| {
            let mut stmt = conn.prepare(&format!(
                r#"
                SELECT {EVENT_COLUMNS}
                FROM event
                WHERE (?1 IS NULL OR company = ?1)
                ORDER BY occurred_at, id
                "#
            ))?;
            let rows = stmt.query_map(params![company.map(CompanyName::as_str)], row_to_event)?;
            rows.collect()
        })
    }
}
