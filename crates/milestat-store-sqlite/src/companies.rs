use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use milestat_core::{CompanyDirectory, CompanyName, Result};
use rusqlite::params;

use crate::SqliteStore;

#[async_trait]
impl CompanyDirectory for SqliteStore {
    async fn register_company(&self, company: &CompanyName) -> Result<bool> {
        let inserted = self.with_conn("register company", |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO company (name, registered_at) VALUES (?1, ?2)",
                params![
                    company.as_str(),
                    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
                ],
            )
        })?;
        Ok(inserted > 0)
    }

    async fn companies(&self) -> Result<Vec<CompanyName>> {
        self.with_conn("list companies", |conn| {
            let mut stmt = conn.prepare("SELECT name FROM company ORDER BY name")?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0).map(CompanyName::new))?;
            rows.collect()
        })
    }

    async fn unregister_company(&self, company: &CompanyName) -> Result<bool> {
        let removed = self.with_conn("unregister company", |conn| {
            conn.execute(
                "DELETE FROM company WHERE name = ?1",
                params![company.as_str()],
            )
        })?;
        Ok(removed > 0)
    }
}
