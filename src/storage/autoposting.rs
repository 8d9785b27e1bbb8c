//! Autoposting config repository
//!
//! External CRUD owns these rows; the engine reads them each cycle and
//! stamps `last_active` after a completed cycle.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::Pool;
use tokio_postgres::Row;
use uuid::Uuid;

use crate::engine::ports::ConfigStore;
use crate::error::Result;
use crate::models::AutopostingConfig;

/// PostgreSQL-backed autoposting config store
pub struct AutopostingStore {
    pool: Pool,
}

impl AutopostingStore {
    /// Create a new store
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    fn from_row(row: &Row) -> AutopostingConfig {
        AutopostingConfig {
            id: row.get("id"),
            organization_id: row.get("organization_id"),
            enabled: row.get("enabled"),
            period_hours: row.get("period_hours"),
            filter_prompt: row.get("filter_prompt"),
            category_id: row.get("category_id"),
            channels: row.get("channels"),
            last_active: row.get("last_active"),
            with_image: row.get("with_image"),
        }
    }
}

#[async_trait]
impl ConfigStore for AutopostingStore {
    async fn list_all(&self) -> Result<Vec<AutopostingConfig>> {
        let client = self.pool.get().await?;

        let rows = client
            .query(
                r#"
                SELECT id, organization_id, enabled, period_hours,
                       filter_prompt, category_id, channels, last_active,
                       with_image
                FROM autoposting
                ORDER BY created_at
                "#,
                &[],
            )
            .await?;

        Ok(rows.iter().map(Self::from_row).collect())
    }

    async fn update_last_active(&self, id: Uuid, ts: DateTime<Utc>) -> Result<()> {
        let client = self.pool.get().await?;

        client
            .execute(
                "UPDATE autoposting SET last_active = $2 WHERE id = $1",
                &[&id, &ts],
            )
            .await?;

        Ok(())
    }
}
