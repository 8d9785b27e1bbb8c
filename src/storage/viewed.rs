//! Viewed-link ledger
//!
//! Append-only record of links already considered for a (config, channel)
//! pair: rejected by the classifier, or chosen as a cycle's winner. Rows
//! are never updated or deleted by this worker. The unique constraint makes
//! `record` idempotent.

use async_trait::async_trait;
use deadpool_postgres::Pool;
use uuid::Uuid;

use crate::engine::ports::ViewedLinkLedger;
use crate::error::Result;

/// PostgreSQL-backed viewed-link ledger
pub struct ViewedLinkStore {
    pool: Pool,
}

impl ViewedLinkStore {
    /// Create a new ledger store
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ViewedLinkLedger for ViewedLinkStore {
    async fn list_links(&self, autoposting_id: Uuid, channel: &str) -> Result<Vec<String>> {
        let client = self.pool.get().await?;

        let rows = client
            .query(
                r#"
                SELECT link FROM autoposting_viewed
                WHERE autoposting_id = $1 AND channel = $2
                "#,
                &[&autoposting_id, &channel],
            )
            .await?;

        Ok(rows.iter().map(|row| row.get(0)).collect())
    }

    async fn record(&self, autoposting_id: Uuid, channel: &str, link: &str) -> Result<()> {
        let client = self.pool.get().await?;

        client
            .execute(
                r#"
                INSERT INTO autoposting_viewed (autoposting_id, channel, link)
                VALUES ($1, $2, $3)
                ON CONFLICT (autoposting_id, channel, link) DO NOTHING
                "#,
                &[&autoposting_id, &channel, &link],
            )
            .await?;

        Ok(())
    }
}
