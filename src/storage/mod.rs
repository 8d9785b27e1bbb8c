//! PostgreSQL persistence
//!
//! This module owns the connection pool and the repositories the engine
//! talks to: autoposting configs, the viewed-link ledger, and publication
//! rows. All SQL lives here; the engine only sees the port traits.

pub mod autoposting;
pub mod publications;
pub mod viewed;

use anyhow::{Context, Result};
use deadpool_postgres::{Config as PoolConfig, ManagerConfig, Pool, RecyclingMethod, Runtime};
use tokio_postgres::NoTls;

use crate::config::DatabaseConfig;

pub use autoposting::AutopostingStore;
pub use publications::{PublicationRepo, PublicationStore};
pub use viewed::ViewedLinkStore;

/// Create a PostgreSQL connection pool and verify connectivity
pub async fn create_pool(config: &DatabaseConfig) -> Result<Pool> {
    let mut cfg = PoolConfig::new();
    cfg.url = Some(config.postgres_url.clone());
    cfg.manager = Some(ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    });

    let pool = cfg
        .create_pool(Some(Runtime::Tokio1), NoTls)
        .context("Failed to create PostgreSQL connection pool")?;

    // Test connection
    let client = pool.get().await.context("Failed to connect to PostgreSQL")?;
    client.simple_query("SELECT 1").await?;

    Ok(pool)
}

/// Initialize the database schema
///
/// Creates the tables this worker touches. The `categories` and `employees`
/// tables are owned by the surrounding platform; they are created here only
/// so a standalone deployment can bootstrap itself.
pub async fn init_schema(pool: &Pool) -> Result<()> {
    let client = pool.get().await?;

    client
        .batch_execute(
            r#"
            CREATE TABLE IF NOT EXISTS autoposting (
                id UUID PRIMARY KEY,
                organization_id UUID NOT NULL,
                enabled BOOLEAN NOT NULL DEFAULT TRUE,
                period_hours BIGINT NOT NULL,
                filter_prompt TEXT NOT NULL,
                category_id UUID NOT NULL,
                channels TEXT[] NOT NULL DEFAULT '{}',
                last_active TIMESTAMPTZ,
                with_image BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            );

            CREATE TABLE IF NOT EXISTS autoposting_viewed (
                id BIGSERIAL PRIMARY KEY,
                autoposting_id UUID NOT NULL,
                channel TEXT NOT NULL,
                link TEXT NOT NULL,
                viewed_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                UNIQUE (autoposting_id, channel, link)
            );

            CREATE INDEX IF NOT EXISTS idx_autoposting_viewed_pair
                ON autoposting_viewed(autoposting_id, channel);

            CREATE TABLE IF NOT EXISTS publications (
                id UUID PRIMARY KEY,
                organization_id UUID NOT NULL,
                category_id UUID NOT NULL,
                source_text TEXT NOT NULL,
                text TEXT NOT NULL,
                image_url TEXT,
                source TEXT,
                moderation_status TEXT NOT NULL DEFAULT 'draft',
                moderator_id UUID,
                moderation_comment TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            );

            CREATE INDEX IF NOT EXISTS idx_publications_status
                ON publications(moderation_status);

            CREATE TABLE IF NOT EXISTS categories (
                id UUID PRIMARY KEY,
                name TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS employees (
                id UUID PRIMARY KEY,
                organization_id UUID NOT NULL,
                role TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_employees_org
                ON employees(organization_id);
            "#,
        )
        .await
        .context("Failed to create schema")?;

    tracing::info!("Database schema initialized");
    Ok(())
}
