//! Publication rows and organization lookups
//!
//! The engine only supplies draft inputs and drives the one moderation
//! short-circuit it owns; everything else about publications is managed by
//! the surrounding platform.

use async_trait::async_trait;
use deadpool_postgres::Pool;
use tracing::warn;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{Employee, EmployeeRole, ModerationStatus, NewPublication, PublicationSource};

/// Repository contract for publication rows and organization lookups
///
/// The draft-generation pipeline depends on this trait rather than the
/// concrete store so it can run against an in-memory fake in tests.
#[async_trait]
pub trait PublicationRepo: Send + Sync {
    /// Insert a draft publication, returning its id
    async fn create(&self, publication: &NewPublication) -> Result<Uuid>;

    /// Tag a publication with its source
    async fn set_source(&self, id: Uuid, source: PublicationSource) -> Result<()>;

    /// Transition a publication's moderation status
    async fn moderate(
        &self,
        id: Uuid,
        moderator_id: Option<Uuid>,
        status: ModerationStatus,
        comment: &str,
    ) -> Result<()>;

    /// List an organization's employees
    async fn list_employees(&self, organization_id: Uuid) -> Result<Vec<Employee>>;

    /// Look up a category's display name
    async fn category_name(&self, category_id: Uuid) -> Result<String>;
}

/// PostgreSQL-backed publication repository
pub struct PublicationStore {
    pool: Pool,
}

impl PublicationStore {
    /// Create a new store
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PublicationRepo for PublicationStore {
    /// Insert a draft publication, returning its id
    async fn create(&self, publication: &NewPublication) -> Result<Uuid> {
        let client = self.pool.get().await?;
        let id = Uuid::new_v4();

        client
            .execute(
                r#"
                INSERT INTO publications
                    (id, organization_id, category_id, source_text, text,
                     image_url, moderation_status)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
                &[
                    &id,
                    &publication.organization_id,
                    &publication.category_id,
                    &publication.source_text,
                    &publication.text,
                    &publication.image_url,
                    &publication.status.as_str(),
                ],
            )
            .await?;

        Ok(id)
    }

    /// Tag a publication with its source
    async fn set_source(&self, id: Uuid, source: PublicationSource) -> Result<()> {
        let client = self.pool.get().await?;

        client
            .execute(
                "UPDATE publications SET source = $2 WHERE id = $1",
                &[&id, &source.as_str()],
            )
            .await?;

        Ok(())
    }

    /// Transition a publication's moderation status
    async fn moderate(
        &self,
        id: Uuid,
        moderator_id: Option<Uuid>,
        status: ModerationStatus,
        comment: &str,
    ) -> Result<()> {
        let client = self.pool.get().await?;

        client
            .execute(
                r#"
                UPDATE publications
                SET moderation_status = $2, moderator_id = $3,
                    moderation_comment = $4
                WHERE id = $1
                "#,
                &[&id, &status.as_str(), &moderator_id, &comment],
            )
            .await?;

        Ok(())
    }

    /// List an organization's employees
    ///
    /// Rows with unknown roles are skipped with a warning rather than
    /// failing the whole lookup.
    async fn list_employees(&self, organization_id: Uuid) -> Result<Vec<Employee>> {
        let client = self.pool.get().await?;

        let rows = client
            .query(
                "SELECT id, organization_id, role FROM employees WHERE organization_id = $1",
                &[&organization_id],
            )
            .await?;

        let employees = rows
            .iter()
            .filter_map(|row| {
                let raw_role: String = row.get("role");
                match EmployeeRole::parse(&raw_role) {
                    Some(role) => Some(Employee {
                        id: row.get("id"),
                        organization_id: row.get("organization_id"),
                        role,
                    }),
                    None => {
                        warn!(role = %raw_role, "Skipping employee with unknown role");
                        None
                    }
                }
            })
            .collect();

        Ok(employees)
    }

    /// Look up a category's display name
    async fn category_name(&self, category_id: Uuid) -> Result<String> {
        let client = self.pool.get().await?;

        let row = client
            .query_opt("SELECT name FROM categories WHERE id = $1", &[&category_id])
            .await?;

        match row {
            Some(row) => Ok(row.get(0)),
            None => Err(Error::other(format!("Unknown category: {category_id}"))),
        }
    }
}
