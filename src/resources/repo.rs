use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::resources::dto::ResourceUpdate;

/// A single resource.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Resource {
    pub id: Uuid,
    pub name: String,
    pub data: Option<serde_json::Value>,
}

impl Resource {
    pub async fn list(
        db: &PgPool,
        name_filter: Option<&str>,
        skip: i64,
        size: i64,
    ) -> anyhow::Result<Vec<Resource>> {
        let rows = match name_filter {
            Some(q) => {
                sqlx::query_as::<_, Resource>(
                    r#"
                    SELECT id, name, data
                    FROM resources
                    WHERE name ILIKE $1
                    ORDER BY name
                    LIMIT $2 OFFSET $3
                    "#,
                )
                .bind(format!("%{q}%"))
                .bind(size)
                .bind(skip)
                .fetch_all(db)
                .await?
            }
            None => {
                sqlx::query_as::<_, Resource>(
                    r#"
                    SELECT id, name, data
                    FROM resources
                    ORDER BY name
                    LIMIT $1 OFFSET $2
                    "#,
                )
                .bind(size)
                .bind(skip)
                .fetch_all(db)
                .await?
            }
        };
        Ok(rows)
    }

    pub async fn get(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Resource>> {
        let resource = sqlx::query_as::<_, Resource>(
            r#"
            SELECT id, name, data
            FROM resources
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(resource)
    }

    pub async fn insert(db: &PgPool, resource: &Resource) -> anyhow::Result<Resource> {
        let created = sqlx::query_as::<_, Resource>(
            r#"
            INSERT INTO resources (id, name, data)
            VALUES ($1, $2, $3)
            RETURNING id, name, data
            "#,
        )
        .bind(resource.id)
        .bind(&resource.name)
        .bind(&resource.data)
        .fetch_one(db)
        .await?;
        Ok(created)
    }

    /// Replace-by-id; inserts when the id is new.
    pub async fn upsert(db: &PgPool, resource: &Resource) -> anyhow::Result<Resource> {
        let replaced = sqlx::query_as::<_, Resource>(
            r#"
            INSERT INTO resources (id, name, data)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, data = EXCLUDED.data
            RETURNING id, name, data
            "#,
        )
        .bind(resource.id)
        .bind(&resource.name)
        .bind(&resource.data)
        .fetch_one(db)
        .await?;
        Ok(replaced)
    }

    /// Partial update; unset fields keep their stored value.
    pub async fn update(
        db: &PgPool,
        id: Uuid,
        update: &ResourceUpdate,
    ) -> anyhow::Result<Option<Resource>> {
        let updated = sqlx::query_as::<_, Resource>(
            r#"
            UPDATE resources
            SET name = COALESCE($2, name), data = COALESCE($3, data)
            WHERE id = $1
            RETURNING id, name, data
            "#,
        )
        .bind(id)
        .bind(&update.name)
        .bind(&update.data)
        .fetch_optional(db)
        .await?;
        Ok(updated)
    }

    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM resources WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
