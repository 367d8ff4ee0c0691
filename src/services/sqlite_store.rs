//! SqliteStore: inventory rows in a single `inventory` table.
//!
//! Each repository call is exactly one auto-committed statement; nothing
//! spans statements, so read-then-write sequences in the service layer can
//! race with other requests.

use crate::{
    models::item::{Item, ItemPatch},
    services::repository::{ItemRepository, StorageError, StorageResult},
};
use async_trait::async_trait;
use sqlx::{QueryBuilder, SqlitePool, sqlite::Sqlite};
use std::sync::Arc;
use tracing::debug;

const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

#[derive(Clone)]
pub struct SqliteStore {
    /// Shared SQLite connection pool.
    db: Arc<SqlitePool>,
}

impl SqliteStore {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// Create the `inventory` table when it does not exist yet.
    pub async fn ensure_schema(&self) -> StorageResult<()> {
        let statements = SCHEMA
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty());
        for stmt in statements {
            debug!("executing schema SQL: {}", stmt);
            sqlx::query(stmt).execute(&*self.db).await?;
        }
        Ok(())
    }
}

/// Map `RowNotFound` to the domain `NotFound`.
fn not_found(id: &str) -> impl FnOnce(sqlx::Error) -> StorageError + '_ {
    move |err| match err {
        sqlx::Error::RowNotFound => StorageError::NotFound(id.to_string()),
        other => StorageError::Sqlx(other),
    }
}

/// Return true if SQLx error indicates a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.message().to_ascii_lowercase().contains("unique")
    )
}

#[async_trait]
impl ItemRepository for SqliteStore {
    async fn list_all(&self) -> StorageResult<Vec<Item>> {
        let rows = sqlx::query_as::<_, Item>(
            "SELECT id, name, description, photo_path FROM inventory ORDER BY rowid ASC",
        )
        .fetch_all(&*self.db)
        .await?;
        Ok(rows)
    }

    async fn get_by_id(&self, id: &str) -> StorageResult<Item> {
        sqlx::query_as::<_, Item>(
            "SELECT id, name, description, photo_path FROM inventory WHERE id = ?",
        )
        .bind(id)
        .fetch_one(&*self.db)
        .await
        .map_err(not_found(id))
    }

    async fn insert(&self, item: Item) -> StorageResult<Item> {
        let result = sqlx::query_as::<_, Item>(
            r#"
            INSERT INTO inventory (id, name, description, photo_path)
            VALUES (?, ?, ?, ?)
            RETURNING id, name, description, photo_path
            "#,
        )
        .bind(&item.id)
        .bind(&item.name)
        .bind(&item.description)
        .bind(&item.photo_path)
        .fetch_one(&*self.db)
        .await;

        match result {
            Ok(stored) => Ok(stored),
            Err(err) if is_unique_violation(&err) => Err(StorageError::Conflict(item.id)),
            Err(err) => Err(StorageError::Sqlx(err)),
        }
    }

    async fn update(&self, id: &str, patch: &ItemPatch) -> StorageResult<Item> {
        if patch.is_empty() {
            return Err(StorageError::EmptyUpdate);
        }

        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE inventory SET ");
        let mut set = builder.separated(", ");
        if let Some(name) = &patch.name {
            set.push("name = ");
            set.push_bind_unseparated(name);
        }
        if let Some(description) = &patch.description {
            set.push("description = ");
            set.push_bind_unseparated(description);
        }
        builder.push(" WHERE id = ");
        builder.push_bind(id);
        builder.push(" RETURNING id, name, description, photo_path");

        builder
            .build_query_as::<Item>()
            .fetch_one(&*self.db)
            .await
            .map_err(not_found(id))
    }

    async fn set_photo(&self, id: &str, photo_path: Option<String>) -> StorageResult<Item> {
        sqlx::query_as::<_, Item>(
            "UPDATE inventory SET photo_path = ? WHERE id = ?
             RETURNING id, name, description, photo_path",
        )
        .bind(photo_path)
        .bind(id)
        .fetch_one(&*self.db)
        .await
        .map_err(not_found(id))
    }

    async fn delete(&self, id: &str) -> StorageResult<()> {
        let result = sqlx::query("DELETE FROM inventory WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn ping(&self) -> StorageResult<()> {
        match sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&*self.db)
            .await?
        {
            1 => Ok(()),
            other => Err(StorageError::Sqlx(sqlx::Error::Protocol(format!(
                "unexpected ping result: {}",
                other
            )))),
        }
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}
