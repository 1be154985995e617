//! Database layer: migrations and the session staging log.

use async_trait::async_trait;
use campaign_flow::{SessionStorage, StorageError};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use tracing::info;

use crate::errors::{GatewayError, Result};

/// Establish a SQLite connection pool and run pending migrations.
pub async fn init_pool(database_url: &str) -> Result<SqlitePool> {
    // Make sure the file is created if it doesn't exist yet.
    let url = if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite:{database_url}")
    };
    let url = if url.contains(":memory:") || url.contains("mode=") {
        url
    } else if url.contains('?') {
        format!("{url}&mode=rwc")
    } else {
        format!("{url}?mode=rwc")
    };

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await?;

    migrate(&pool).await?;
    Ok(pool)
}

pub async fn migrate(pool: &SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Database migrations applied successfully");
    Ok(())
}

// ─────────────────────────────────────────────────────────
// Session storage
// ─────────────────────────────────────────────────────────

/// [`SessionStorage`] for a single browser session, backed by the
/// `session_storage` table.
#[derive(Debug, Clone)]
pub struct SqliteSessionStorage {
    pool: SqlitePool,
    session_id: String,
}

impl SqliteSessionStorage {
    pub fn scoped(pool: SqlitePool, session_id: impl Into<String>) -> Self {
        Self {
            pool,
            session_id: session_id.into(),
        }
    }
}

#[async_trait]
impl SessionStorage for SqliteSessionStorage {
    async fn get(&self, key: &str) -> std::result::Result<Option<String>, StorageError> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT value FROM session_storage WHERE session_id = ?1 AND key = ?2",
        )
        .bind(&self.session_id)
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(GatewayError::from)?;
        Ok(row.map(|(v,)| v))
    }

    async fn set(&self, key: &str, value: &str) -> std::result::Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO session_storage (session_id, key, value, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (session_id, key)
            DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(&self.session_id)
        .bind(key)
        .bind(value)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(GatewayError::from)?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> std::result::Result<(), StorageError> {
        sqlx::query("DELETE FROM session_storage WHERE session_id = ?1 AND key = ?2")
            .bind(&self.session_id)
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(GatewayError::from)?;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────
// Sweeping
// ─────────────────────────────────────────────────────────

/// Delete every row of sessions whose newest write is older than `cutoff`
/// (Unix seconds). Returns the number of rows removed.
pub async fn sweep_stale_sessions(pool: &SqlitePool, cutoff: i64) -> Result<u64> {
    let removed = sqlx::query(
        r#"
        DELETE FROM session_storage
        WHERE  session_id IN (
            SELECT session_id
            FROM   session_storage
            GROUP  BY session_id
            HAVING MAX(updated_at) < ?1
        )
        "#,
    )
    .bind(cutoff)
    .execute(pool)
    .await?
    .rows_affected();
    Ok(removed)
}

/// Migrated in-memory database for tests. A single connection keeps every
/// query on the same database.
#[cfg(test)]
pub(crate) async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    migrate(&pool).await.unwrap();
    pool
}
