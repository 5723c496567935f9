use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use super::{ProfileId, StateStore, StorageError, StorageKey};

/// Client state persisted in the `client_state` table.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool against `database_url` and apply pending migrations.
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(8)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;
        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    pub async fn migrate(&self) -> Result<(), StorageError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        log::info!("Client state migrations complete");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Delete rows that have not been written for `days` days. Returns the number removed.
    pub async fn evict_older_than(&self, days: i64) -> Result<u64, StorageError> {
        let result = sqlx::query(
            "DELETE FROM client_state
             WHERE updated_at < now() - make_interval(days => $1::int)",
        )
        .bind(days)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

impl StateStore for PgStore {
    async fn get(&self, profile: &ProfileId, key: &StorageKey) -> Result<Option<String>, StorageError> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT value FROM client_state WHERE profile_id = $1 AND key = $2",
        )
        .bind(profile.as_str())
        .bind(key.name())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| r.0))
    }

    async fn set(&self, profile: &ProfileId, key: &StorageKey, value: &str) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO client_state (profile_id, key, value, updated_at)
             VALUES ($1, $2, $3, now())
             ON CONFLICT (profile_id, key)
             DO UPDATE SET value = EXCLUDED.value, updated_at = now()",
        )
        .bind(profile.as_str())
        .bind(key.name())
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove(&self, profile: &ProfileId, key: &StorageKey) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM client_state WHERE profile_id = $1 AND key = $2")
            .bind(profile.as_str())
            .bind(key.name())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
