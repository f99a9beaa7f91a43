/// Migration runner for state store schema versioning

use sqlx::sqlite::SqlitePool;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration {version} not found")]
    NotFound { version: u32 },

    #[error("Migration execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Invalid migration: {0}")]
    InvalidMigration(String),
}

pub type MigrationFuture<'a> = Pin<Box<dyn Future<Output = Result<(), sqlx::Error>> + Send + 'a>>;
pub type MigrationFn = for<'a> fn(&'a SqlitePool) -> MigrationFuture<'a>;

pub struct Migration {
    pub version: u32,
    pub name: String,
    pub up: MigrationFn,
    pub down: MigrationFn,
}

pub struct MigrationRunner {
    pool: SqlitePool,
    migrations: Vec<Migration>,
}

impl MigrationRunner {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            migrations: Vec::new(),
        }
    }

    pub fn add_migration(&mut self, migration: Migration) {
        self.migrations.push(migration);
        self.migrations.sort_by_key(|m| m.version);
    }

    pub fn migrations(&self) -> &[Migration] {
        &self.migrations
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn ensure_migrations_table(&self) -> Result<(), MigrationError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_current_version(&self) -> Result<Option<u32>, MigrationError> {
        self.ensure_migrations_table().await?;

        let (version,) = sqlx::query_as::<_, (Option<i64>,)>(
            "SELECT MAX(version) FROM schema_migrations"
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(version.map(|v| v as u32))
    }

    pub async fn get_applied_migrations(&self) -> Result<HashMap<u32, String>, MigrationError> {
        self.ensure_migrations_table().await?;

        let rows = sqlx::query_as::<_, (i64, String)>(
            "SELECT version, name FROM schema_migrations ORDER BY version"
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(v, n)| (v as u32, n)).collect())
    }

    pub async fn migrate_up(&self, target_version: Option<u32>) -> Result<(), MigrationError> {
        self.ensure_migrations_table().await?;

        let mut current_version = self.get_current_version().await?;
        let applied = self.get_applied_migrations().await?;

        let target = target_version.unwrap_or_else(|| {
            self.migrations
                .iter()
                .map(|m| m.version)
                .max()
                .unwrap_or(0)
        });

        for migration in self.migrations.iter().filter(|m| m.version <= target) {
            if applied.contains_key(&migration.version) {
                continue;
            }

            // Versions are applied strictly in sequence
            let expected = current_version.map_or(1, |v| v + 1);
            if migration.version != expected {
                return Err(MigrationError::InvalidMigration(format!(
                    "Migration {} cannot be applied: expected version {}",
                    migration.version, expected
                )));
            }

            (migration.up)(&self.pool).await.map_err(|e| {
                MigrationError::ExecutionFailed(format!(
                    "Migration {} ({}) failed: {}",
                    migration.version, migration.name, e
                ))
            })?;

            sqlx::query("INSERT INTO schema_migrations (version, name) VALUES (?, ?)")
                .bind(migration.version as i64)
                .bind(&migration.name)
                .execute(&self.pool)
                .await?;

            tracing::debug!(version = migration.version, name = %migration.name, "applied migration");
            current_version = Some(migration.version);
        }

        Ok(())
    }

    pub async fn migrate_down(&self, target_version: u32) -> Result<(), MigrationError> {
        self.ensure_migrations_table().await?;

        let current_version = self
            .get_current_version()
            .await?
            .ok_or(MigrationError::NotFound { version: 0 })?;

        let migrations_to_rollback = self
            .migrations
            .iter()
            .rev()
            .filter(|m| m.version > target_version && m.version <= current_version);

        for migration in migrations_to_rollback {
            (migration.down)(&self.pool).await.map_err(|e| {
                MigrationError::ExecutionFailed(format!(
                    "Rollback of migration {} ({}) failed: {}",
                    migration.version, migration.name, e
                ))
            })?;

            sqlx::query("DELETE FROM schema_migrations WHERE version = ?")
                .bind(migration.version as i64)
                .execute(&self.pool)
                .await?;
        }

        Ok(())
    }
}
