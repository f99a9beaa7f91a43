use super::{DeploymentRecord, StateStore};
use crate::error::{DeployError, Result};
use crate::migrations;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::time::Duration;

type RecordRow = (String, String, String, i64, Option<String>);

const RECORD_COLUMNS: &str = "name, address, constructor_args, deployed_at, run_id";

/// Durable state store backed by a SQLite file.
///
/// Records are append-only; the current record for a name is the one with the
/// highest row id.
pub struct SqliteStateStore {
    pool: SqlitePool,
}

impl SqliteStateStore {
    pub async fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(
                SqliteConnectOptions::new()
                    .filename(db_path)
                    .create_if_missing(true)
                    .busy_timeout(Duration::from_secs(5)),
            )
            .await?;

        Self::from_pool(pool).await
    }

    /// Wrap an existing pool, bringing its schema up to date.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        migrations::migrate(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn record_from_row(row: RecordRow) -> Result<DeploymentRecord> {
        let (name, address, args, deployed_at, run_id) = row;
        let constructor_args = serde_json::from_str(&args)?;
        let timestamp = Utc
            .timestamp_millis_opt(deployed_at)
            .single()
            .ok_or_else(|| {
                DeployError::Unknown(format!("record for {} has invalid timestamp {}", name, deployed_at))
            })?;

        Ok(DeploymentRecord {
            name,
            address,
            constructor_args,
            timestamp,
            run_id,
        })
    }
}

#[async_trait]
impl StateStore for SqliteStateStore {
    async fn get(&self, name: &str) -> Result<Option<DeploymentRecord>> {
        let row = sqlx::query_as::<_, RecordRow>(&format!(
            "SELECT {} FROM deployment_records WHERE name = ?1 ORDER BY id DESC LIMIT 1",
            RECORD_COLUMNS
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::record_from_row).transpose()
    }

    async fn put(&self, record: &DeploymentRecord) -> Result<()> {
        let args = serde_json::to_string(&record.constructor_args)?;

        sqlx::query(
            r#"
            INSERT INTO deployment_records (name, address, constructor_args, deployed_at, run_id)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&record.name)
        .bind(&record.address)
        .bind(&args)
        .bind(record.timestamp.timestamp_millis())
        .bind(&record.run_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn all(&self) -> Result<Vec<DeploymentRecord>> {
        let rows = sqlx::query_as::<_, RecordRow>(&format!(
            r#"
            SELECT {} FROM deployment_records
            WHERE id IN (SELECT MAX(id) FROM deployment_records GROUP BY name)
            ORDER BY name
            "#,
            RECORD_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::record_from_row).collect()
    }

    async fn history(&self, name: &str) -> Result<Vec<DeploymentRecord>> {
        let rows = sqlx::query_as::<_, RecordRow>(&format!(
            "SELECT {} FROM deployment_records WHERE name = ?1 ORDER BY id DESC",
            RECORD_COLUMNS
        ))
        .bind(name)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::record_from_row).collect()
    }

    async fn acquire_lock(&self, run_id: &str) -> Result<()> {
        // A release can land between the insert and the read; try once more
        for _ in 0..2 {
            let inserted = sqlx::query(
                "INSERT OR IGNORE INTO run_lock (id, holder, acquired_at) VALUES (1, ?1, ?2)",
            )
            .bind(run_id)
            .bind(Utc::now().timestamp_millis())
            .execute(&self.pool)
            .await?;

            if inserted.rows_affected() == 1 {
                return Ok(());
            }

            let holder = sqlx::query_as::<_, (String,)>("SELECT holder FROM run_lock WHERE id = 1")
                .fetch_optional(&self.pool)
                .await?;

            match holder {
                Some((holder,)) if holder == run_id => return Ok(()),
                Some((holder,)) => return Err(DeployError::StoreLocked { holder }),
                None => continue,
            }
        }

        Err(DeployError::StoreLocked {
            holder: "unknown".to_string(),
        })
    }

    async fn release_lock(&self, run_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM run_lock WHERE id = 1 AND holder = ?1")
            .bind(run_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn break_lock(&self) -> Result<Option<String>> {
        let holder = sqlx::query_as::<_, (String,)>("SELECT holder FROM run_lock WHERE id = 1")
            .fetch_optional(&self.pool)
            .await?;

        sqlx::query("DELETE FROM run_lock WHERE id = 1")
            .execute(&self.pool)
            .await?;

        Ok(holder.map(|(h,)| h))
    }
}
