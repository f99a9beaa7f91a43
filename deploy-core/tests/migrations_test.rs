/// Tests for state store migrations

#[cfg(test)]
mod tests {
    use deploy_core::migrations::{register_migrations, Migration, MigrationFuture, MigrationRunner};
    use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
    use std::time::Duration;

    async fn create_test_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(5))
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create test pool")
    }

    fn broken_up(pool: &SqlitePool) -> MigrationFuture<'_> {
        Box::pin(async move {
            sqlx::query("INVALID SQL SYNTAX!!!").execute(pool).await?;
            Ok(())
        })
    }

    fn noop(_pool: &SqlitePool) -> MigrationFuture<'_> {
        Box::pin(async { Ok(()) })
    }

    async fn table_exists(pool: &SqlitePool, table: &str) -> bool {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?")
                .bind(table)
                .fetch_optional(pool)
                .await
                .expect("Should query sqlite_master");
        row.is_some()
    }

    #[tokio::test]
    async fn test_migration_runner_initialization() {
        let pool = create_test_pool().await;
        let mut runner = MigrationRunner::new(pool);

        register_migrations(&mut runner);

        let versions: Vec<u32> = runner.migrations().iter().map(|m| m.version).collect();
        assert_eq!(versions, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_migration_up_creates_store_tables() {
        let pool = create_test_pool().await;
        let mut runner = MigrationRunner::new(pool);
        register_migrations(&mut runner);

        runner.migrate_up(None).await.expect("Migration should succeed");

        assert_eq!(runner.get_current_version().await.unwrap(), Some(2));
        assert!(table_exists(runner.pool(), "deployment_records").await);
        assert!(table_exists(runner.pool(), "run_lock").await);
    }

    #[tokio::test]
    async fn test_migration_target_version() {
        let pool = create_test_pool().await;
        let mut runner = MigrationRunner::new(pool);
        register_migrations(&mut runner);

        runner.migrate_up(Some(1)).await.expect("Migration should succeed");

        assert_eq!(runner.get_current_version().await.unwrap(), Some(1));
        assert!(table_exists(runner.pool(), "deployment_records").await);
        assert!(!table_exists(runner.pool(), "run_lock").await);
    }

    #[tokio::test]
    async fn test_migration_rollback() {
        let pool = create_test_pool().await;
        let mut runner = MigrationRunner::new(pool);
        register_migrations(&mut runner);

        runner.migrate_up(None).await.expect("Migration should succeed");
        runner.migrate_down(1).await.expect("Rollback should succeed");

        assert_eq!(runner.get_current_version().await.unwrap(), Some(1));
        assert!(!table_exists(runner.pool(), "run_lock").await);
        assert!(table_exists(runner.pool(), "deployment_records").await);
    }

    #[tokio::test]
    async fn test_migration_applied_migrations() {
        let pool = create_test_pool().await;
        let mut runner = MigrationRunner::new(pool);
        register_migrations(&mut runner);

        runner.migrate_up(None).await.expect("Migration should succeed");

        let applied = runner.get_applied_migrations().await.expect("Should get applied migrations");
        assert_eq!(applied.get(&1).map(String::as_str), Some("deployment_records"));
        assert_eq!(applied.get(&2).map(String::as_str), Some("run_lock"));
    }

    #[tokio::test]
    async fn test_migration_idempotency() {
        let pool = create_test_pool().await;
        let mut runner = MigrationRunner::new(pool);
        register_migrations(&mut runner);

        runner.migrate_up(None).await.expect("First migration should succeed");
        let version_after_first = runner.get_current_version().await.unwrap();

        runner.migrate_up(None).await.expect("Second migration should succeed");
        let version_after_second = runner.get_current_version().await.unwrap();

        assert_eq!(version_after_first, version_after_second);
    }

    #[tokio::test]
    async fn test_migration_error_handling() {
        let pool = create_test_pool().await;
        let mut runner = MigrationRunner::new(pool);

        runner.add_migration(Migration {
            version: 1,
            name: "broken".to_string(),
            up: broken_up,
            down: noop,
        });

        let result = runner.migrate_up(None).await;
        assert!(result.is_err());
        assert_eq!(runner.get_current_version().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_migration_gap_is_rejected() {
        let pool = create_test_pool().await;
        let mut runner = MigrationRunner::new(pool);

        runner.add_migration(Migration {
            version: 3,
            name: "skips_ahead".to_string(),
            up: noop,
            down: noop,
        });

        assert!(runner.migrate_up(None).await.is_err());
    }

    #[tokio::test]
    async fn test_migration_ensures_table() {
        let pool = create_test_pool().await;
        let runner = MigrationRunner::new(pool);

        runner.ensure_migrations_table().await.expect("Should create table");

        let result = sqlx::query("SELECT COUNT(*) FROM schema_migrations")
            .fetch_one(runner.pool())
            .await;
        assert!(result.is_ok());
    }
}
