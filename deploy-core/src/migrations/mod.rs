/// State store schema migrations

pub mod runner;

pub use runner::{Migration, MigrationError, MigrationFn, MigrationFuture, MigrationRunner};

use sqlx::sqlite::SqlitePool;

/// Register all migrations
pub fn register_migrations(runner: &mut MigrationRunner) {
    runner.add_migration(Migration {
        version: 1,
        name: "deployment_records".to_string(),
        up: m001_up,
        down: m001_down,
    });

    runner.add_migration(Migration {
        version: 2,
        name: "run_lock".to_string(),
        up: m002_up,
        down: m002_down,
    });
}

/// Bring a pool up to the latest schema.
pub async fn migrate(pool: &SqlitePool) -> Result<(), MigrationError> {
    let mut runner = MigrationRunner::new(pool.clone());
    register_migrations(&mut runner);
    runner.migrate_up(None).await
}

fn m001_up(pool: &SqlitePool) -> MigrationFuture<'_> {
    Box::pin(m001_deployment_records::up(pool))
}

fn m001_down(pool: &SqlitePool) -> MigrationFuture<'_> {
    Box::pin(m001_deployment_records::down(pool))
}

fn m002_up(pool: &SqlitePool) -> MigrationFuture<'_> {
    Box::pin(m002_run_lock::up(pool))
}

fn m002_down(pool: &SqlitePool) -> MigrationFuture<'_> {
    Box::pin(m002_run_lock::down(pool))
}

mod m001_deployment_records {
    use sqlx::sqlite::SqlitePool;

    pub async fn up(pool: &SqlitePool) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS deployment_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                address TEXT NOT NULL,
                constructor_args TEXT NOT NULL,
                deployed_at INTEGER NOT NULL,
                run_id TEXT
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_deployment_records_name ON deployment_records(name)"
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn down(pool: &SqlitePool) -> Result<(), sqlx::Error> {
        sqlx::query("DROP INDEX IF EXISTS idx_deployment_records_name")
            .execute(pool)
            .await?;

        sqlx::query("DROP TABLE IF EXISTS deployment_records")
            .execute(pool)
            .await?;

        Ok(())
    }
}

mod m002_run_lock {
    use sqlx::sqlite::SqlitePool;

    pub async fn up(pool: &SqlitePool) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS run_lock (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                holder TEXT NOT NULL,
                acquired_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn down(pool: &SqlitePool) -> Result<(), sqlx::Error> {
        sqlx::query("DROP TABLE IF EXISTS run_lock")
            .execute(pool)
            .await?;

        Ok(())
    }
}
