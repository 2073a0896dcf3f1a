use std::path::Path;

use anyhow::Context;
use sqlx::{
    pool::PoolConnection,
    postgres::{PgPool, PgPoolOptions},
    Postgres,
};

/// Advisory lock electing the single scanner master. Only the master runs
/// migrations, the full scan and the filesystem monitor.
pub const SCANNER_MASTER_LOCK: i64 = 198347;
/// Second election, designating the instance that only serves HTTP.
pub const HTTP_REPLICA_LOCK: i64 = 645633;

#[derive(Debug, Clone)]
pub struct Db {
    pub pool: PgPool,
}

impl Db {
    pub async fn connect(url: &str) -> Result<Db, sqlx::Error> {
        let pool = PgPoolOptions::new().max_connections(10).connect(url).await?;
        Ok(Db { pool })
    }

    pub async fn healthy(&self) -> Result<(), sqlx::Error> {
        sqlx::query("select 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Apply `*.up.sql` files in lexicographic order, the applied count in
    /// `scanner._migrations` is the cursor.
    pub async fn apply_migrations(&self, directory: &Path) -> anyhow::Result<()> {
        sqlx::raw_sql(
            r#"
            create schema if not exists scanner;
            create table if not exists scanner._migrations(
                pk bigserial primary key,
                name text not null,
                applied_at timestamptz not null default now()
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        let applied: i64 = sqlx::query_scalar("select count(*) from scanner._migrations")
            .fetch_one(&self.pool)
            .await?;

        let mut files: Vec<_> = std::fs::read_dir(directory)
            .with_context(|| format!("reading migrations from {}", directory.display()))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .map(|name| name.ends_with(".up.sql"))
                    .unwrap_or(false)
            })
            .collect();
        files.sort();

        for path in files.into_iter().skip(applied as usize) {
            let name = path
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or_default()
                .to_string();
            let sql = std::fs::read_to_string(&path)
                .with_context(|| format!("reading migration {name}"))?;
            let mut tx = self.pool.begin().await?;
            sqlx::raw_sql(&sql)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("applying migration {name}"))?;
            sqlx::query("insert into scanner._migrations(name) values ($1)")
                .bind(&name)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            tracing::info!("Applied migration {name}");
        }
        Ok(())
    }
}

/// A process-wide role won by taking a session advisory lock. The backing
/// connection is parked for the process lifetime, dropping the election
/// releases the lock.
pub struct Election {
    _conn: PoolConnection<Postgres>,
}

impl Election {
    pub async fn try_acquire(pool: &PgPool, key: i64) -> Result<Option<Election>, sqlx::Error> {
        let mut conn = pool.acquire().await?;
        let locked: bool = sqlx::query_scalar("select pg_try_advisory_lock($1)")
            .bind(key)
            .fetch_one(&mut *conn)
            .await?;
        Ok(locked.then_some(Election { _conn: conn }))
    }
}
