use std::collections::HashMap;
use std::str::FromStr;

use sqlx::{types::Json, PgPool, Row};

use crate::models::request::{Request, RequestKind, RequestRow, RequestVideo};

/// Durable, coalescing identification queue backed by `scanner.requests`.
///
/// Rows are unique by `(kind, title, year)`: enqueueing an already-known
/// work appends its videos to the existing row instead of duplicating it.
/// Workers race on `for update skip locked` so any number of processes can
/// drain the same table.
#[derive(Debug)]
pub struct RequestQueue {
    pool: PgPool,
}

impl RequestQueue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn enqueue(&self, requests: &[Request]) -> Result<(), sqlx::Error> {
        if requests.is_empty() {
            return Ok(());
        }
        for request in requests {
            sqlx::query(
                r#"
                insert into scanner.requests(kind, title, year, external_id, videos)
                    values ($1, $2, $3, $4, $5)
                on conflict (kind, title, year)
                    do update set
                        videos = requests.videos || excluded.videos
                "#,
            )
            .bind(request.kind.as_str())
            .bind(&request.title)
            .bind(request.year)
            .bind(Json(&request.external_id))
            .bind(Json(&request.videos))
            .execute(&self.pool)
            .await?;
        }
        sqlx::query("notify scanner_requests")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Claim one pending request, marking it running. Returns `None` when
    /// the queue is drained.
    pub async fn dequeue(&self) -> Result<Option<Request>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            update scanner.requests
            set status = 'running', started_at = now()
            where pk in (
                select pk from scanner.requests
                where status = 'pending'
                for update skip locked
                limit 1
            )
            returning pk, kind, title, year, external_id, videos
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| {
            let kind: String = row.get("kind");
            let external_id: Json<HashMap<String, String>> = row.get("external_id");
            let videos: Json<Vec<RequestVideo>> = row.get("videos");
            Request {
                pk: row.get("pk"),
                kind: RequestKind::from_str(&kind).unwrap_or(RequestKind::Movie),
                title: row.get("title"),
                year: row.get("year"),
                external_id: external_id.0,
                videos: videos.0,
            }
        }))
    }

    /// Remove a finished request and return the videos it held at that
    /// moment. A concurrent enqueue may have grown the list since the
    /// worker dequeued, the caller compares and links the difference.
    pub async fn complete(&self, pk: i64) -> Result<Vec<RequestVideo>, sqlx::Error> {
        let row = sqlx::query("delete from scanner.requests where pk = $1 returning videos")
            .bind(pk)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row
            .map(|row| row.get::<Json<Vec<RequestVideo>>, _>("videos").0)
            .unwrap_or_default())
    }

    pub async fn fail(&self, pk: i64) -> Result<(), sqlx::Error> {
        sqlx::query("update scanner.requests set status = 'failed' where pk = $1")
            .bind(pk)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Failed rows are only retried through a new scan.
    pub async fn clear_failed(&self) -> Result<(), sqlx::Error> {
        sqlx::query("delete from scanner.requests where status = 'failed'")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Requests stuck in `running` belong to a dead worker, give them back
    /// to the pool. Run by the elected master at startup.
    pub async fn recover_running(&self) -> Result<(), sqlx::Error> {
        let result =
            sqlx::query("update scanner.requests set status = 'pending', started_at = null where status = 'running'")
                .execute(&self.pool)
                .await?;
        if result.rows_affected() > 0 {
            tracing::info!(
                "Recovered {} requests stuck in running state",
                result.rows_affected()
            );
        }
        Ok(())
    }

    pub async fn list(&self, status: Option<&str>) -> Result<Vec<RequestRow>, sqlx::Error> {
        let query = match status {
            Some(_) => {
                r#"
                select pk::text as id, kind, title, year, status, started_at
                from scanner.requests
                where status = $1
                order by started_at, pk
                "#
            }
            None => {
                r#"
                select pk::text as id, kind, title, year, status, started_at
                from scanner.requests
                order by started_at, pk
                "#
            }
        };
        let mut q = sqlx::query_as::<_, RequestRow>(query);
        if let Some(status) = status {
            q = q.bind(status);
        }
        q.fetch_all(&self.pool).await
    }
}
