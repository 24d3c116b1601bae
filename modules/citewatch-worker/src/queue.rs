//! The `tracking` queue. The broker holds only transient job pointers; the
//! persisted `TrackingJob` row is authoritative, so `JobQueue` claims work
//! directly off that table with `SELECT ... FOR UPDATE SKIP LOCKED` rather
//! than through a separate message broker process. Delivery is
//! at-least-once: a crash between claim and ack leaves the row `processing`,
//! and the reaper (see `planner`) requeues it after `2 * grace`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use citewatch_common::{CoreError, CoreResult, Provider};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct QueueMessage {
    pub job_id: Uuid,
    pub project_id: Uuid,
    pub keyword_id: Uuid,
    pub platform: Provider,
    /// `retry_count` as persisted before this claim; the caller's next
    /// `fail()` backoff is computed from `retry_count + 1`.
    pub retry_count: u32,
}

#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue(&self, project_id: Uuid, keyword_id: Uuid, platform: Provider, scheduled_at: DateTime<Utc>) -> CoreResult<Uuid>;
    /// Claim the next `pending`/`retrying` job whose `scheduled_at` has
    /// passed, atomically transitioning it to `processing`.
    async fn claim_next(&self) -> CoreResult<Option<QueueMessage>>;
    async fn ack(&self, job_id: Uuid) -> CoreResult<()>;
    /// `retry_at` is only consulted when the job is going to `retrying`; it
    /// is the jittered-backoff timestamp computed by the caller (see
    /// `backoff::next_attempt_at`), so a retried job isn't immediately
    /// re-claimable.
    async fn fail(
        &self,
        job_id: Uuid,
        error_message: &str,
        retriable: bool,
        max_retries: u32,
        retry_at: DateTime<Utc>,
    ) -> CoreResult<()>;
    /// Transition jobs stuck `processing` longer than `older_than` back to
    /// `retrying` — the restart-time reaper for crashed workers.
    async fn reap_stuck(&self, older_than: DateTime<Utc>) -> CoreResult<u64>;
}

pub struct PgJobQueue {
    pool: PgPool,
}

impl PgJobQueue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobQueue for PgJobQueue {
    async fn enqueue(&self, project_id: Uuid, keyword_id: Uuid, platform: Provider, scheduled_at: DateTime<Utc>) -> CoreResult<Uuid> {
        let job_id = Uuid::new_v4();
        let row: Option<(Uuid,)> = sqlx::query_as(
            r#"
            INSERT INTO tracking_jobs (id, project_id, keyword_id, platform, status, scheduled_at, retry_count)
            VALUES ($1, $2, $3, $4, 'pending', $5, 0)
            ON CONFLICT (project_id, keyword_id, platform, scheduled_at)
                WHERE status NOT IN ('completed', 'failed')
            DO NOTHING
            RETURNING id
            "#,
        )
        .bind(job_id)
        .bind(project_id)
        .bind(keyword_id)
        .bind(platform.as_str())
        .bind(scheduled_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CoreError::Queue(e.to_string()))?;

        match row {
            Some((id,)) => Ok(id),
            None => {
                // A non-terminal job for this tuple already exists; that's the
                // idempotent no-op the unique index is for, not an error.
                let existing: (Uuid,) = sqlx::query_as(
                    r#"
                    SELECT id FROM tracking_jobs
                    WHERE project_id = $1 AND keyword_id = $2 AND platform = $3 AND scheduled_at = $4
                    "#,
                )
                .bind(project_id)
                .bind(keyword_id)
                .bind(platform.as_str())
                .bind(scheduled_at)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| CoreError::Queue(e.to_string()))?;
                Ok(existing.0)
            }
        }
    }

    async fn claim_next(&self) -> CoreResult<Option<QueueMessage>> {
        let mut tx = self.pool.begin().await.map_err(|e| CoreError::Queue(e.to_string()))?;

        let row: Option<(Uuid, Uuid, Uuid, String, i32)> = sqlx::query_as(
            r#"
            SELECT id, project_id, keyword_id, platform, retry_count
            FROM tracking_jobs
            WHERE status IN ('pending', 'retrying') AND scheduled_at <= now()
            ORDER BY scheduled_at ASC
            FOR UPDATE SKIP LOCKED
            LIMIT 1
            "#,
        )
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| CoreError::Queue(e.to_string()))?;

        let Some((id, project_id, keyword_id, platform_str, retry_count)) = row else {
            tx.commit().await.map_err(|e| CoreError::Queue(e.to_string()))?;
            return Ok(None);
        };

        sqlx::query("UPDATE tracking_jobs SET status = 'processing', started_at = now() WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| CoreError::Queue(e.to_string()))?;

        tx.commit().await.map_err(|e| CoreError::Queue(e.to_string()))?;

        let platform: Provider = platform_str.parse().map_err(CoreError::Queue)?;
        Ok(Some(QueueMessage {
            job_id: id,
            project_id,
            keyword_id,
            platform,
            retry_count: retry_count.max(0) as u32,
        }))
    }

    async fn ack(&self, job_id: Uuid) -> CoreResult<()> {
        sqlx::query("UPDATE tracking_jobs SET status = 'completed', completed_at = now() WHERE id = $1")
            .bind(job_id)
            .execute(&self.pool)
            .await
            .map_err(|e| CoreError::Queue(e.to_string()))?;
        Ok(())
    }

    async fn fail(
        &self,
        job_id: Uuid,
        error_message: &str,
        retriable: bool,
        max_retries: u32,
        retry_at: DateTime<Utc>,
    ) -> CoreResult<()> {
        let next_status = if retriable { "retrying" } else { "failed" };
        sqlx::query(
            r#"
            UPDATE tracking_jobs
            SET retry_count = retry_count + 1,
                error_message = $2,
                status = CASE
                    WHEN NOT $3 THEN 'failed'
                    WHEN retry_count + 1 >= $4 THEN 'failed'
                    ELSE $5
                END,
                scheduled_at = CASE
                    WHEN $3 AND retry_count + 1 < $4 THEN $6
                    ELSE scheduled_at
                END,
                completed_at = CASE WHEN NOT $3 OR retry_count + 1 >= $4 THEN now() ELSE completed_at END
            WHERE id = $1
            "#,
        )
        .bind(job_id)
        .bind(error_message)
        .bind(retriable)
        .bind(max_retries as i32)
        .bind(next_status)
        .bind(retry_at)
        .execute(&self.pool)
        .await
        .map_err(|e| CoreError::Queue(e.to_string()))?;
        Ok(())
    }

    async fn reap_stuck(&self, older_than: DateTime<Utc>) -> CoreResult<u64> {
        let result = sqlx::query("UPDATE tracking_jobs SET status = 'retrying' WHERE status = 'processing' AND started_at < $1")
            .bind(older_than)
            .execute(&self.pool)
            .await
            .map_err(|e| CoreError::Queue(e.to_string()))?;
        Ok(result.rows_affected())
    }
}
