//! Integration tests for `PgJobQueue`.
//! Requires a Postgres instance with the schema applied. Set
//! `DATABASE_TEST_URL` or these tests are skipped.

use chrono::Utc;
use citewatch_common::Provider;
use citewatch_worker::{JobQueue, PgJobQueue};
use sqlx::PgPool;
use uuid::Uuid;

async fn test_pool() -> Option<PgPool> {
    let url = std::env::var("DATABASE_TEST_URL").ok()?;
    let pool = PgPool::connect(&url).await.ok()?;
    sqlx::migrate!("../../migrations").run(&pool).await.ok()?;
    Some(pool)
}

async fn seed_project_and_keyword(pool: &PgPool) -> (Uuid, Uuid) {
    let project_id = Uuid::new_v4();
    let keyword_id = Uuid::new_v4();
    sqlx::query("INSERT INTO projects (id, organization_id, primary_domain) VALUES ($1, $2, $3)")
        .bind(project_id)
        .bind(Uuid::new_v4())
        .bind("example.com")
        .execute(pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO keywords (id, project_id, keyword_text) VALUES ($1, $2, $3)")
        .bind(keyword_id)
        .bind(project_id)
        .bind("best widgets")
        .execute(pool)
        .await
        .unwrap();
    (project_id, keyword_id)
}

#[tokio::test]
async fn enqueue_then_claim_then_ack_round_trips() {
    let Some(pool) = test_pool().await else { return };
    let (project_id, keyword_id) = seed_project_and_keyword(&pool).await;
    let queue = PgJobQueue::new(pool);

    let job_id = queue.enqueue(project_id, keyword_id, Provider::Gemini, Utc::now()).await.unwrap();

    let claimed = queue.claim_next().await.unwrap().expect("job should be claimable");
    assert_eq!(claimed.job_id, job_id);
    assert_eq!(claimed.platform, Provider::Gemini);

    // Not claimable a second time while processing.
    assert!(queue.claim_next().await.unwrap().is_none());

    queue.ack(job_id).await.unwrap();
}

#[tokio::test]
async fn duplicate_enqueue_for_same_tuple_is_idempotent() {
    let Some(pool) = test_pool().await else { return };
    let (project_id, keyword_id) = seed_project_and_keyword(&pool).await;
    let queue = PgJobQueue::new(pool);
    let at = Utc::now();

    let first = queue.enqueue(project_id, keyword_id, Provider::Claude, at).await.unwrap();
    let second = queue.enqueue(project_id, keyword_id, Provider::Claude, at).await.unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn failed_job_under_retry_limit_goes_to_retrying_with_future_schedule() {
    let Some(pool) = test_pool().await else { return };
    let (project_id, keyword_id) = seed_project_and_keyword(&pool).await;
    let queue = PgJobQueue::new(pool.clone());

    let job_id = queue.enqueue(project_id, keyword_id, Provider::Chatgpt, Utc::now()).await.unwrap();
    queue.claim_next().await.unwrap();

    let retry_at = Utc::now() + chrono::Duration::seconds(45);
    queue.fail(job_id, "transient timeout", true, 3, retry_at).await.unwrap();

    let row: (String,) = sqlx::query_as("SELECT status FROM tracking_jobs WHERE id = $1")
        .bind(job_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(row.0, "retrying");

    // Not claimable yet since scheduled_at is in the future.
    assert!(queue.claim_next().await.unwrap().is_none());
}

#[tokio::test]
async fn failed_job_past_retry_limit_goes_to_failed() {
    let Some(pool) = test_pool().await else { return };
    let (project_id, keyword_id) = seed_project_and_keyword(&pool).await;
    let queue = PgJobQueue::new(pool.clone());

    let job_id = queue.enqueue(project_id, keyword_id, Provider::Perplexity, Utc::now()).await.unwrap();
    queue.claim_next().await.unwrap();

    queue.fail(job_id, "auth failure", false, 3, Utc::now()).await.unwrap();

    let row: (String,) = sqlx::query_as("SELECT status FROM tracking_jobs WHERE id = $1")
        .bind(job_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(row.0, "failed");
}
