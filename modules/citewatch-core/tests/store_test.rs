//! Integration tests for `PgStore`.
//! Requires a Postgres instance with the schema applied. Set
//! `DATABASE_TEST_URL` or these tests are skipped.

use chrono::Utc;
use citewatch_common::{Citation, Provider, Sentiment};
use citewatch_core::{PgStore, Store};
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

fn sample_citation(project_id: Uuid, keyword_id: Uuid, platform: Provider) -> Citation {
    Citation {
        id: Uuid::new_v4(),
        project_id,
        keyword_id,
        platform,
        tracked_at: Utc::now(),
        domain_mentioned: true,
        citation_position: Some(2),
        citation_context: Some("a helpful comparison of widget vendors".to_string()),
        full_response_text: "Example.com offers the best widgets on the market.".to_string(),
        response_summary: "Example.com offers the best widgets.".to_string(),
        sentiment: Sentiment::Positive,
        confidence_score: 0.8,
        word_count: 9,
        competitor_citations: Vec::new(),
        total_sources_cited: 3,
        raw_citations_json: serde_json::json!([]),
    }
}

#[tokio::test]
async fn insert_then_fetch_latest_citation_round_trips() {
    let Some(pool) = test_pool().await else { return };
    let (project_id, keyword_id) = seed_project_and_keyword(&pool).await;
    let store = PgStore::new(pool);

    let citation = sample_citation(project_id, keyword_id, Provider::Gemini);
    store.insert_citation(&citation).await.unwrap();

    let fetched = store
        .latest_citation(project_id, keyword_id, Provider::Gemini)
        .await
        .unwrap()
        .expect("citation should exist");

    assert_eq!(fetched.id, citation.id);
    assert_eq!(fetched.domain_mentioned, citation.domain_mentioned);
    assert_eq!(fetched.citation_position, citation.citation_position);
    assert_eq!(fetched.sentiment, citation.sentiment);
}

#[tokio::test]
async fn citations_in_window_only_returns_matching_project_and_range() {
    let Some(pool) = test_pool().await else { return };
    let (project_id, keyword_id) = seed_project_and_keyword(&pool).await;
    let store = PgStore::new(pool);

    let in_window = sample_citation(project_id, keyword_id, Provider::Claude);
    store.insert_citation(&in_window).await.unwrap();

    let window_start = Utc::now() - chrono::Duration::days(1);
    let window_end = Utc::now() + chrono::Duration::days(1);
    let rows = store.citations_in_window(project_id, window_start, window_end).await.unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, in_window.id);
}

#[tokio::test]
async fn retention_delete_removes_only_stale_citations() {
    let Some(pool) = test_pool().await else { return };
    let (project_id, keyword_id) = seed_project_and_keyword(&pool).await;
    let store = PgStore::new(pool);

    let mut stale = sample_citation(project_id, keyword_id, Provider::Copilot);
    stale.tracked_at = Utc::now() - chrono::Duration::days(400);
    store.insert_citation(&stale).await.unwrap();

    let fresh = sample_citation(project_id, keyword_id, Provider::Copilot);
    store.insert_citation(&fresh).await.unwrap();

    let cutoff = Utc::now() - chrono::Duration::days(365);
    let deleted = store.delete_citations_older_than(cutoff).await.unwrap();
    assert_eq!(deleted, 1);

    let remaining = store
        .citations_in_window(project_id, Utc::now() - chrono::Duration::days(2), Utc::now() + chrono::Duration::days(1))
        .await
        .unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, fresh.id);
}
