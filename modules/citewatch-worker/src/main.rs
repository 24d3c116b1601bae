use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use citewatch_common::Config;
use citewatch_core::{ScoringService, Store, TrackingEngine};
use citewatch_providers::AdapterRegistry;
use citewatch_providers::SlidingWindowLimiter;
use citewatch_worker::planner::{self, PlannerConfig};
use citewatch_worker::{JobQueue, PgJobQueue, Worker, WorkerConfig};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("citewatch=info".parse()?))
        .init();

    tracing::info!("citewatch worker starting...");

    let config = Config::from_env();
    config.log_redacted();

    let pool = PgPoolOptions::new()
        .max_connections(config.worker_concurrency.max(1) as u32 + 2)
        .connect(&config.database_url)
        .await
        .context("failed to connect to tracking database")?;

    sqlx::migrate!("../../migrations").run(&pool).await.context("failed to run migrations")?;

    let store: Arc<dyn Store> = Arc::new(citewatch_core::PgStore::new(pool.clone()));
    let queue: Arc<dyn JobQueue> = Arc::new(PgJobQueue::new(pool.clone()));
    let registry = Arc::new(AdapterRegistry::from_config(&config));
    let engine = Arc::new(TrackingEngine::new(Arc::clone(&registry), Arc::clone(&store)));
    let scoring = Arc::new(ScoringService::new(Arc::clone(&store)));

    let grace = Duration::from_secs(30);
    let reaped = planner::reap_on_startup(&*queue, grace).await.context("startup reap failed")?;
    if reaped > 0 {
        tracing::info!(count = reaped, "requeued stuck jobs from a previous run");
    }

    let mut provider_limiters: HashMap<citewatch_common::Provider, Arc<SlidingWindowLimiter>> = HashMap::new();
    for provider in registry.configured_providers() {
        let rate = config
            .provider_rate_overrides
            .iter()
            .find(|(name, _)| name == provider.as_str())
            .map(|(_, v)| *v)
            .unwrap_or(30);
        provider_limiters.insert(provider, Arc::new(SlidingWindowLimiter::per_minute(rate)));
    }

    let worker_config = WorkerConfig {
        concurrency: config.worker_concurrency,
        job_deadline: Duration::from_secs(config.job_deadline_seconds),
        max_retries: config.max_retries,
        poll_interval: Duration::from_millis(500),
    };
    let worker = Worker::new(queue.clone(), Arc::clone(&store), Arc::clone(&engine), provider_limiters, worker_config);

    let planner_config = Arc::new(PlannerConfig {
        tracking_interval_hours: config.tracking_interval_hours as i64,
        providers: registry.configured_providers(),
        retention_citations_days: config.retention_citations_days,
        retention_alerts_days: config.retention_alerts_days,
        retention_jobs_days: config.retention_jobs_days,
        grace,
        ..PlannerConfig::default()
    });

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let daily_tracker = tokio::spawn(planner::run_daily_tracker(Arc::clone(&store), queue.clone(), Arc::clone(&planner_config)));
    let score_recompute = tokio::spawn(planner::run_score_recompute(Arc::clone(&store), Arc::clone(&scoring), Arc::clone(&planner_config)));
    let retention = tokio::spawn(planner::run_retention(Arc::clone(&store), Arc::clone(&planner_config)));
    let worker_loop = tokio::spawn(worker.run(shutdown_rx));

    wait_for_shutdown_signal().await;
    tracing::info!("shutdown signal received, draining in-flight jobs...");
    let _ = shutdown_tx.send(true);

    daily_tracker.abort();
    score_recompute.abort();
    retention.abort();

    match tokio::time::timeout(grace, worker_loop).await {
        Ok(_) => tracing::info!("worker drained cleanly"),
        Err(_) => tracing::warn!("grace window elapsed with jobs still in flight; they remain 'processing' for the next reaper"),
    }

    Ok(())
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
