//! Scheduler / Worker (C5): the per-job state machine of the worker
//! lifecycle, a bounded concurrency pool, per-provider rate limiting, and the
//! quota-exceeded cooldown. Claiming a job already atomically transitions it
//! `pending`/`retrying` -> `processing` (see `queue::PgJobQueue::claim_next`),
//! so step 1 of the lifecycle lives there; this module covers steps 2-6.

use crate::backoff::next_attempt_at;
use crate::cooldown::ProviderCooldown;
use crate::queue::{JobQueue, QueueMessage};
use chrono::Utc;
use citewatch_common::{Provider, ProviderErrorKind};
use citewatch_core::{Store, TrackingEngine};
use citewatch_providers::SlidingWindowLimiter;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub concurrency: usize,
    pub job_deadline: Duration,
    pub max_retries: u32,
    /// How long the poll loop sleeps after finding no claimable job.
    pub poll_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            job_deadline: Duration::from_secs(60),
            max_retries: 3,
            poll_interval: Duration::from_millis(500),
        }
    }
}

/// Owns the queue, the tracking engine, the per-provider sliding-window
/// limiters, and the quota cooldown. One instance runs the whole worker
/// process's job loop; `Arc<Worker>` is cloned into each spawned job task.
pub struct Worker {
    queue: Arc<dyn JobQueue>,
    store: Arc<dyn Store>,
    engine: Arc<TrackingEngine>,
    cooldown: Arc<ProviderCooldown>,
    provider_limiters: HashMap<Provider, Arc<SlidingWindowLimiter>>,
    semaphore: Arc<Semaphore>,
    config: WorkerConfig,
}

impl Worker {
    pub fn new(
        queue: Arc<dyn JobQueue>,
        store: Arc<dyn Store>,
        engine: Arc<TrackingEngine>,
        provider_limiters: HashMap<Provider, Arc<SlidingWindowLimiter>>,
        config: WorkerConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            queue,
            store,
            engine,
            cooldown: Arc::new(ProviderCooldown::new()),
            provider_limiters,
            semaphore: Arc::new(Semaphore::new(config.concurrency.max(1))),
            config,
        })
    }

    /// Poll `tracking` forever, dispatching each claimed job onto the
    /// bounded pool. Returns once `shutdown` is signaled and every in-flight
    /// task has finished or the grace window elapses (the caller enforces
    /// the grace window; this just stops claiming new work and waits out
    /// whatever is already running).
    pub async fn run(self: Arc<Self>, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                break;
            }
            match self.queue.claim_next().await {
                Ok(Some(msg)) => {
                    let permit = match Arc::clone(&self.semaphore).acquire_owned().await {
                        Ok(p) => p,
                        Err(_) => break,
                    };
                    let this = Arc::clone(&self);
                    tokio::spawn(async move {
                        this.process(msg).await;
                        drop(permit);
                    });
                }
                Ok(None) => {
                    tokio::select! {
                        _ = tokio::time::sleep(self.config.poll_interval) => {}
                        _ = shutdown.changed() => {}
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "failed to claim next tracking job");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }

        // Drain: wait for every in-flight permit to come back, i.e. for every
        // spawned job task to finish, bounded by the caller's grace window
        // (enforced by wrapping this call in `tokio::time::timeout`).
        let _ = Arc::clone(&self.semaphore)
            .acquire_many_owned(self.config.concurrency.max(1) as u32)
            .await;
    }

    async fn process(&self, msg: QueueMessage) {
        let keyword = match self.store.get_keyword(msg.keyword_id).await {
            Ok(Some(k)) => k,
            Ok(None) => {
                self.fail(msg.job_id, msg.retry_count, "orphaned: keyword not found", false).await;
                return;
            }
            Err(e) => {
                tracing::error!(error = %e, job_id = %msg.job_id, "store error loading keyword");
                self.fail(msg.job_id, msg.retry_count, &format!("store error: {e}"), true).await;
                return;
            }
        };

        let project = match self.store.get_project(msg.project_id).await {
            Ok(Some(p)) => p,
            Ok(None) => {
                self.fail(msg.job_id, msg.retry_count, "orphaned: project not found", false).await;
                return;
            }
            Err(e) => {
                tracing::error!(error = %e, job_id = %msg.job_id, "store error loading project");
                self.fail(msg.job_id, msg.retry_count, &format!("store error: {e}"), true).await;
                return;
            }
        };

        if self.cooldown.is_cooling_down(msg.platform) {
            self.fail(msg.job_id, msg.retry_count, "quota_exceeded: provider in cooldown", false).await;
            return;
        }

        if let Some(limiter) = self.provider_limiters.get(&msg.platform) {
            limiter.acquire().await;
        }

        let outcome = tokio::time::timeout(
            self.config.job_deadline,
            self.engine.track_keyword(&keyword, &project, std::slice::from_ref(&msg.platform)),
        )
        .await;

        match outcome {
            Err(_) => {
                tracing::warn!(job_id = %msg.job_id, platform = %msg.platform, "tracking job exceeded its deadline");
                self.fail(msg.job_id, msg.retry_count, "timeout", true).await;
            }
            Ok(Err(e)) => {
                tracing::error!(job_id = %msg.job_id, error = %e, "tracking engine error");
                self.fail(msg.job_id, msg.retry_count, &e.to_string(), true).await;
            }
            Ok(Ok(mut results)) => {
                let Some(result) = results.pop() else {
                    self.fail(msg.job_id, msg.retry_count, "tracking engine produced no result", true).await;
                    return;
                };

                if result.success {
                    let result_data = serde_json::json!({
                        "citation_found": result.citation_id.is_some(),
                        "citation_id": result.citation_id,
                        "response_time_ms": result.response_time_ms,
                    });
                    if let Err(e) = self.store.complete_tracking_job(msg.job_id, Some(result_data)).await {
                        tracing::error!(error = %e, job_id = %msg.job_id, "failed to persist job completion");
                    }
                    if let Err(e) = self.queue.ack(msg.job_id).await {
                        tracing::error!(error = %e, job_id = %msg.job_id, "failed to ack job in queue");
                    }
                    return;
                }

                if result.error_kind == Some(ProviderErrorKind::QuotaExceeded) {
                    self.cooldown.trigger(msg.platform);
                }
                let retriable = result.retriable.unwrap_or(false);
                let message = result.error.unwrap_or_else(|| "unknown provider error".to_string());
                self.fail(msg.job_id, msg.retry_count, &message, retriable).await;
            }
        }
    }

    async fn fail(&self, job_id: uuid::Uuid, retry_count: u32, message: &str, retriable: bool) {
        let retry_at = next_attempt_at(retry_count + 1, Utc::now());
        if let Err(e) = self.queue.fail(job_id, message, retriable, self.config.max_retries, retry_at).await {
            tracing::error!(error = %e, job_id = %job_id, "failed to persist job failure");
        }
    }
}
