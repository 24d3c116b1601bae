//! Planner (part of C5): the three cooperating cron-style loops that feed
//! and maintain the `tracking` queue — daily tracker, score recompute, and
//! retention — plus the restart-time stuck-job reaper. Each loop is its own
//! `tokio::spawn`ed sleep cycle; a tick that errors is logged and skipped,
//! not fatal to the process, since the next tick will simply retry.

use crate::queue::JobQueue;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use citewatch_common::Provider;
use citewatch_core::{ScoringService, Store};
use std::sync::Arc;
use std::time::Duration;

pub struct PlannerConfig {
    pub tracking_interval_hours: i64,
    pub score_recompute_interval: Duration,
    pub retention_interval: Duration,
    pub retention_citations_days: i64,
    pub retention_alerts_days: i64,
    pub retention_jobs_days: i64,
    pub providers: Vec<Provider>,
    /// Process shutdown grace window; the reaper requeues jobs stuck
    /// `processing` longer than `2 * grace`.
    pub grace: Duration,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            tracking_interval_hours: 24,
            score_recompute_interval: Duration::from_secs(6 * 60 * 60),
            retention_interval: Duration::from_secs(7 * 24 * 60 * 60),
            retention_citations_days: 365,
            retention_alerts_days: 90,
            retention_jobs_days: 30,
            providers: Provider::ALL.to_vec(),
            grace: Duration::from_secs(30),
        }
    }
}

/// On restart, requeue anything left `processing` by a crashed worker. Run
/// once at process startup, before the planner loops and the worker pool
/// start claiming work.
pub async fn reap_on_startup(queue: &dyn JobQueue, grace: Duration) -> citewatch_common::CoreResult<u64> {
    let older_than = Utc::now() - ChronoDuration::seconds(2 * grace.as_secs() as i64);
    let reaped = queue.reap_stuck(older_than).await?;
    if reaped > 0 {
        tracing::warn!(count = reaped, "reaped jobs stuck in processing on startup");
    }
    Ok(reaped)
}

/// *Daily tracker*: once per `tracking_interval_hours` at a configured local
/// time, for every active project, plan one job per (active keyword x
/// configured providers), skipping keywords tracked more recently than
/// `tracking_interval_hours` ago.
pub async fn run_daily_tracker(store: Arc<dyn Store>, queue: Arc<dyn JobQueue>, config: Arc<PlannerConfig>) {
    let period = Duration::from_secs((config.tracking_interval_hours.max(1) as u64) * 60 * 60);
    loop {
        if let Err(e) = tick_daily_tracker(&*store, &*queue, &config).await {
            tracing::error!(error = %e, "daily tracker tick failed; will retry next period");
        }
        tokio::time::sleep(period).await;
    }
}

async fn tick_daily_tracker(store: &dyn Store, queue: &dyn JobQueue, config: &PlannerConfig) -> citewatch_common::CoreResult<()> {
    let projects = store.list_active_projects().await?;
    let now = Utc::now();
    let stale_after = ChronoDuration::hours(config.tracking_interval_hours);

    for project in &projects {
        let keywords = store.list_active_keywords(project.id).await?;
        for keyword in &keywords {
            let is_stale = keyword
                .last_tracked_at
                .map(|t| now - t >= stale_after)
                .unwrap_or(true);
            if !is_stale {
                continue;
            }
            for &platform in &config.providers {
                queue.enqueue(project.id, keyword.id, platform, now).await?;
            }
        }
    }
    Ok(())
}

/// *Score recompute*: every `score_recompute_interval`, for every active
/// project, recompute visibility scores and daily metrics in-process (no
/// separate queue — the scoring pass is cheap enough to run directly here).
pub async fn run_score_recompute(store: Arc<dyn Store>, scoring: Arc<ScoringService>, config: Arc<PlannerConfig>) {
    loop {
        if let Err(e) = tick_score_recompute(&*store, &scoring).await {
            tracing::error!(error = %e, "score recompute tick failed; will retry next period");
        }
        tokio::time::sleep(config.score_recompute_interval).await;
    }
}

async fn tick_score_recompute(store: &dyn Store, scoring: &ScoringService) -> citewatch_common::CoreResult<()> {
    let projects = store.list_active_projects().await?;
    let now = Utc::now();
    let today = now.date_naive();
    for project in &projects {
        scoring.compute_visibility_score(project.id, now).await?;
        scoring
            .generate_daily_metrics(project.id, &project.primary_domain, &project.competitor_domains, today)
            .await?;
    }
    Ok(())
}

/// *Retention*: weekly, delete citations older than `retention_citations_days`,
/// alerts older than `retention_alerts_days`, tracking jobs older than
/// `retention_jobs_days`.
pub async fn run_retention(store: Arc<dyn Store>, config: Arc<PlannerConfig>) {
    loop {
        if let Err(e) = tick_retention(&*store, &config).await {
            tracing::error!(error = %e, "retention tick failed; will retry next period");
        }
        tokio::time::sleep(config.retention_interval).await;
    }
}

async fn tick_retention(store: &dyn Store, config: &PlannerConfig) -> citewatch_common::CoreResult<()> {
    let now = Utc::now();
    let citations_cutoff = now - ChronoDuration::days(config.retention_citations_days);
    let alerts_cutoff = now - ChronoDuration::days(config.retention_alerts_days);
    let jobs_cutoff = now - ChronoDuration::days(config.retention_jobs_days);

    let deleted_citations = store.delete_citations_older_than(citations_cutoff).await?;
    let deleted_alerts = store.delete_alerts_older_than(alerts_cutoff).await?;
    let deleted_jobs = store.delete_jobs_older_than(jobs_cutoff).await?;

    tracing::info!(
        deleted_citations,
        deleted_alerts,
        deleted_jobs,
        "retention sweep complete"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_periods_match_spec_cadence() {
        let config = PlannerConfig::default();
        assert_eq!(config.tracking_interval_hours, 24);
        assert_eq!(config.score_recompute_interval, Duration::from_secs(6 * 60 * 60));
        assert_eq!(config.retention_interval, Duration::from_secs(7 * 24 * 60 * 60));
        assert_eq!(config.retention_citations_days, 365);
        assert_eq!(config.retention_alerts_days, 90);
        assert_eq!(config.retention_jobs_days, 30);
    }
}
