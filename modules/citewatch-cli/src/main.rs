//! `citewatch`: manual-ops CLI for the tracking core. Not the excluded HTTP
//! API surface — a thin terminal front end over `TrackingEngine`,
//! `ScoringService`, and the `tracking` queue, for running one-off
//! operations without standing up the worker process.

use anyhow::{Context, Result};
use citewatch_common::{Config, Provider};
use citewatch_core::{PgStore, ScoringService, Store, TrackingEngine};
use citewatch_providers::AdapterRegistry;
use citewatch_worker::{JobQueue, PgJobQueue};
use chrono::Utc;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "citewatch")]
#[command(about = "Manual operations for the citation tracking core")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Track every active keyword of a project against its configured providers.
    Track {
        #[arg(long)]
        project: Uuid,
    },
    /// Run one keyword against one provider without persisting anything.
    QuickTest {
        #[arg(long)]
        keyword: String,
        #[arg(long)]
        domain: String,
        #[arg(long)]
        platform: Provider,
    },
    /// Recompute and print a project's visibility score.
    Score {
        #[arg(long)]
        project: Uuid,
    },
    /// Enqueue tracking jobs for a project's active keywords without running them.
    Schedule {
        #[arg(long)]
        project: Uuid,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("citewatch=info".parse()?))
        .init();

    let cli = Cli::parse();
    let config = Config::cli_from_env();
    config.log_redacted();

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&config.database_url)
        .await
        .context("failed to connect to tracking database")?;

    let store: Arc<dyn Store> = Arc::new(PgStore::new(pool.clone()));
    let registry = Arc::new(AdapterRegistry::from_config(&config));

    match cli.command {
        Commands::Track { project } => cmd_track(store, registry, project).await,
        Commands::QuickTest { keyword, domain, platform } => cmd_quick_test(store, registry, keyword, domain, platform).await,
        Commands::Score { project } => cmd_score(store, project).await,
        Commands::Schedule { project } => cmd_schedule(store, registry, pool, project).await,
    }
}

async fn cmd_track(store: Arc<dyn Store>, registry: Arc<AdapterRegistry>, project_id: Uuid) -> Result<()> {
    let project = store
        .get_project(project_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("project {project_id} not found"))?;
    let engine = TrackingEngine::new(registry.clone(), store);
    let providers = registry.configured_providers();
    if providers.is_empty() {
        println!("no providers configured; nothing to track");
        return Ok(());
    }

    let summary = engine.track_project(&project, &providers, None).await?;
    println!(
        "tracked project {project_id}: {} attempts, {} successes, {} failures, {} new citations",
        summary.attempts, summary.successes, summary.failures, summary.new_citations
    );
    Ok(())
}

async fn cmd_quick_test(
    store: Arc<dyn Store>,
    registry: Arc<AdapterRegistry>,
    keyword: String,
    domain: String,
    platform: Provider,
) -> Result<()> {
    if !registry.is_configured(platform) {
        anyhow::bail!("provider {platform} is not configured (missing PROVIDER_{}_API_KEY)", platform.as_str().to_uppercase());
    }
    let engine = TrackingEngine::new(registry, store);
    let result = engine.quick_test(&keyword, &domain, platform).await?;
    println!("{}", serde_json::to_string_pretty(&serde_json::json!({
        "platform": result.platform.as_str(),
        "success": result.success,
        "error": result.error,
        "response_time_ms": result.response_time_ms,
    }))?);
    Ok(())
}

async fn cmd_score(store: Arc<dyn Store>, project_id: Uuid) -> Result<()> {
    let scoring = ScoringService::new(store.clone());
    let project = store
        .get_project(project_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("project {project_id} not found"))?;
    let now = Utc::now();

    let score = scoring.compute_visibility_score(project_id, now).await?;
    let metrics = scoring
        .generate_daily_metrics(project_id, &project.primary_domain, &project.competitor_domains, now.date_naive())
        .await?;

    println!(
        "overall={:.2} grade={:?} frequency={:.2} position={:.2} diversity={:.2} context={:.2} momentum={:.2}",
        score.overall_score, score.grade, score.frequency_score, score.position_score, score.diversity_score, score.context_score, score.momentum_score
    );
    println!("daily metrics recomputed for {} platform rows", metrics.len());
    Ok(())
}

async fn cmd_schedule(store: Arc<dyn Store>, registry: Arc<AdapterRegistry>, pool: sqlx::PgPool, project_id: Uuid) -> Result<()> {
    let project = store
        .get_project(project_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("project {project_id} not found"))?;
    let keywords = store.list_active_keywords(project.id).await?;
    let providers = registry.configured_providers();
    let queue: Arc<dyn JobQueue> = Arc::new(PgJobQueue::new(pool));

    let now = Utc::now();
    let mut enqueued = 0u32;
    for keyword in &keywords {
        for &platform in &providers {
            queue.enqueue(project.id, keyword.id, platform, now).await?;
            enqueued += 1;
        }
    }
    println!("enqueued {enqueued} tracking jobs for project {project_id}");
    Ok(())
}
