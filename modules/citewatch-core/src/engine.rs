//! Tracking Engine (C4): runs a keyword against a subset of providers,
//! normalizes and scores each answer, persists the resulting Citation, and
//! hands the (previous, current) pair to the alert engine.

use crate::alerts;
use crate::normalize::normalize;
use crate::sentiment::{classify_sentiment, confidence_score, summarize_response, SentimentLexicon};
use crate::store::Store;
use chrono::Utc;
use citewatch_common::{Citation, CoreResult, Keyword, Project, Provider, ProviderErrorKind};
use citewatch_providers::{AdapterRegistry, QueryOptions};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Minimum spacing between keyword starts within a `TrackProject` call, to
/// smooth upstream load rather than burst every keyword at once.
const DEFAULT_KEYWORD_SPACING: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct TrackResult {
    pub platform: Provider,
    pub success: bool,
    pub error: Option<String>,
    /// Whether a retry could plausibly succeed, per the provider error kind
    /// that produced this result. `None` on success.
    pub retriable: Option<bool>,
    /// The provider error kind behind a failure, when one exists — `None` for
    /// success and for the "provider not configured" short-circuit, which
    /// never reached an adapter. The worker uses this to decide whether to
    /// trip a provider's quota cooldown.
    pub error_kind: Option<ProviderErrorKind>,
    pub response_time_ms: u64,
    pub citation_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct TrackProjectSummary {
    pub attempts: u32,
    pub successes: u32,
    pub failures: u32,
    pub new_citations: u32,
}

/// Holds an immutable adapter registry and a `Store` handle, constructed
/// once at process init — the "immutable registry populated at process
/// start" redesign, applied to the engine's whole dependency set rather
/// than just the adapters.
pub struct TrackingEngine {
    registry: Arc<AdapterRegistry>,
    store: Arc<dyn Store>,
    lexicon: SentimentLexicon,
}

impl TrackingEngine {
    pub fn new(registry: Arc<AdapterRegistry>, store: Arc<dyn Store>) -> Self {
        Self {
            registry,
            store,
            lexicon: SentimentLexicon::default(),
        }
    }

    pub fn with_lexicon(mut self, lexicon: SentimentLexicon) -> Self {
        self.lexicon = lexicon;
        self
    }

    /// `TrackKeyword(keyword, project, providers) -> [TrackResult]`. Providers
    /// are processed sequentially within the call — interleaving across
    /// providers gives no benefit at the per-keyword scale and parallelism
    /// across keywords is the worker's job, not the engine's.
    pub async fn track_keyword(
        &self,
        keyword: &Keyword,
        project: &Project,
        providers: &[Provider],
    ) -> CoreResult<Vec<TrackResult>> {
        let mut results = Vec::with_capacity(providers.len());

        for &platform in providers {
            let result = self.track_one(keyword, project, platform, false).await?;
            results.push(result);
        }

        self.store.update_keyword_last_tracked(keyword.id, Utc::now()).await?;

        Ok(results)
    }

    /// `QuickTest` runs the same path but never persists a Citation or
    /// touches `last_tracked_at` — a dry-run to preview what a real track
    /// would produce.
    pub async fn quick_test(&self, keyword_text: &str, domain: &str, platform: Provider) -> CoreResult<TrackResult> {
        let keyword = Keyword {
            id: Uuid::nil(),
            project_id: Uuid::nil(),
            keyword_text: keyword_text.to_string(),
            priority_level: 3,
            funnel_stage: citewatch_common::FunnelStage::Awareness,
            is_active: true,
            last_tracked_at: None,
        };
        let project = Project {
            id: Uuid::nil(),
            organization_id: Uuid::nil(),
            primary_domain: domain.to_string(),
            competitor_domains: Vec::new(),
            is_active: true,
            created_at: Utc::now(),
        };
        self.track_one(&keyword, &project, platform, true).await
    }

    async fn track_one(&self, keyword: &Keyword, project: &Project, platform: Provider, dry_run: bool) -> CoreResult<TrackResult> {
        let adapter = match self.registry.get(platform) {
            Some(a) => a,
            None => {
                return Ok(TrackResult {
                    platform,
                    success: false,
                    error: Some("provider not configured".to_string()),
                    retriable: Some(false),
                    error_kind: None,
                    response_time_ms: 0,
                    citation_id: None,
                });
            }
        };

        let options = QueryOptions::default();
        let answer = match adapter.query(&keyword.keyword_text, &options).await {
            Ok(a) => a,
            Err(e) => {
                return Ok(TrackResult {
                    platform,
                    success: false,
                    error: Some(e.message.clone()),
                    retriable: Some(e.retriable),
                    error_kind: Some(e.kind),
                    response_time_ms: 0,
                    citation_id: None,
                });
            }
        };

        let normalized = normalize(&answer.citations, &project.primary_domain, &project.competitor_domains);
        let sentiment = classify_sentiment(&answer.response_text, &project.primary_domain, &self.lexicon);
        let confidence = confidence_score(answer.citations.len(), answer.response_time_ms, answer.response_text.len());
        let response_summary = summarize_response(&answer.response_text);
        let word_count = answer.response_text.split_whitespace().count() as u32;
        let raw_citations_json = serde_json::to_value(
            answer
                .citations
                .iter()
                .map(|c| serde_json::json!({"url": c.url, "title": c.title, "snippet": c.snippet, "rank": c.rank}))
                .collect::<Vec<_>>(),
        )
        .unwrap_or(serde_json::Value::Null);

        let citation = Citation {
            id: Uuid::new_v4(),
            project_id: project.id,
            keyword_id: keyword.id,
            platform,
            tracked_at: Utc::now(),
            domain_mentioned: normalized.domain_mentioned,
            citation_position: normalized.citation_position,
            citation_context: normalized.citation_context,
            full_response_text: answer.response_text.clone(),
            response_summary,
            sentiment,
            confidence_score: confidence,
            word_count,
            competitor_citations: normalized.competitor_citations,
            total_sources_cited: normalized.total_sources_cited,
            raw_citations_json,
        };

        if dry_run {
            return Ok(TrackResult {
                platform,
                success: true,
                error: None,
                retriable: None,
                error_kind: None,
                response_time_ms: answer.response_time_ms,
                citation_id: None,
            });
        }

        let previous = self.store.latest_citation(project.id, keyword.id, platform).await?;
        self.store.insert_citation(&citation).await?;

        for alert in alerts::diff_citations(project.id, keyword.id, platform, previous.as_ref(), &citation) {
            if let Err(e) = self.store.insert_alert(&alert).await {
                tracing::warn!(error = %e, "failed to persist alert; tracking job still succeeds");
            }
        }

        Ok(TrackResult {
            platform,
            success: true,
            error: None,
            retriable: None,
            error_kind: None,
            response_time_ms: answer.response_time_ms,
            citation_id: Some(citation.id),
        })
    }

    /// `TrackProject(projectId, options)`: iterate active keywords, space
    /// keyword starts by `spacing` to smooth upstream load, and return
    /// cumulative counts across the whole batch.
    pub async fn track_project(&self, project: &Project, providers: &[Provider], spacing: Option<Duration>) -> CoreResult<TrackProjectSummary> {
        let keywords = self.store.list_active_keywords(project.id).await?;
        let spacing = spacing.unwrap_or(DEFAULT_KEYWORD_SPACING);
        let mut summary = TrackProjectSummary::default();

        for (idx, keyword) in keywords.iter().enumerate() {
            if idx > 0 {
                tokio::time::sleep(spacing).await;
            }
            let results = self.track_keyword(keyword, project, providers).await?;
            for r in results {
                summary.attempts += 1;
                if r.success {
                    summary.successes += 1;
                    if r.citation_id.is_some() {
                        summary.new_citations += 1;
                    }
                } else {
                    summary.failures += 1;
                }
            }
        }

        Ok(summary)
    }
}
