//! The relational store: the only system of record for the tracking core.
//! `Store` is the trait boundary every other module reads/writes through;
//! `PgStore` is the Postgres implementation, in the teacher's `db::models`
//! style — `query_as` over explicit tuples plus hand-written row-mapping
//! functions, not a derive-everything ORM.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use citewatch_common::{
    Alert, AlertSeverity, AlertType, Citation, CompetitorCitation, DailyMetric, FunnelStage, Grade, JobStatus,
    Keyword, Project, Provider, Sentiment, TrackingJob, VisibilityScore,
};
use citewatch_common::{CoreError, CoreResult};
use sqlx::PgPool;
use uuid::Uuid;

/// Storage boundary for everything the tracking core persists. Abstract over
/// the backing store so scoring/alerting code can be exercised against an
/// in-memory fake in tests without a live Postgres instance.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get_project(&self, project_id: Uuid) -> CoreResult<Option<Project>>;
    async fn list_active_projects(&self) -> CoreResult<Vec<Project>>;

    async fn get_keyword(&self, keyword_id: Uuid) -> CoreResult<Option<Keyword>>;
    async fn list_active_keywords(&self, project_id: Uuid) -> CoreResult<Vec<Keyword>>;
    async fn update_keyword_last_tracked(&self, keyword_id: Uuid, at: DateTime<Utc>) -> CoreResult<()>;

    /// Most recent prior citation for `(project_id, keyword_id, platform)`,
    /// ordered by `tracked_at DESC` — the ground truth C7 diffs against.
    async fn latest_citation(
        &self,
        project_id: Uuid,
        keyword_id: Uuid,
        platform: Provider,
    ) -> CoreResult<Option<Citation>>;
    async fn insert_citation(&self, citation: &Citation) -> CoreResult<()>;
    /// All citations for a project with `tracked_at` in `[window_start, window_end]`,
    /// fetched once and reused across every scoring component ("single
    /// transaction defines the window").
    async fn citations_in_window(
        &self,
        project_id: Uuid,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> CoreResult<Vec<Citation>>;

    async fn insert_alert(&self, alert: &Alert) -> CoreResult<()>;

    async fn upsert_daily_metric(&self, metric: &DailyMetric) -> CoreResult<()>;
    async fn insert_visibility_score(&self, score: &VisibilityScore) -> CoreResult<()>;
    async fn latest_visibility_score(&self, project_id: Uuid) -> CoreResult<Option<VisibilityScore>>;
    /// Most recent score with `calculated_at <= cutoff`, used to compute
    /// `delta_7d`/`delta_30d` against a comparison point in the past.
    async fn visibility_score_before(&self, project_id: Uuid, cutoff: DateTime<Utc>) -> CoreResult<Option<VisibilityScore>>;

    async fn insert_tracking_job(&self, job: &TrackingJob) -> CoreResult<()>;
    async fn claim_pending_job(&self, job_id: Uuid) -> CoreResult<Option<TrackingJob>>;
    async fn complete_tracking_job(&self, job_id: Uuid, result_data: Option<serde_json::Value>) -> CoreResult<()>;
    async fn fail_tracking_job(&self, job_id: Uuid, error_message: &str, retriable: bool, max_retries: u32) -> CoreResult<()>;

    async fn delete_citations_older_than(&self, cutoff: DateTime<Utc>) -> CoreResult<u64>;
    async fn delete_alerts_older_than(&self, cutoff: DateTime<Utc>) -> CoreResult<u64>;
    async fn delete_jobs_older_than(&self, cutoff: DateTime<Utc>) -> CoreResult<u64>;
}

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

type ProjectRow = (Uuid, Uuid, String, Vec<String>, bool, DateTime<Utc>);

fn row_to_project(r: ProjectRow) -> Project {
    Project {
        id: r.0,
        organization_id: r.1,
        primary_domain: r.2,
        competitor_domains: r.3,
        is_active: r.4,
        created_at: r.5,
    }
}

type KeywordRow = (Uuid, Uuid, String, i16, String, bool, Option<DateTime<Utc>>);

fn row_to_keyword(r: KeywordRow) -> Keyword {
    let funnel_stage = match r.4.as_str() {
        "consideration" => FunnelStage::Consideration,
        "decision" => FunnelStage::Decision,
        _ => FunnelStage::Awareness,
    };
    Keyword {
        id: r.0,
        project_id: r.1,
        keyword_text: r.2,
        priority_level: r.3 as u8,
        funnel_stage,
        is_active: r.5,
        last_tracked_at: r.6,
    }
}

#[allow(clippy::type_complexity)]
type CitationRow = (
    Uuid,
    Uuid,
    Uuid,
    String,
    DateTime<Utc>,
    bool,
    Option<i32>,
    Option<String>,
    String,
    String,
    String,
    f64,
    i32,
    serde_json::Value,
    i32,
    serde_json::Value,
);

fn row_to_citation(r: CitationRow) -> CoreResult<Citation> {
    let platform: Provider = r.3.parse().map_err(CoreError::Store)?;
    let sentiment = match r.10.as_str() {
        "positive" => Sentiment::Positive,
        "negative" => Sentiment::Negative,
        _ => Sentiment::Neutral,
    };
    let competitor_citations: Vec<CompetitorCitation> = serde_json::from_value(r.13).unwrap_or_default();
    Ok(Citation {
        id: r.0,
        project_id: r.1,
        keyword_id: r.2,
        platform,
        tracked_at: r.4,
        domain_mentioned: r.5,
        citation_position: r.6.map(|v| v as u32),
        citation_context: r.7,
        full_response_text: r.8,
        response_summary: r.9,
        sentiment,
        confidence_score: r.11,
        word_count: r.12 as u32,
        competitor_citations,
        total_sources_cited: r.14 as u32,
        raw_citations_json: r.15,
    })
}

#[async_trait]
impl Store for PgStore {
    async fn get_project(&self, project_id: Uuid) -> CoreResult<Option<Project>> {
        let row = sqlx::query_as::<_, ProjectRow>(
            r#"
            SELECT id, organization_id, primary_domain, competitor_domains, is_active, created_at
            FROM projects WHERE id = $1
            "#,
        )
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CoreError::Store(e.to_string()))?;
        Ok(row.map(row_to_project))
    }

    async fn list_active_projects(&self) -> CoreResult<Vec<Project>> {
        let rows = sqlx::query_as::<_, ProjectRow>(
            r#"
            SELECT id, organization_id, primary_domain, competitor_domains, is_active, created_at
            FROM projects WHERE is_active = true
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| CoreError::Store(e.to_string()))?;
        Ok(rows.into_iter().map(row_to_project).collect())
    }

    async fn get_keyword(&self, keyword_id: Uuid) -> CoreResult<Option<Keyword>> {
        let row = sqlx::query_as::<_, KeywordRow>(
            r#"
            SELECT id, project_id, keyword_text, priority_level, funnel_stage, is_active, last_tracked_at
            FROM keywords WHERE id = $1
            "#,
        )
        .bind(keyword_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CoreError::Store(e.to_string()))?;
        Ok(row.map(row_to_keyword))
    }

    async fn list_active_keywords(&self, project_id: Uuid) -> CoreResult<Vec<Keyword>> {
        let rows = sqlx::query_as::<_, KeywordRow>(
            r#"
            SELECT id, project_id, keyword_text, priority_level, funnel_stage, is_active, last_tracked_at
            FROM keywords WHERE project_id = $1 AND is_active = true
            "#,
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| CoreError::Store(e.to_string()))?;
        Ok(rows.into_iter().map(row_to_keyword).collect())
    }

    async fn update_keyword_last_tracked(&self, keyword_id: Uuid, at: DateTime<Utc>) -> CoreResult<()> {
        sqlx::query("UPDATE keywords SET last_tracked_at = $2 WHERE id = $1")
            .bind(keyword_id)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(|e| CoreError::Store(e.to_string()))?;
        Ok(())
    }

    async fn latest_citation(
        &self,
        project_id: Uuid,
        keyword_id: Uuid,
        platform: Provider,
    ) -> CoreResult<Option<Citation>> {
        let row = sqlx::query_as::<_, CitationRow>(
            r#"
            SELECT id, project_id, keyword_id, platform, tracked_at, domain_mentioned,
                   citation_position, citation_context, full_response_text, response_summary,
                   sentiment, confidence_score, word_count, competitor_citations,
                   total_sources_cited, raw_citations_json
            FROM citations
            WHERE project_id = $1 AND keyword_id = $2 AND platform = $3
            ORDER BY tracked_at DESC
            LIMIT 1
            "#,
        )
        .bind(project_id)
        .bind(keyword_id)
        .bind(platform.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CoreError::Store(e.to_string()))?;
        row.map(row_to_citation).transpose()
    }

    async fn insert_citation(&self, citation: &Citation) -> CoreResult<()> {
        let competitor_json = serde_json::to_value(&citation.competitor_citations).map_err(|e| CoreError::Store(e.to_string()))?;
        let sentiment_str = match citation.sentiment {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
        };
        sqlx::query(
            r#"
            INSERT INTO citations (
                id, project_id, keyword_id, platform, tracked_at, domain_mentioned,
                citation_position, citation_context, full_response_text, response_summary,
                sentiment, confidence_score, word_count, competitor_citations,
                total_sources_cited, raw_citations_json
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16)
            "#,
        )
        .bind(citation.id)
        .bind(citation.project_id)
        .bind(citation.keyword_id)
        .bind(citation.platform.as_str())
        .bind(citation.tracked_at)
        .bind(citation.domain_mentioned)
        .bind(citation.citation_position.map(|v| v as i32))
        .bind(&citation.citation_context)
        .bind(&citation.full_response_text)
        .bind(&citation.response_summary)
        .bind(sentiment_str)
        .bind(citation.confidence_score)
        .bind(citation.word_count as i32)
        .bind(competitor_json)
        .bind(citation.total_sources_cited as i32)
        .bind(&citation.raw_citations_json)
        .execute(&self.pool)
        .await
        .map_err(|e| CoreError::Store(e.to_string()))?;
        Ok(())
    }

    async fn citations_in_window(
        &self,
        project_id: Uuid,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> CoreResult<Vec<Citation>> {
        let rows = sqlx::query_as::<_, CitationRow>(
            r#"
            SELECT id, project_id, keyword_id, platform, tracked_at, domain_mentioned,
                   citation_position, citation_context, full_response_text, response_summary,
                   sentiment, confidence_score, word_count, competitor_citations,
                   total_sources_cited, raw_citations_json
            FROM citations
            WHERE project_id = $1 AND tracked_at BETWEEN $2 AND $3
            ORDER BY tracked_at ASC
            "#,
        )
        .bind(project_id)
        .bind(window_start)
        .bind(window_end)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| CoreError::Store(e.to_string()))?;
        rows.into_iter().map(row_to_citation).collect()
    }

    async fn insert_alert(&self, alert: &Alert) -> CoreResult<()> {
        let alert_type = alert_type_str(alert.alert_type);
        let severity = severity_str(alert.severity);
        sqlx::query(
            r#"
            INSERT INTO alerts (
                id, project_id, alert_type, severity, title, description, keyword_id,
                platform, previous_value, current_value, change_percent, is_read, created_at
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13)
            "#,
        )
        .bind(alert.id)
        .bind(alert.project_id)
        .bind(alert_type)
        .bind(severity)
        .bind(&alert.title)
        .bind(&alert.description)
        .bind(alert.keyword_id)
        .bind(alert.platform.map(|p| p.as_str()))
        .bind(&alert.previous_value)
        .bind(&alert.current_value)
        .bind(alert.change_percent)
        .bind(alert.is_read)
        .bind(alert.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| CoreError::Store(e.to_string()))?;
        Ok(())
    }

    async fn upsert_daily_metric(&self, metric: &DailyMetric) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO daily_metrics (
                project_id, date, platform, citations_total, citations_self, avg_position,
                positive_count, neutral_count, negative_count
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)
            ON CONFLICT (project_id, date, platform) DO UPDATE SET
                citations_total = EXCLUDED.citations_total,
                citations_self = EXCLUDED.citations_self,
                avg_position = EXCLUDED.avg_position,
                positive_count = EXCLUDED.positive_count,
                neutral_count = EXCLUDED.neutral_count,
                negative_count = EXCLUDED.negative_count
            "#,
        )
        .bind(metric.project_id)
        .bind(metric.date)
        .bind(metric.platform.as_str())
        .bind(metric.citations_total as i32)
        .bind(metric.citations_self as i32)
        .bind(metric.avg_position)
        .bind(metric.positive_count as i32)
        .bind(metric.neutral_count as i32)
        .bind(metric.negative_count as i32)
        .execute(&self.pool)
        .await
        .map_err(|e| CoreError::Store(e.to_string()))?;
        Ok(())
    }

    async fn insert_visibility_score(&self, score: &VisibilityScore) -> CoreResult<()> {
        let grade = grade_str(score.grade);
        sqlx::query(
            r#"
            INSERT INTO visibility_scores (
                project_id, calculated_at, frequency_score, position_score, diversity_score,
                context_score, momentum_score, overall_score, grade, delta_7d, delta_30d
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11)
            "#,
        )
        .bind(score.project_id)
        .bind(score.calculated_at)
        .bind(score.frequency_score)
        .bind(score.position_score)
        .bind(score.diversity_score)
        .bind(score.context_score)
        .bind(score.momentum_score)
        .bind(score.overall_score)
        .bind(grade)
        .bind(score.delta_7d)
        .bind(score.delta_30d)
        .execute(&self.pool)
        .await
        .map_err(|e| CoreError::Store(e.to_string()))?;
        Ok(())
    }

    async fn latest_visibility_score(&self, project_id: Uuid) -> CoreResult<Option<VisibilityScore>> {
        #[allow(clippy::type_complexity)]
        let row = sqlx::query_as::<_, (Uuid, DateTime<Utc>, f64, f64, f64, f64, f64, f64, String, Option<f64>, Option<f64>)>(
            r#"
            SELECT project_id, calculated_at, frequency_score, position_score, diversity_score,
                   context_score, momentum_score, overall_score, grade, delta_7d, delta_30d
            FROM visibility_scores WHERE project_id = $1
            ORDER BY calculated_at DESC LIMIT 1
            "#,
        )
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CoreError::Store(e.to_string()))?;

        Ok(row.map(|r| VisibilityScore {
            project_id: r.0,
            calculated_at: r.1,
            frequency_score: r.2,
            position_score: r.3,
            diversity_score: r.4,
            context_score: r.5,
            momentum_score: r.6,
            overall_score: r.7,
            grade: grade_from_str(&r.8),
            delta_7d: r.9,
            delta_30d: r.10,
        }))
    }

    async fn visibility_score_before(&self, project_id: Uuid, cutoff: DateTime<Utc>) -> CoreResult<Option<VisibilityScore>> {
        #[allow(clippy::type_complexity)]
        let row = sqlx::query_as::<_, (Uuid, DateTime<Utc>, f64, f64, f64, f64, f64, f64, String, Option<f64>, Option<f64>)>(
            r#"
            SELECT project_id, calculated_at, frequency_score, position_score, diversity_score,
                   context_score, momentum_score, overall_score, grade, delta_7d, delta_30d
            FROM visibility_scores WHERE project_id = $1 AND calculated_at <= $2
            ORDER BY calculated_at DESC LIMIT 1
            "#,
        )
        .bind(project_id)
        .bind(cutoff)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CoreError::Store(e.to_string()))?;

        Ok(row.map(|r| VisibilityScore {
            project_id: r.0,
            calculated_at: r.1,
            frequency_score: r.2,
            position_score: r.3,
            diversity_score: r.4,
            context_score: r.5,
            momentum_score: r.6,
            overall_score: r.7,
            grade: grade_from_str(&r.8),
            delta_7d: r.9,
            delta_30d: r.10,
        }))
    }

    async fn insert_tracking_job(&self, job: &TrackingJob) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO tracking_jobs (
                id, project_id, keyword_id, platform, status, scheduled_at, started_at,
                completed_at, retry_count, error_message, result_data
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11)
            ON CONFLICT (project_id, keyword_id, platform, scheduled_at)
                WHERE status NOT IN ('completed', 'failed')
            DO NOTHING
            "#,
        )
        .bind(job.id)
        .bind(job.project_id)
        .bind(job.keyword_id)
        .bind(job.platform.as_str())
        .bind(job_status_str(job.status))
        .bind(job.scheduled_at)
        .bind(job.started_at)
        .bind(job.completed_at)
        .bind(job.retry_count as i32)
        .bind(&job.error_message)
        .bind(&job.result_data)
        .execute(&self.pool)
        .await
        .map_err(|e| CoreError::Store(e.to_string()))?;
        Ok(())
    }

    async fn claim_pending_job(&self, job_id: Uuid) -> CoreResult<Option<TrackingJob>> {
        #[allow(clippy::type_complexity)]
        let row = sqlx::query_as::<_, (
            Uuid, Uuid, Uuid, String, String, DateTime<Utc>, Option<DateTime<Utc>>,
            Option<DateTime<Utc>>, i32, Option<String>, Option<serde_json::Value>,
        )>(
            r#"
            UPDATE tracking_jobs
            SET status = 'processing', started_at = now()
            WHERE id = $1 AND status IN ('pending', 'retrying')
            RETURNING id, project_id, keyword_id, platform, status, scheduled_at, started_at,
                      completed_at, retry_count, error_message, result_data
            "#,
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CoreError::Store(e.to_string()))?;

        row.map(|r| {
            let platform: Provider = r.3.parse().map_err(CoreError::Store)?;
            Ok(TrackingJob {
                id: r.0,
                project_id: r.1,
                keyword_id: r.2,
                platform,
                status: job_status_from_str(&r.4),
                scheduled_at: r.5,
                started_at: r.6,
                completed_at: r.7,
                retry_count: r.8 as u32,
                error_message: r.9,
                result_data: r.10,
            })
        })
        .transpose()
    }

    async fn complete_tracking_job(&self, job_id: Uuid, result_data: Option<serde_json::Value>) -> CoreResult<()> {
        sqlx::query(
            r#"
            UPDATE tracking_jobs
            SET status = 'completed', completed_at = now(), result_data = $2
            WHERE id = $1
            "#,
        )
        .bind(job_id)
        .bind(result_data)
        .execute(&self.pool)
        .await
        .map_err(|e| CoreError::Store(e.to_string()))?;
        Ok(())
    }

    async fn fail_tracking_job(&self, job_id: Uuid, error_message: &str, retriable: bool, max_retries: u32) -> CoreResult<()> {
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
                completed_at = CASE WHEN NOT $3 OR retry_count + 1 >= $4 THEN now() ELSE completed_at END
            WHERE id = $1
            "#,
        )
        .bind(job_id)
        .bind(error_message)
        .bind(retriable)
        .bind(max_retries as i32)
        .bind(next_status)
        .execute(&self.pool)
        .await
        .map_err(|e| CoreError::Store(e.to_string()))?;
        Ok(())
    }

    async fn delete_citations_older_than(&self, cutoff: DateTime<Utc>) -> CoreResult<u64> {
        let result = sqlx::query("DELETE FROM citations WHERE tracked_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| CoreError::Store(e.to_string()))?;
        Ok(result.rows_affected())
    }

    async fn delete_alerts_older_than(&self, cutoff: DateTime<Utc>) -> CoreResult<u64> {
        let result = sqlx::query("DELETE FROM alerts WHERE created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| CoreError::Store(e.to_string()))?;
        Ok(result.rows_affected())
    }

    async fn delete_jobs_older_than(&self, cutoff: DateTime<Utc>) -> CoreResult<u64> {
        let result = sqlx::query("DELETE FROM tracking_jobs WHERE scheduled_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| CoreError::Store(e.to_string()))?;
        Ok(result.rows_affected())
    }
}

fn alert_type_str(t: AlertType) -> &'static str {
    match t {
        AlertType::NewCitation => "new_citation",
        AlertType::LostCitation => "lost_citation",
        AlertType::PositionChange => "position_change",
        AlertType::CompetitorGain => "competitor_gain",
        AlertType::NewPlatform => "new_platform",
        AlertType::SentimentShift => "sentiment_shift",
        AlertType::VolumeSpike => "volume_spike",
    }
}

fn severity_str(s: AlertSeverity) -> &'static str {
    match s {
        AlertSeverity::Info => "info",
        AlertSeverity::Warning => "warning",
        AlertSeverity::Critical => "critical",
    }
}

fn grade_str(g: Grade) -> &'static str {
    match g {
        Grade::APlus => "a_plus",
        Grade::A => "a",
        Grade::B => "b",
        Grade::C => "c",
        Grade::D => "d",
        Grade::F => "f",
    }
}

fn grade_from_str(s: &str) -> Grade {
    match s {
        "a_plus" => Grade::APlus,
        "a" => Grade::A,
        "b" => Grade::B,
        "c" => Grade::C,
        "d" => Grade::D,
        _ => Grade::F,
    }
}

fn job_status_str(s: JobStatus) -> &'static str {
    match s {
        JobStatus::Pending => "pending",
        JobStatus::Processing => "processing",
        JobStatus::Completed => "completed",
        JobStatus::Failed => "failed",
        JobStatus::Retrying => "retrying",
    }
}

fn job_status_from_str(s: &str) -> JobStatus {
    match s {
        "processing" => JobStatus::Processing,
        "completed" => JobStatus::Completed,
        "failed" => JobStatus::Failed,
        "retrying" => JobStatus::Retrying,
        _ => JobStatus::Pending,
    }
}
