use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Provider
// =============================================================================

/// One of the eight generative-AI answering engines tracked at this release.
/// The set is closed here but open-ended in the store's schema: a future
/// adapter only needs a new variant plus a registry entry, not a schema
/// migration (the `platform` columns are plain text).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    GoogleAiOverview,
    Gemini,
    Chatgpt,
    Perplexity,
    Copilot,
    Claude,
    Grok,
    Deepseek,
}

impl Provider {
    pub const ALL: [Provider; 8] = [
        Provider::GoogleAiOverview,
        Provider::Gemini,
        Provider::Chatgpt,
        Provider::Perplexity,
        Provider::Copilot,
        Provider::Claude,
        Provider::Grok,
        Provider::Deepseek,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Provider::GoogleAiOverview => "google_ai_overview",
            Provider::Gemini => "gemini",
            Provider::Chatgpt => "chatgpt",
            Provider::Perplexity => "perplexity",
            Provider::Copilot => "copilot",
            Provider::Claude => "claude",
            Provider::Grok => "grok",
            Provider::Deepseek => "deepseek",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Provider::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unknown provider: {s}"))
    }
}

// =============================================================================
// Project
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    /// Owning tenant. Not otherwise modeled here — enforced at the API
    /// boundary, carried through as a plain scoping column.
    pub organization_id: Uuid,
    /// Normalized lowercase, `www.` stripped.
    pub primary_domain: String,
    /// Ordered, capped at 10.
    pub competitor_domains: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

pub const MAX_COMPETITOR_DOMAINS: usize = 10;

// =============================================================================
// Keyword
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunnelStage {
    Awareness,
    Consideration,
    Decision,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Keyword {
    pub id: Uuid,
    pub project_id: Uuid,
    /// Trimmed, case-preserved. Unique within the project.
    pub keyword_text: String,
    /// 1..=5.
    pub priority_level: u8,
    pub funnel_stage: FunnelStage,
    pub is_active: bool,
    pub last_tracked_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Citation
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

/// A cited URL that is not the project's target domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetitorCitation {
    pub domain: String,
    pub url: String,
    pub position: u32,
    pub context: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    pub id: Uuid,
    pub project_id: Uuid,
    pub keyword_id: Uuid,
    pub platform: Provider,
    pub tracked_at: DateTime<Utc>,
    pub domain_mentioned: bool,
    /// 1-based rank of the target domain among cited URLs; null if absent.
    pub citation_position: Option<u32>,
    /// Snippet/title at the target citation, if available.
    pub citation_context: Option<String>,
    pub full_response_text: String,
    /// Truncated to <= 500 chars at a sentence boundary.
    pub response_summary: String,
    pub sentiment: Sentiment,
    /// In [0, 1].
    pub confidence_score: f64,
    pub word_count: u32,
    pub competitor_citations: Vec<CompetitorCitation>,
    pub total_sources_cited: u32,
    /// Raw, pre-normalization citation list from the provider, kept for
    /// debugging and replay.
    pub raw_citations_json: serde_json::Value,
}

impl Citation {
    /// `total_sources_cited = (domain_mentioned?1:0) + |competitor_citations|`,
    /// the core invariant tying the citation list back together.
    pub fn invariant_holds(&self) -> bool {
        let self_count = if self.domain_mentioned { 1 } else { 0 };
        self.total_sources_cited as usize == self_count + self.competitor_citations.len()
            && (self.domain_mentioned || (self.citation_position.is_none() && self.citation_context.is_none()))
    }
}

// =============================================================================
// TrackingJob
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Retrying,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingJob {
    pub id: Uuid,
    pub project_id: Uuid,
    pub keyword_id: Uuid,
    pub platform: Provider,
    pub status: JobStatus,
    pub scheduled_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub retry_count: u32,
    pub error_message: Option<String>,
    pub result_data: Option<serde_json::Value>,
}

// =============================================================================
// DailyMetric
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyMetric {
    pub project_id: Uuid,
    pub date: chrono::NaiveDate,
    pub platform: Provider,
    pub citations_total: u32,
    pub citations_self: u32,
    pub avg_position: Option<f64>,
    pub positive_count: u32,
    pub neutral_count: u32,
    pub negative_count: u32,
}

// =============================================================================
// VisibilityScore
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grade {
    APlus,
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    pub fn from_overall(overall: f64) -> Grade {
        if overall >= 90.0 {
            Grade::APlus
        } else if overall >= 80.0 {
            Grade::A
        } else if overall >= 70.0 {
            Grade::B
        } else if overall >= 60.0 {
            Grade::C
        } else if overall >= 50.0 {
            Grade::D
        } else {
            Grade::F
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisibilityScore {
    pub project_id: Uuid,
    pub calculated_at: DateTime<Utc>,
    pub frequency_score: f64,
    pub position_score: f64,
    pub diversity_score: f64,
    pub context_score: f64,
    pub momentum_score: f64,
    pub overall_score: f64,
    pub grade: Grade,
    pub delta_7d: Option<f64>,
    pub delta_30d: Option<f64>,
}

// =============================================================================
// Alert
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    NewCitation,
    LostCitation,
    PositionChange,
    CompetitorGain,
    NewPlatform,
    SentimentShift,
    VolumeSpike,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub project_id: Uuid,
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub title: String,
    pub description: String,
    pub keyword_id: Option<Uuid>,
    pub platform: Option<Provider>,
    pub previous_value: Option<String>,
    pub current_value: Option<String>,
    pub change_percent: Option<f64>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}
