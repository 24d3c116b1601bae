use citewatch_common::Provider;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecencyFilter {
    Day,
    Week,
    Month,
    None,
}

#[derive(Debug, Clone)]
pub struct Locale {
    pub language: String,
    pub country: String,
}

impl Default for Locale {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            country: "US".to_string(),
        }
    }
}

/// Query configuration. Unknown fields (from whatever the caller passed in)
/// are ignored by construction — callers build this type, they don't hand us
/// a loose map — and missing fields already take the adapter defaults given
/// below.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
    pub locale: Locale,
    pub recency_filter: RecencyFilter,
    pub grounding_enabled: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            max_tokens: 1024,
            timeout: Duration::from_secs(30),
            locale: Locale::default(),
            recency_filter: RecencyFilter::None,
            grounding_enabled: true,
        }
    }
}

/// One citation as a provider reported it, before normalization. `rank` is
/// the provider's own 1-based dense order, assigned by the adapter on a
/// first-seen basis when the provider doesn't emit ranks directly.
#[derive(Debug, Clone)]
pub struct RawCitation {
    pub url: String,
    pub title: Option<String>,
    pub snippet: Option<String>,
    pub rank: u32,
}

#[derive(Debug, Clone)]
pub struct ProviderAnswer {
    pub provider: Provider,
    pub query: String,
    pub response_text: String,
    pub citations: Vec<RawCitation>,
    pub response_time_ms: u64,
}

#[derive(Debug, Clone)]
pub struct RateLimitStatus {
    pub limit: u32,
    pub used: u32,
    pub reset_at: chrono::DateTime<chrono::Utc>,
}
