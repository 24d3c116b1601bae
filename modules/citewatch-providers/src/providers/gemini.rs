use super::dedup_first_seen;
use crate::extract::extract_from_text;
use crate::rate_limit::SlidingWindowLimiter;
use crate::traits::ProviderAdapter;
use crate::transport::{map_http_status, map_reqwest_error, Transport};
use crate::types::{ProviderAnswer, QueryOptions, RateLimitStatus, RawCitation};
use async_trait::async_trait;
use citewatch_common::{Provider, ProviderError, ProviderErrorKind};
use serde::Deserialize;

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_RATE_PER_MIN: u32 = 15;

pub struct GeminiAdapter {
    transport: Transport,
    model: String,
    limiter: SlidingWindowLimiter,
}

impl GeminiAdapter {
    pub fn new(api_key: impl Into<String>, rate_per_min: Option<u32>) -> Self {
        Self {
            transport: Transport::new(api_key, GEMINI_API_URL),
            model: DEFAULT_MODEL.to_string(),
            limiter: SlidingWindowLimiter::per_minute(rate_per_min.unwrap_or(DEFAULT_RATE_PER_MIN)),
        }
    }
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Content,
    #[serde(rename = "groundingMetadata")]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Deserialize)]
struct GroundingMetadata {
    #[serde(rename = "groundingChunks", default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Deserialize)]
struct GroundingChunk {
    web: Option<WebChunk>,
}

#[derive(Deserialize)]
struct WebChunk {
    uri: String,
    title: Option<String>,
}

#[async_trait]
impl ProviderAdapter for GeminiAdapter {
    async fn query(&self, query_text: &str, options: &QueryOptions) -> Result<ProviderAnswer, ProviderError> {
        self.limiter.acquire().await;

        // The API key travels as a query param for Gemini's REST surface,
        // not a bearer header.
        let url = format!(
            "{}/{}:generateContent",
            self.transport.base_url, self.model,
        );

        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": query_text }] }],
            "generationConfig": {
                "temperature": options.temperature,
                "maxOutputTokens": options.max_tokens,
            },
            "tools": if options.grounding_enabled {
                serde_json::json!([{ "google_search": {} }])
            } else {
                serde_json::json!([])
            },
        });

        let started = std::time::Instant::now();
        let response = self
            .transport
            .http
            .post(&url)
            .query(&[("key", self.transport.api_key())])
            .timeout(options.timeout)
            .json(&body)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let response_time_ms = started.elapsed().as_millis() as u64;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(map_http_status(status, &text));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::new(ProviderErrorKind::MalformedResponse, e.to_string()))?;

        let candidate = parsed
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::new(ProviderErrorKind::MalformedResponse, "no candidates returned"))?;

        let response_text = candidate
            .content
            .parts
            .into_iter()
            .filter_map(|p| p.text)
            .collect::<Vec<_>>()
            .join("");

        // Grounding-metadata citations, first-seen ranked.
        let mut citations: Vec<RawCitation> = candidate
            .grounding_metadata
            .map(|g| g.grounding_chunks)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|chunk| chunk.web)
            .enumerate()
            .map(|(i, web)| RawCitation {
                url: web.uri,
                title: web.title,
                snippet: None,
                rank: i as u32 + 1,
            })
            .collect();

        // Inline `[n]`-style references scattered in text are emitted too —
        // the spec requires both sources merged and re-ranked first-seen.
        let inline = extract_from_text(&response_text);
        citations.extend(inline);
        let citations = dedup_first_seen(citations);

        Ok(ProviderAnswer {
            provider: Provider::Gemini,
            query: query_text.to_string(),
            response_text,
            citations,
            response_time_ms,
        })
    }

    fn rate_limit_status(&self) -> RateLimitStatus {
        let (limit, used) = self.limiter.status();
        RateLimitStatus {
            limit,
            used,
            reset_at: chrono::Utc::now() + chrono::Duration::seconds(60),
        }
    }

    async fn healthcheck(&self) -> Result<(), ProviderError> {
        if self.transport.api_key().is_empty() {
            return Err(ProviderError::new(ProviderErrorKind::Auth, "missing api key"));
        }
        Ok(())
    }
}
