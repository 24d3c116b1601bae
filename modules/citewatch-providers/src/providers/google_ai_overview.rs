use crate::rate_limit::SlidingWindowLimiter;
use crate::traits::ProviderAdapter;
use crate::transport::{map_http_status, map_reqwest_error, Transport};
use crate::types::{ProviderAnswer, QueryOptions, RateLimitStatus, RawCitation};
use async_trait::async_trait;
use citewatch_common::{Provider, ProviderError, ProviderErrorKind};
use serde::Deserialize;

const DEFAULT_RATE_PER_MIN: u32 = 30;

/// Adapter over a SERP provider's AI Overview extraction (`text_block` +
/// `references[]`). When the SERP has no AI-Overview block for this query —
/// a common, expected outcome, not a failure — the adapter returns an empty
/// citation list alongside whatever plain snippet the SERP did return.
pub struct GoogleAiOverviewAdapter {
    transport: Transport,
    limiter: SlidingWindowLimiter,
}

impl GoogleAiOverviewAdapter {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>, rate_per_min: Option<u32>) -> Self {
        Self {
            transport: Transport::new(api_key, base_url),
            limiter: SlidingWindowLimiter::per_minute(rate_per_min.unwrap_or(DEFAULT_RATE_PER_MIN)),
        }
    }
}

#[derive(Deserialize, Default)]
struct SerpResponse {
    #[serde(default)]
    snippet: Option<String>,
    #[serde(default)]
    ai_overview: Option<AiOverviewBlock>,
}

#[derive(Deserialize)]
struct AiOverviewBlock {
    text_block: String,
    #[serde(default)]
    references: Vec<SerpReference>,
}

#[derive(Deserialize)]
struct SerpReference {
    url: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    snippet: Option<String>,
}

#[async_trait]
impl ProviderAdapter for GoogleAiOverviewAdapter {
    async fn query(&self, query_text: &str, options: &QueryOptions) -> Result<ProviderAnswer, ProviderError> {
        self.limiter.acquire().await;

        let url = format!("{}/search", self.transport.base_url);
        let headers = self.transport.headers("Bearer")?;

        let started = std::time::Instant::now();
        let response = self
            .transport
            .http
            .get(&url)
            .headers(headers)
            .query(&[("q", query_text)])
            .timeout(options.timeout)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let response_time_ms = started.elapsed().as_millis() as u64;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(map_http_status(status, &text));
        }

        let parsed: SerpResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::new(ProviderErrorKind::MalformedResponse, e.to_string()))?;

        let (response_text, citations) = match parsed.ai_overview {
            Some(block) => {
                let citations = block
                    .references
                    .into_iter()
                    .enumerate()
                    .map(|(i, r)| RawCitation {
                        url: r.url,
                        title: r.title,
                        snippet: r.snippet,
                        rank: i as u32 + 1,
                    })
                    .collect();
                (block.text_block, citations)
            }
            // No AI-Overview block: not an error, just nothing to cite.
            None => (parsed.snippet.unwrap_or_default(), Vec::new()),
        };

        Ok(ProviderAnswer {
            provider: Provider::GoogleAiOverview,
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_ai_overview_block_is_not_an_error_shape() {
        let parsed = SerpResponse {
            snippet: Some("plain snippet".to_string()),
            ai_overview: None,
        };
        let (text, citations) = match parsed.ai_overview {
            Some(_) => unreachable!(),
            None => (parsed.snippet.unwrap_or_default(), Vec::<RawCitation>::new()),
        };
        assert_eq!(text, "plain snippet");
        assert!(citations.is_empty());
    }
}
