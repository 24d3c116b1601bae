use crate::rate_limit::SlidingWindowLimiter;
use crate::traits::ProviderAdapter;
use crate::transport::{map_http_status, map_reqwest_error, Transport};
use crate::types::{ProviderAnswer, QueryOptions, RateLimitStatus, RawCitation};
use async_trait::async_trait;
use citewatch_common::{Provider, ProviderError, ProviderErrorKind};
use serde::{Deserialize, Serialize};

const PERPLEXITY_API_URL: &str = "https://api.perplexity.ai";
const DEFAULT_MODEL: &str = "sonar";
const DEFAULT_RATE_PER_MIN: u32 = 20;

pub struct PerplexityAdapter {
    transport: Transport,
    model: String,
    limiter: SlidingWindowLimiter,
}

impl PerplexityAdapter {
    pub fn new(api_key: impl Into<String>, rate_per_min: Option<u32>) -> Self {
        Self {
            transport: Transport::new(api_key, PERPLEXITY_API_URL),
            model: DEFAULT_MODEL.to_string(),
            limiter: SlidingWindowLimiter::per_minute(rate_per_min.unwrap_or(DEFAULT_RATE_PER_MIN)),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    /// Flat array of cited URIs; Perplexity carries no title/snippet per
    /// citation, only the URI list in document order.
    #[serde(default)]
    citations: Vec<String>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

#[async_trait]
impl ProviderAdapter for PerplexityAdapter {
    async fn query(&self, query_text: &str, options: &QueryOptions) -> Result<ProviderAnswer, ProviderError> {
        self.limiter.acquire().await;

        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: query_text,
            }],
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        };

        let url = format!("{}/chat/completions", self.transport.base_url);
        let headers = self.transport.headers("Bearer")?;

        let started = std::time::Instant::now();
        let response = self
            .transport
            .http
            .post(&url)
            .headers(headers)
            .timeout(options.timeout)
            .json(&request)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let response_time_ms = started.elapsed().as_millis() as u64;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(map_http_status(status, &text));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::new(ProviderErrorKind::MalformedResponse, e.to_string()))?;

        let response_text = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ProviderError::new(ProviderErrorKind::MalformedResponse, "no choices returned"))?;

        // Rank is array index + 1, title/snippet are always empty.
        let citations = parsed
            .citations
            .into_iter()
            .enumerate()
            .map(|(i, url)| RawCitation {
                url,
                title: None,
                snippet: None,
                rank: i as u32 + 1,
            })
            .collect();

        Ok(ProviderAnswer {
            provider: Provider::Perplexity,
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
