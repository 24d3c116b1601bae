use super::answer_from_unstructured;
use crate::rate_limit::SlidingWindowLimiter;
use crate::traits::ProviderAdapter;
use crate::transport::{map_http_status, map_reqwest_error, Transport};
use crate::types::{ProviderAnswer, QueryOptions, RateLimitStatus};
use async_trait::async_trait;
use citewatch_common::{Provider, ProviderError, ProviderErrorKind};
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";
const DEFAULT_RATE_PER_MIN: u32 = 20;

pub struct ClaudeAdapter {
    transport: Transport,
    model: String,
    limiter: SlidingWindowLimiter,
}

impl ClaudeAdapter {
    pub fn new(api_key: impl Into<String>, rate_per_min: Option<u32>) -> Self {
        Self {
            transport: Transport::new(api_key, ANTHROPIC_API_URL),
            model: DEFAULT_MODEL.to_string(),
            limiter: SlidingWindowLimiter::per_minute(rate_per_min.unwrap_or(DEFAULT_RATE_PER_MIN)),
        }
    }

    fn headers(&self) -> Result<reqwest::header::HeaderMap, ProviderError> {
        let mut headers = reqwest::header::HeaderMap::new();
        let key_value = reqwest::header::HeaderValue::from_str(self.transport.api_key())
            .map_err(|e| ProviderError::new(ProviderErrorKind::Auth, format!("invalid api key: {e}")))?;
        headers.insert("x-api-key", key_value);
        headers.insert("anthropic-version", reqwest::header::HeaderValue::from_static(ANTHROPIC_VERSION));
        headers.insert(CONTENT_TYPE, reqwest::header::HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<MessageIn<'a>>,
}

#[derive(Serialize)]
struct MessageIn<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

#[async_trait]
impl ProviderAdapter for ClaudeAdapter {
    async fn query(&self, query_text: &str, options: &QueryOptions) -> Result<ProviderAnswer, ProviderError> {
        self.limiter.acquire().await;

        let request = MessagesRequest {
            model: &self.model,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            messages: vec![MessageIn {
                role: "user",
                content: query_text,
            }],
        };

        let url = format!("{}/messages", self.transport.base_url);

        let started = std::time::Instant::now();
        let response = self
            .transport
            .http
            .post(&url)
            .headers(self.headers()?)
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

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::new(ProviderErrorKind::MalformedResponse, e.to_string()))?;

        let response_text = parsed
            .content
            .into_iter()
            .filter_map(|b| b.text)
            .collect::<Vec<_>>()
            .join("");

        if response_text.is_empty() {
            return Err(ProviderError::new(ProviderErrorKind::MalformedResponse, "empty content blocks"));
        }

        Ok(answer_from_unstructured(Provider::Claude, query_text, response_text, response_time_ms))
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
