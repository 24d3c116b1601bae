use citewatch_common::{ProviderError, ProviderErrorKind};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

/// Shared bearer-auth HTTP plumbing. Every adapter builds one of these
/// instead of hand-rolling its own `reqwest::Client` and header map, the
/// generalization of the teacher's `OpenAiClient`/Claude client constructors
/// which each did this inline.
pub struct Transport {
    pub http: reqwest::Client,
    api_key: String,
    pub base_url: String,
}

impl Transport {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn headers(&self, auth_header: &str) -> Result<HeaderMap, ProviderError> {
        let mut headers = HeaderMap::new();
        let value = HeaderValue::from_str(&format!("{auth_header} {}", self.api_key)).map_err(|e| {
            ProviderError::new(ProviderErrorKind::Auth, format!("invalid api key header: {e}"))
        })?;
        headers.insert(AUTHORIZATION, value);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

/// Translate a transport-level failure into the adapter contract's error
/// shape. Timeouts are distinguished from generic transport failures because
/// they carry different retry semantics upstream (both retriable here, but
/// kept distinct for observability).
pub fn map_reqwest_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::new(ProviderErrorKind::Timeout, err.to_string())
    } else {
        ProviderError::new(ProviderErrorKind::Transport, err.to_string())
    }
}

pub fn map_http_status(status: reqwest::StatusCode, body: &str) -> ProviderError {
    let kind = match status.as_u16() {
        401 | 403 => ProviderErrorKind::Auth,
        429 => ProviderErrorKind::RateLimited,
        402 | 413 => ProviderErrorKind::QuotaExceeded,
        500..=599 => ProviderErrorKind::UpstreamError,
        _ => ProviderErrorKind::UpstreamError,
    };
    ProviderError::new(kind, format!("http {status}: {body}"))
}
