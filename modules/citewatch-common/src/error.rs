use thiserror::Error;

/// Top-level error taxonomy for the tracking core.
///
/// Each variant lines up with one of the error kinds from the error-handling
/// design: provider failures, store failures, and the rarer planner/normalizer
/// failures all get their own shape so callers can match on `kind` without
/// string-sniffing a message.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("store error: {0}")]
    Store(String),

    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("normalizer error: {0}")]
    Normalizer(String),

    #[error("planner error: {0}")]
    Planner(String),

    #[error("queue error: {0}")]
    Queue(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("provider not configured: {0}")]
    ProviderNotConfigured(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

/// The kinds of failure a provider adapter can report, per the adapter
/// contract. `retriable` decides whether the worker moves the job to
/// `retrying` or straight to `failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    Transport,
    Auth,
    RateLimited,
    QuotaExceeded,
    Timeout,
    MalformedResponse,
    UpstreamError,
}

impl ProviderErrorKind {
    /// Transport and timeout errors are retriable; auth, quota, and malformed
    /// responses won't succeed again without operator action on the first
    /// attempt. Rate-limiting is retriable — the limiter already throttles
    /// starts, so a rate_limited error indicates the *provider's own* cap was
    /// hit despite our local bookkeeping.
    pub fn is_retriable(self) -> bool {
        matches!(self, Self::Transport | Self::Timeout | Self::RateLimited)
    }
}

#[derive(Error, Debug)]
#[error("{kind:?}: {message}")]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub retriable: bool,
    pub message: String,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            retriable: kind.is_retriable(),
            kind,
            message: message.into(),
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
