use std::env;

/// Process configuration loaded from environment variables.
///
/// Mirrors the teacher's per-process `Config::from_env` constructors: the
/// worker process needs the broker and every provider key it can find, while
/// one-shot CLI tooling only needs the store and whichever providers the
/// invocation touches. Each constructor panics with a clear message on a
/// missing *required* var; optional vars fall back to documented defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub queue_url: String,

    /// `(Provider, api_key)` pairs for providers whose
    /// `PROVIDER_{NAME}_API_KEY` env var was set. Absent providers are
    /// simply not registered with the adapter registry.
    pub provider_api_keys: Vec<(String, String)>,
    /// `(Provider, cap_per_minute)` for providers with an explicit
    /// `PROVIDER_{NAME}_RATE_PER_MIN` override.
    pub provider_rate_overrides: Vec<(String, u32)>,

    pub worker_concurrency: usize,
    pub job_deadline_seconds: u64,
    pub tracking_interval_hours: u32,
    pub max_retries: u32,

    pub retention_citations_days: i64,
    pub retention_alerts_days: i64,
    pub retention_jobs_days: i64,
}

const PROVIDER_NAMES: [&str; 8] = [
    "GOOGLE_AI_OVERVIEW",
    "GEMINI",
    "CHATGPT",
    "PERPLEXITY",
    "COPILOT",
    "CLAUDE",
    "GROK",
    "DEEPSEEK",
];

impl Config {
    /// Load configuration for the worker process (scheduler + worker pool +
    /// every configured provider adapter).
    pub fn from_env() -> Self {
        let provider_api_keys = PROVIDER_NAMES
            .iter()
            .filter_map(|name| {
                let key = env::var(format!("PROVIDER_{name}_API_KEY")).ok()?;
                if key.is_empty() {
                    None
                } else {
                    Some((name.to_lowercase(), key))
                }
            })
            .collect();

        let provider_rate_overrides = PROVIDER_NAMES
            .iter()
            .filter_map(|name| {
                let raw = env::var(format!("PROVIDER_{name}_RATE_PER_MIN")).ok()?;
                raw.parse::<u32>().ok().map(|n| (name.to_lowercase(), n))
            })
            .collect();

        Self {
            database_url: required_env("DATABASE_URL"),
            queue_url: required_env("QUEUE_URL"),
            provider_api_keys,
            provider_rate_overrides,
            worker_concurrency: env_or("WORKER_CONCURRENCY", 5),
            job_deadline_seconds: env_or("JOB_DEADLINE_SECONDS", 60),
            tracking_interval_hours: env_or("TRACKING_INTERVAL_HOURS", 24),
            max_retries: env_or("MAX_RETRIES", 3),
            retention_citations_days: env_or("RETENTION_CITATIONS_DAYS", 365),
            retention_alerts_days: env_or("RETENTION_ALERTS_DAYS", 90),
            retention_jobs_days: env_or("RETENTION_JOBS_DAYS", 30),
        }
    }

    /// Load configuration for one-shot CLI tooling: same shape, but
    /// `QUEUE_URL` is optional since `citewatch-cli` talks to the store
    /// directly rather than through the broker for most subcommands.
    pub fn cli_from_env() -> Self {
        let mut cfg = Self::from_env_with_queue_optional();
        cfg.worker_concurrency = 1;
        cfg
    }

    fn from_env_with_queue_optional() -> Self {
        let provider_api_keys = PROVIDER_NAMES
            .iter()
            .filter_map(|name| {
                let key = env::var(format!("PROVIDER_{name}_API_KEY")).ok()?;
                if key.is_empty() {
                    None
                } else {
                    Some((name.to_lowercase(), key))
                }
            })
            .collect();

        Self {
            database_url: required_env("DATABASE_URL"),
            queue_url: env::var("QUEUE_URL").unwrap_or_default(),
            provider_api_keys,
            provider_rate_overrides: Vec::new(),
            worker_concurrency: 1,
            job_deadline_seconds: env_or("JOB_DEADLINE_SECONDS", 60),
            tracking_interval_hours: env_or("TRACKING_INTERVAL_HOURS", 24),
            max_retries: env_or("MAX_RETRIES", 3),
            retention_citations_days: env_or("RETENTION_CITATIONS_DAYS", 365),
            retention_alerts_days: env_or("RETENTION_ALERTS_DAYS", 90),
            retention_jobs_days: env_or("RETENTION_JOBS_DAYS", 30),
        }
    }

    /// Log which providers are registered and which env-driven knobs are in
    /// effect, without ever printing a key value.
    pub fn log_redacted(&self) {
        for (name, key) in &self.provider_api_keys {
            tracing::info!(provider = name.as_str(), key_chars = key.len(), "provider configured");
        }
        tracing::info!(
            worker_concurrency = self.worker_concurrency,
            job_deadline_seconds = self.job_deadline_seconds,
            tracking_interval_hours = self.tracking_interval_hours,
            max_retries = self.max_retries,
            "worker configuration"
        );
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
