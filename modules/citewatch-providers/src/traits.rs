use crate::types::{ProviderAnswer, QueryOptions, RateLimitStatus};
use async_trait::async_trait;
use citewatch_common::ProviderError;

/// The single interface a plugin author implements to add a provider.
/// Dispatch from the registry is by trait object, not by tagged enum match,
/// so a new adapter needs no change to the core crates — it is registered at
/// process start and looked up by `Provider` key (the "immutable registry
/// populated at process start" redesign from the source's dynamic
/// per-platform singletons).
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    async fn query(&self, query_text: &str, options: &QueryOptions) -> Result<ProviderAnswer, ProviderError>;

    fn rate_limit_status(&self) -> RateLimitStatus;

    async fn healthcheck(&self) -> Result<(), ProviderError>;
}
