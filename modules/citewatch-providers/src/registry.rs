use crate::providers::{chatgpt, claude, copilot, deepseek, gemini, google_ai_overview, grok, perplexity};
use crate::traits::ProviderAdapter;
use citewatch_common::{Config, Provider};
use std::collections::HashMap;
use std::sync::Arc;

/// Immutable registry of adapters, populated once at process start from
/// `Config`. This is the redesign target for the source's dynamic
/// per-platform service singletons: nothing here is lazily constructed on
/// first use, and there is no global mutable state — the registry is built
/// once and handed to `TrackingEngine` by value.
pub struct AdapterRegistry {
    adapters: HashMap<Provider, Arc<dyn ProviderAdapter>>,
}

impl AdapterRegistry {
    /// Build the registry from configuration: a provider with a configured
    /// API key gets an adapter entry; one without a key is simply absent,
    /// so `get` returns `None` and the tracking engine treats it as "not
    /// configured" per the adapter-resolution step of `TrackKeyword`.
    pub fn from_config(config: &Config) -> Self {
        let mut adapters: HashMap<Provider, Arc<dyn ProviderAdapter>> = HashMap::new();

        let rate_for = |name: &str| -> Option<u32> {
            config
                .provider_rate_overrides
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| *v)
        };

        for (name, key) in &config.provider_api_keys {
            let rate = rate_for(name);
            match name.as_str() {
                "google_ai_overview" => {
                    adapters.insert(
                        Provider::GoogleAiOverview,
                        Arc::new(google_ai_overview::GoogleAiOverviewAdapter::new(
                            key.clone(),
                            "https://api.serp-provider.example/v1",
                            rate,
                        )),
                    );
                }
                "gemini" => {
                    adapters.insert(Provider::Gemini, Arc::new(gemini::GeminiAdapter::new(key.clone(), rate)));
                }
                "chatgpt" => {
                    adapters.insert(Provider::Chatgpt, Arc::new(chatgpt::ChatgptAdapter::new(key.clone(), rate)));
                }
                "perplexity" => {
                    adapters.insert(Provider::Perplexity, Arc::new(perplexity::PerplexityAdapter::new(key.clone(), rate)));
                }
                "copilot" => {
                    adapters.insert(Provider::Copilot, Arc::new(copilot::CopilotAdapter::new(key.clone(), rate)));
                }
                "claude" => {
                    adapters.insert(Provider::Claude, Arc::new(claude::ClaudeAdapter::new(key.clone(), rate)));
                }
                "grok" => {
                    adapters.insert(Provider::Grok, Arc::new(grok::GrokAdapter::new(key.clone(), rate)));
                }
                "deepseek" => {
                    adapters.insert(Provider::Deepseek, Arc::new(deepseek::DeepseekAdapter::new(key.clone(), rate)));
                }
                other => {
                    tracing::warn!(provider = other, "unrecognized provider name in config, skipping");
                }
            }
        }

        Self { adapters }
    }

    pub fn get(&self, provider: Provider) -> Option<Arc<dyn ProviderAdapter>> {
        self.adapters.get(&provider).cloned()
    }

    pub fn is_configured(&self, provider: Provider) -> bool {
        self.adapters.contains_key(&provider)
    }

    pub fn configured_providers(&self) -> Vec<Provider> {
        self.adapters.keys().copied().collect()
    }
}
