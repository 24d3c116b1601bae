//! Tracks the 1-hour quota-exceeded cooldown per provider (§4.5 "Failure
//! semantics"): once a provider returns `quota_exceeded`, its jobs
//! short-circuit to `failed` with that error until the cooldown lapses,
//! rather than retrying against a provider that's already told us no.

use citewatch_common::Provider;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

const COOLDOWN: Duration = Duration::from_secs(60 * 60);

pub struct ProviderCooldown {
    until: Mutex<HashMap<Provider, Instant>>,
}

impl ProviderCooldown {
    pub fn new() -> Self {
        Self { until: Mutex::new(HashMap::new()) }
    }

    pub fn trigger(&self, provider: Provider) {
        let mut guard = self.until.lock().expect("cooldown mutex poisoned");
        guard.insert(provider, Instant::now() + COOLDOWN);
    }

    pub fn is_cooling_down(&self, provider: Provider) -> bool {
        let guard = self.until.lock().expect("cooldown mutex poisoned");
        match guard.get(&provider) {
            Some(until) => Instant::now() < *until,
            None => false,
        }
    }
}

impl Default for ProviderCooldown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn freshly_triggered_provider_is_cooling_down() {
        let cooldown = ProviderCooldown::new();
        assert!(!cooldown.is_cooling_down(Provider::Gemini));
        cooldown.trigger(Provider::Gemini);
        assert!(cooldown.is_cooling_down(Provider::Gemini));
    }

    #[test]
    fn cooldown_is_per_provider() {
        let cooldown = ProviderCooldown::new();
        cooldown.trigger(Provider::Gemini);
        assert!(!cooldown.is_cooling_down(Provider::Chatgpt));
    }
}
