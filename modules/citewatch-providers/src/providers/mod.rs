pub mod chatgpt;
pub mod claude;
pub mod copilot;
pub mod deepseek;
pub mod gemini;
pub mod google_ai_overview;
pub mod grok;
pub mod perplexity;

use crate::extract::extract_from_text;
use crate::types::{ProviderAnswer, RawCitation};
use citewatch_common::Provider;

/// Shared tail-end of every "OpenAI-style / unstructured" adapter: run the
/// text scanner over the raw response and wrap it into a `ProviderAnswer`.
/// Each adapter module still owns its own request/response wire types and
/// its own rate limiter instance — only this last mile is common.
pub(crate) fn answer_from_unstructured(
    provider: Provider,
    query: &str,
    response_text: String,
    response_time_ms: u64,
) -> ProviderAnswer {
    let citations = extract_from_text(&response_text);
    ProviderAnswer {
        provider,
        query: query.to_string(),
        response_text,
        citations,
        response_time_ms,
    }
}

/// Dense first-seen re-ranking used by adapters whose source material (a
/// grounding block plus inline references, in Gemini's case) can report the
/// same document twice under different provisional ranks.
pub(crate) fn dedup_first_seen(citations: Vec<RawCitation>) -> Vec<RawCitation> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for c in citations {
        if seen.insert(c.url.clone()) {
            out.push(c);
        }
    }
    for (i, c) in out.iter_mut().enumerate() {
        c.rank = i as u32 + 1;
    }
    out
}
