//! Sentiment & Confidence (C3): deterministic, lexicon-based sentiment over
//! sentences that mention the target domain, plus a response-shape-derived
//! confidence heuristic. Both are pinned exactly so tests can assert on
//! concrete outputs rather than ranges.

use citewatch_common::Sentiment;

/// Overridable at adapter-registry construction time; the two constants
/// below are the baseline the default tests target.
#[derive(Debug, Clone)]
pub struct SentimentLexicon {
    pub positive: Vec<String>,
    pub negative: Vec<String>,
}

impl Default for SentimentLexicon {
    fn default() -> Self {
        Self {
            positive: ["best", "excellent", "top", "recommended", "leading", "outstanding", "superior"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            negative: ["worst", "poor", "avoid", "bad", "terrible", "disappointing"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Split on runs of `.`, `!`, `?`; drop empty/whitespace-only fragments.
fn split_sentences(text: &str) -> Vec<&str> {
    text.split(|c: char| matches!(c, '.' | '!' | '?'))
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect()
}

pub fn classify_sentiment(response_text: &str, primary_domain: &str, lexicon: &SentimentLexicon) -> Sentiment {
    let host = primary_domain.to_lowercase();
    let relevant: Vec<&str> = split_sentences(response_text)
        .into_iter()
        .filter(|s| s.to_lowercase().contains(&host))
        .collect();

    if relevant.is_empty() {
        return Sentiment::Neutral;
    }

    let joined = relevant.join(" ").to_lowercase();
    let positive_count: usize = lexicon.positive.iter().map(|w| count_occurrences(&joined, w)).sum();
    let negative_count: usize = lexicon.negative.iter().map(|w| count_occurrences(&joined, w)).sum();

    if positive_count > negative_count {
        Sentiment::Positive
    } else if negative_count > positive_count {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    }
}

fn count_occurrences(haystack: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }
    haystack.matches(needle).count()
}

/// Start at 0.5; +0.2 if citation count >= 5 else +0.1 if >= 3; +0.1 if
/// response time < 3s; +0.1 if response text length > 500 chars. Clamped to
/// [0, 1].
pub fn confidence_score(citation_count: usize, response_time_ms: u64, response_text_len: usize) -> f64 {
    let mut score = 0.5;
    if citation_count >= 5 {
        score += 0.2;
    } else if citation_count >= 3 {
        score += 0.1;
    }
    if response_time_ms < 3_000 {
        score += 0.1;
    }
    if response_text_len > 500 {
        score += 0.1;
    }
    score.clamp(0.0, 1.0)
}

/// Truncate `response_text` to <= 500 chars at the last sentence boundary
/// whose end index is >= 70% of 500; hard-truncate with a trailing "..."
/// if no such boundary exists.
pub fn summarize_response(response_text: &str) -> String {
    const LIMIT: usize = 500;
    const MIN_BOUNDARY: usize = (LIMIT * 70) / 100;

    if response_text.chars().count() <= LIMIT {
        return response_text.to_string();
    }

    let chars: Vec<char> = response_text.chars().collect();
    let window: String = chars[..LIMIT].iter().collect();

    let mut best_boundary: Option<usize> = None;
    for (idx, c) in window.char_indices() {
        if matches!(c, '.' | '!' | '?') {
            let end_index = idx + c.len_utf8();
            if end_index >= MIN_BOUNDARY {
                best_boundary = Some(end_index);
            }
        }
    }

    match best_boundary {
        Some(end) => window[..end].to_string(),
        None => format!("{}...", &window),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_mention_of_target_domain() {
        let lexicon = SentimentLexicon::default();
        let s = classify_sentiment("Acme.com is a leading provider.", "acme.com", &lexicon);
        assert_eq!(s, Sentiment::Positive);
    }

    #[test]
    fn sentences_not_mentioning_target_are_ignored() {
        let lexicon = SentimentLexicon::default();
        let s = classify_sentiment("Other.com is the worst. Acme.com is fine.", "acme.com", &lexicon);
        assert_eq!(s, Sentiment::Neutral);
    }

    #[test]
    fn no_mention_is_neutral() {
        let lexicon = SentimentLexicon::default();
        let s = classify_sentiment("Nothing relevant here at all.", "acme.com", &lexicon);
        assert_eq!(s, Sentiment::Neutral);
    }

    #[test]
    fn tie_is_neutral() {
        let lexicon = SentimentLexicon::default();
        let s = classify_sentiment("Acme.com is the best and the worst.", "acme.com", &lexicon);
        assert_eq!(s, Sentiment::Neutral);
    }

    #[test]
    fn confidence_maxes_out_with_strong_signals() {
        let c = confidence_score(6, 1_500, 600);
        assert!((c - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn confidence_baseline_with_weak_signals() {
        let c = confidence_score(0, 10_000, 50);
        assert!((c - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn short_text_is_not_truncated() {
        let s = summarize_response("Short answer.");
        assert_eq!(s, "Short answer.");
    }

    #[test]
    fn long_text_truncates_at_sentence_boundary() {
        let mut text = "A".repeat(360);
        text.push('.');
        text.push_str(&"B".repeat(200));
        text.push('.');
        let summary = summarize_response(&text);
        assert!(summary.len() <= 500);
        assert!(summary.ends_with('.'));
    }

    #[test]
    fn long_text_with_no_boundary_hard_truncates() {
        let text = "A".repeat(600);
        let summary = summarize_response(&text);
        assert!(summary.ends_with("..."));
        assert_eq!(summary.chars().count(), 503);
    }
}
