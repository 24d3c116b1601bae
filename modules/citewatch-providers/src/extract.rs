//! Unstructured-text citation extraction, shared by every provider adapter
//! that has no structured citation field (chatgpt, copilot, claude, grok,
//! deepseek — the "OpenAI-style" family in the adapter contract).
//!
//! Scans the response text for, in precedence order:
//!   (a) Markdown `[title](url)` links
//!   (b) bare `http(s)://...` URLs
//!   (c) numbered citation `[n] ... url` patterns
//!
//! Precedence means an earlier pattern claims its span of text so a later
//! pattern cannot re-match the same characters (a bare URL already inside a
//! Markdown link is not double-counted). The final citation list is ordered
//! by first appearance in the text and deduplicated by URL, keeping the
//! earliest occurrence's rank.

use crate::types::RawCitation;
use regex::Regex;
use std::sync::OnceLock;

struct Match {
    start: usize,
    end: usize,
    url: String,
    title: Option<String>,
}

fn markdown_link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[([^\]\n]{1,200}?)\]\((https?://[^\s)]+)\)").expect("valid regex"))
}

fn bare_url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"https?://[^\s\]\)>]+").expect("valid regex"))
}

fn numbered_citation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\[(\d+)\][^\n]{0,120}?(https?://[^\s\]\)>]+)").expect("valid regex")
    })
}

fn overlaps(claimed: &[(usize, usize)], start: usize, end: usize) -> bool {
    claimed.iter().any(|&(cs, ce)| start < ce && end > cs)
}

fn trim_trailing_punct(url: &str) -> String {
    url.trim_end_matches(['.', ',', ';', ':', '!', '?', '\'', '"']).to_string()
}

/// Extract citations from free-form response text. Returns a deduplicated,
/// first-seen-ranked list; `title`/`snippet` are set only for Markdown links.
pub fn extract_from_text(text: &str) -> Vec<RawCitation> {
    let mut claimed: Vec<(usize, usize)> = Vec::new();
    let mut matches: Vec<Match> = Vec::new();

    for caps in markdown_link_re().captures_iter(text) {
        let whole = caps.get(0).expect("group 0 always present");
        let title = caps.get(1).map(|m| m.as_str().trim().to_string());
        let url = trim_trailing_punct(caps.get(2).expect("url group").as_str());
        claimed.push((whole.start(), whole.end()));
        matches.push(Match {
            start: whole.start(),
            end: whole.end(),
            url,
            title,
        });
    }

    for m in bare_url_re().find_iter(text) {
        if overlaps(&claimed, m.start(), m.end()) {
            continue;
        }
        let url = trim_trailing_punct(m.as_str());
        claimed.push((m.start(), m.end()));
        matches.push(Match {
            start: m.start(),
            end: m.end(),
            url,
            title: None,
        });
    }

    for caps in numbered_citation_re().captures_iter(text) {
        let whole = caps.get(0).expect("group 0 always present");
        if overlaps(&claimed, whole.start(), whole.end()) {
            continue;
        }
        let url = trim_trailing_punct(caps.get(2).expect("url group").as_str());
        claimed.push((whole.start(), whole.end()));
        matches.push(Match {
            start: whole.start(),
            end: whole.end(),
            url,
            title: None,
        });
    }

    matches.sort_by_key(|m| m.start);

    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for m in matches {
        if !seen.insert(m.url.clone()) {
            continue;
        }
        let rank = out.len() as u32 + 1;
        out.push(RawCitation {
            url: m.url,
            title: m.title,
            snippet: None,
            rank,
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markdown_links_take_precedence_over_bare_urls() {
        let text = "See [Acme Guide](https://acme.com/guide) for details.";
        let got = extract_from_text(text);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].url, "https://acme.com/guide");
        assert_eq!(got[0].title.as_deref(), Some("Acme Guide"));
        assert_eq!(got[0].rank, 1);
    }

    #[test]
    fn bare_urls_are_ranked_first_seen() {
        let text = "Visit https://b.com first, then https://a.com later.";
        let got = extract_from_text(text);
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].url, "https://b.com");
        assert_eq!(got[0].rank, 1);
        assert_eq!(got[1].url, "https://a.com");
        assert_eq!(got[1].rank, 2);
    }

    #[test]
    fn numbered_citations_extracted_when_not_already_bare_url_claimed() {
        // The bare-url pass claims this span before the numbered pass runs,
        // per precedence order — still produces one citation, not zero.
        let text = "Acme is great [1] https://acme.com/page";
        let got = extract_from_text(text);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].url, "https://acme.com/page");
    }

    #[test]
    fn deduplicates_by_url_keeping_first_occurrence() {
        let text = "https://acme.com is good. Later, https://acme.com again.";
        let got = extract_from_text(text);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].rank, 1);
    }

    #[test]
    fn trims_trailing_sentence_punctuation() {
        let text = "Check https://acme.com/page.";
        let got = extract_from_text(text);
        assert_eq!(got[0].url, "https://acme.com/page");
    }
}
