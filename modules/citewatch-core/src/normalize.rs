//! Citation Normalizer (C2): merges a provider's raw citation list with the
//! project's domain config into the fields persisted on a `Citation`.

use citewatch_common::domain::{host_matches_target, normalize_domain};
use citewatch_common::CompetitorCitation;
use citewatch_providers::RawCitation;

pub struct NormalizedCitations {
    pub domain_mentioned: bool,
    pub citation_position: Option<u32>,
    pub citation_context: Option<String>,
    pub competitor_citations: Vec<CompetitorCitation>,
    pub total_sources_cited: u32,
}

/// Extract the normalized host from a URL for domain-matching purposes only
/// — the full URL is preserved elsewhere on the record. Returns `None` for
/// blank hosts and opaque (non-http(s)) schemes, which §4.2 step 1 calls
/// "domain unknown".
fn normalized_host(raw_url: &str) -> Option<String> {
    let parsed = url::Url::parse(raw_url).ok()?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return None;
    }
    let host = parsed.host_str()?;
    if host.is_empty() {
        return None;
    }
    Some(normalize_domain(host))
}

/// Run the normalizer over one provider answer's citation list.
///
/// Domain-unknown entries (blank host / opaque scheme) are dropped entirely:
/// they cannot be classified as self, competitor, or third-party, and
/// counting them toward `total_sources_cited` without a domain would break
/// the `total_sources_cited = self + |competitor_citations|` invariant that
/// every persisted Citation must satisfy. So unlike target/competitor
/// citations, domain-unknown entries never survive normalization.
pub fn normalize(
    citations: &[RawCitation],
    primary_domain: &str,
    competitor_domains: &[String],
) -> NormalizedCitations {
    let target = normalize_domain(primary_domain);
    let competitors: Vec<String> = competitor_domains.iter().map(|d| normalize_domain(d)).collect();

    // Dedup by canonical URL, keeping the first occurrence (earliest rank).
    let mut seen_urls = std::collections::HashSet::new();
    let mut deduped: Vec<&RawCitation> = Vec::new();
    for c in citations {
        let host = match normalized_host(&c.url) {
            Some(h) => h,
            None => continue, // domain unknown — dropped entirely
        };
        let canonical = canonical_url(&c.url);
        if !seen_urls.insert(canonical) {
            continue;
        }
        deduped.push(c);
        let _ = host; // host recomputed below per-entry; cheap, keeps this loop simple
    }

    let mut citation_position = None;
    let mut citation_context = None;
    let mut competitor_citations = Vec::new();

    for c in &deduped {
        let host = normalized_host(&c.url).expect("domain-unknown entries already filtered");
        if host_matches_target(&host, &target) {
            if citation_position.is_none() {
                citation_position = Some(c.rank);
                citation_context = c.title.clone().or_else(|| c.snippet.clone());
            }
            // Further target-host entries beyond the first don't move the
            // position and aren't added to competitor_citations either —
            // they're simply additional occurrences of the same target.
            continue;
        }

        let competitor_domain = competitors
            .iter()
            .find(|cd| host_matches_target(&host, cd))
            .cloned()
            .unwrap_or(host);

        competitor_citations.push(CompetitorCitation {
            domain: competitor_domain,
            url: c.url.clone(),
            position: c.rank,
            context: c.title.clone().or_else(|| c.snippet.clone()),
        });
    }

    let domain_mentioned = citation_position.is_some();
    let total_sources_cited = (if domain_mentioned { 1 } else { 0 }) + competitor_citations.len() as u32;

    NormalizedCitations {
        domain_mentioned,
        citation_position,
        citation_context,
        competitor_citations,
        total_sources_cited,
    }
}

/// Strip query/fragment for dedup purposes; scheme+host+path only.
fn canonical_url(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(mut u) => {
            u.set_query(None);
            u.set_fragment(None);
            u.to_string()
        }
        Err(_) => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rc(url: &str, rank: u32) -> RawCitation {
        RawCitation {
            url: url.to_string(),
            title: None,
            snippet: None,
            rank,
        }
    }

    #[test]
    fn subdomain_is_self_mention() {
        let citations = vec![rc("https://foo.example.com/a", 1)];
        let out = normalize(&citations, "example.com", &[]);
        assert!(out.domain_mentioned);
        assert_eq!(out.citation_position, Some(1));
        assert_eq!(out.total_sources_cited, 1);
    }

    #[test]
    fn new_citation_scenario_from_spec() {
        let citations = vec![rc("https://www.acme.com/guide", 2), rc("https://other.com/x", 1)];
        let out = normalize(&citations, "acme.com", &[]);
        assert!(out.domain_mentioned);
        assert_eq!(out.citation_position, Some(2));
        assert_eq!(out.total_sources_cited, 2);
        assert_eq!(out.competitor_citations.len(), 1);
        assert_eq!(out.competitor_citations[0].domain, "other.com");
        assert_eq!(out.competitor_citations[0].position, 1);
    }

    #[test]
    fn duplicate_urls_collapse_to_one_with_earliest_rank() {
        let citations = vec![rc("https://acme.com/a?utm=1", 1), rc("https://acme.com/a?utm=2", 5)];
        let out = normalize(&citations, "acme.com", &[]);
        assert_eq!(out.citation_position, Some(1));
        assert_eq!(out.total_sources_cited, 1);
    }

    #[test]
    fn no_mention_yields_null_position_and_context() {
        let citations = vec![rc("https://other.com/x", 1)];
        let out = normalize(&citations, "acme.com", &[]);
        assert!(!out.domain_mentioned);
        assert_eq!(out.citation_position, None);
        assert_eq!(out.citation_context, None);
    }

    #[test]
    fn blank_host_entries_are_dropped_entirely() {
        let citations = vec![rc("mailto:someone@example.com", 1), rc("https://acme.com/a", 2)];
        let out = normalize(&citations, "acme.com", &[]);
        assert_eq!(out.total_sources_cited, 1);
        assert_eq!(out.citation_position, Some(2));
    }
}
