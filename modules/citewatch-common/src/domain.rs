use regex::Regex;
use std::sync::OnceLock;

/// Lowercase a host and strip a leading `www.`. Used for both the project's
/// `primary_domain` at write time and for every citation URL's host at
/// normalization time, so the two sides of a domain-match compare equal.
pub fn normalize_domain(raw: &str) -> String {
    raw.trim().to_lowercase().trim_start_matches("www.").to_string()
}

/// `host == target || host endsWith "." + target`, case-insensitive, both
/// sides already normalized. Shared by the self-domain match and the
/// competitor-domain match — spec calls for the same rule on both.
pub fn host_matches_target(host: &str, target: &str) -> bool {
    if target.is_empty() {
        return false;
    }
    host == target || host.ends_with(&format!(".{target}"))
}

fn domain_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[a-z0-9][a-z0-9-]{1,61}[a-z0-9]\.[a-z]{2,}$").expect("valid regex")
    })
}

/// Validates a competitor/primary domain against the exact-domain pattern
/// control operations enforce (`CompetitorsAddRemove`).
pub fn is_valid_domain(domain: &str) -> bool {
    domain_regex().is_match(domain)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_www_and_case() {
        assert_eq!(normalize_domain("WWW.Acme.com"), "acme.com");
        assert_eq!(normalize_domain("acme.com"), "acme.com");
    }

    #[test]
    fn subdomain_matches_target() {
        assert!(host_matches_target("foo.example.com", "example.com"));
        assert!(host_matches_target("example.com", "example.com"));
        assert!(!host_matches_target("notexample.com", "example.com"));
        assert!(!host_matches_target("example.com.evil.com", "example.com"));
    }

    #[test]
    fn domain_regex_rejects_malformed() {
        assert!(is_valid_domain("acme.com"));
        assert!(is_valid_domain("sub-brand.co"));
        assert!(!is_valid_domain("not a domain"));
        assert!(!is_valid_domain("-leadinghyphen.com"));
        assert!(!is_valid_domain("a.c"));
    }
}
