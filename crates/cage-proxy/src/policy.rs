//! Method/path policy for a designated API host, plus the destination-host
//! blocklist. Both are pure, total functions over static tables compiled
//! once — the same "immutable data + a pure lookup" shape as
//! `cage_core::classify`, generalized from a subcommand table to a
//! host+method+path table.
//!
//! Patterns are ported verbatim from
//! `examples/original_source/dockerfiles/proxy/secret_scanner.py`'s
//! `GITHUB_API_BLOCKED_PATTERNS` / `BLOCKED_DOMAINS`.

use std::sync::OnceLock;

use regex::Regex;

/// Minimum body length, in bytes, before it is worth submitting to the
/// detector at all.
pub const MIN_BODY_SCAN_LEN: usize = 10;

/// URLs at or under this length are not separately scanned.
pub const URL_SCAN_THRESHOLD: usize = 100;

const API_HOSTS: &[&str] = &["api.github.com", "github.com"];

/// `(method, path-pattern)`, tried in order; the first match wins.
/// Patterns are matched the way Python's `re.match` does: anchored at the
/// start of the path, not necessarily the end (only the `PATCH .../[^/]+$`
/// pattern anchors its end explicitly).
const GITHUB_API_BLOCKED_PATTERNS: &[(&str, &str)] = &[
    ("PUT", r"/repos/[^/]+/[^/]+/pulls/\d+/merge"),
    ("DELETE", r"/repos/.*"),
    ("DELETE", r"/orgs/.*"),
    ("DELETE", r"/user/.*"),
    ("GET", r"/repos/[^/]+/[^/]+/actions/secrets.*"),
    ("GET", r"/orgs/[^/]+/actions/secrets.*"),
    ("PATCH", r"/repos/[^/]+/[^/]+$"),
    ("PUT", r"/repos/[^/]+/[^/]+/collaborators.*"),
    ("POST", r"/repos/[^/]+/[^/]+/hooks"),
    ("PATCH", r"/repos/[^/]+/[^/]+/hooks/\d+"),
    ("PUT", r"/repos/[^/]+/[^/]+/branches/[^/]+/protection"),
    ("DELETE", r"/repos/[^/]+/[^/]+/branches/[^/]+/protection"),
];

const BLOCKED_DOMAINS: &[&str] = &[
    "pastebin.com",
    "paste.ee",
    "hastebin.com",
    "dpaste.org",
    "file.io",
    "transfer.sh",
    "0x0.st",
    "ix.io",
    "sprunge.us",
    "termbin.com",
];

fn compiled_patterns() -> &'static [(&'static str, Regex)] {
    static PATTERNS: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        GITHUB_API_BLOCKED_PATTERNS
            .iter()
            .map(|(method, pattern)| {
                let anchored = format!("^{pattern}");
                (*method, Regex::new(&anchored).expect("pattern is a valid static regex"))
            })
            .collect()
    })
}

/// If `host` is one of the configured API hosts and `(method, path)`
/// matches a blocked pattern, return the audit reason string
/// `github_api_blocked:METHOD PATTERN` for the first match.
pub fn check_api_policy(host: &str, method: &str, path: &str) -> Option<String> {
    if !API_HOSTS.contains(&host) {
        return None;
    }

    compiled_patterns().iter().find_map(|(blocked_method, re)| {
        if *blocked_method == method && re.is_match(path) {
            Some(format!("github_api_blocked:{blocked_method} {}", re.as_str().trim_start_matches('^')))
        } else {
            None
        }
    })
}

/// If `host` exactly equals, or is a subdomain of (`.`-prefixed suffix), a
/// blocklisted domain, return `blocked_domain:HOST`.
pub fn check_host_blocklist(host: &str) -> Option<String> {
    BLOCKED_DOMAINS.iter().find_map(|blocked| {
        if host == *blocked || host.ends_with(&format!(".{blocked}")) {
            Some(format!("blocked_domain:{blocked}"))
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_pr_is_blocked_and_precedes_other_patterns() {
        let reason = check_api_policy("api.github.com", "PUT", "/repos/acme/widget/pulls/7/merge");
        assert_eq!(
            reason.unwrap(),
            "github_api_blocked:PUT /repos/[^/]+/[^/]+/pulls/\\d+/merge"
        );
    }

    #[test]
    fn delete_under_repos_is_blocked() {
        assert!(check_api_policy("api.github.com", "DELETE", "/repos/acme/widget").is_some());
    }

    #[test]
    fn patch_repo_settings_requires_exact_two_segments() {
        assert!(check_api_policy("api.github.com", "PATCH", "/repos/acme/widget").is_some());
        assert!(check_api_policy("api.github.com", "PATCH", "/repos/acme/widget/hooks/5").is_some());
        assert!(check_api_policy("api.github.com", "PATCH", "/repos/acme/widget/extra").is_none());
    }

    #[test]
    fn non_api_host_is_never_blocked_by_api_policy() {
        assert_eq!(check_api_policy("example.com", "DELETE", "/repos/acme/widget"), None);
    }

    #[test]
    fn get_on_repo_contents_is_allowed() {
        assert_eq!(check_api_policy("api.github.com", "GET", "/repos/acme/widget"), None);
    }

    #[test]
    fn blocklisted_domain_matches_exactly_and_by_subdomain() {
        assert!(check_host_blocklist("pastebin.com").is_some());
        assert!(check_host_blocklist("raw.pastebin.com").is_some());
        assert_eq!(check_host_blocklist("notpastebin.com"), None);
        assert_eq!(check_host_blocklist("example.com"), None);
    }
}
