//! `compilePattern`/`covers` — wildcard-to-regex compilation.
//!
//! Adopts the spec's suggested convention: `*` inside a label becomes
//! `[^.]*`, and a leading `*.` token becomes `(?:[^.]+\.)+` so it matches
//! any subdomain depth of one or more — the apex itself is left unmatched
//! unless also listed explicitly, per spec §8.

use regex::{escape, Regex, RegexBuilder};

/// Compile a wildcard body (already lowercased, `*` guaranteed present)
/// into an anchored, case-insensitive regex over a domain — never a URL.
pub fn compile_pattern(wildcard_body: &str) -> Regex {
    let labels: Vec<&str> = wildcard_body.split('.').collect();

    let (prefix, rest) = if labels.first() == Some(&"*") {
        ("(?:[^.]+\\.)+", &labels[1..])
    } else {
        ("", &labels[..])
    };

    let label_patterns: Vec<String> = rest
        .iter()
        .map(|label| {
            label
                .chars()
                .map(|c| if c == '*' { "[^.]*".to_string() } else { escape(&c.to_string()) })
                .collect::<String>()
        })
        .collect();

    let body_pattern = label_patterns.join("\\.");
    let full = format!("^{prefix}{body_pattern}$");

    RegexBuilder::new(&full)
        .case_insensitive(true)
        .build()
        .expect("wildcard compilation always produces a valid regex")
}

/// `true` iff `plain` (a lowercased hostname) matches the compiled
/// `wildcard_body` pattern.
pub fn covers(wildcard_body: &str, plain: &str) -> bool {
    compile_pattern(wildcard_body).is_match(plain)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_star_dot_matches_subdomains_not_apex() {
        assert!(covers("*.example.com", "foo.example.com"));
        assert!(covers("*.example.com", "a.b.example.com"));
        assert!(!covers("*.example.com", "example.com"));
    }

    #[test]
    fn star_within_label_matches_single_label() {
        assert!(covers("api-*.example.com", "api-v2.example.com"));
        assert!(!covers("api-*.example.com", "api-v2.sub.example.com"));
    }

    #[test]
    fn is_case_insensitive() {
        assert!(covers("*.example.com", "FOO.EXAMPLE.COM"));
    }

    #[test]
    fn does_not_cross_label_boundaries() {
        // `*` inside a label must not absorb a `.`.
        assert!(!covers("foo*.com", "foo.bar.com"));
    }
}
