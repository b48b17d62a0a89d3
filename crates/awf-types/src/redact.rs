//! Secrets redaction for anything the orchestrator or CLI prints.
//!
//! Every log line and every user-facing error message passes through
//! [`redact`] before it reaches a terminal. Redaction runs against the
//! whole message text, not just fields known in advance to be sensitive,
//! because the agent's own stdout/stderr (streamed verbatim during
//! `RUNNING`) can contain a token the orchestrator never saw structured.

use regex::Regex;
use std::sync::OnceLock;

struct Patterns {
    auth_header: Regex,
    env_assignment: Regex,
    github_token: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        auth_header: Regex::new(r"(?i)Authorization:\s*\S+").unwrap(),
        env_assignment: Regex::new(r"(?i)\b(\w*(?:TOKEN|SECRET|KEY|PASSWORD|AUTH)\w*)=\S+")
            .unwrap(),
        github_token: Regex::new(r"gh[pousr]_[A-Za-z0-9]{36,255}").unwrap(),
    })
}

/// Replace any recognized secret in `message` with `<redacted>`.
pub fn redact(message: &str) -> String {
    let p = patterns();
    let step1 = p.auth_header.replace_all(message, "Authorization: <redacted>");
    let step2 = p
        .env_assignment
        .replace_all(&step1, "$1=<redacted>");
    p.github_token.replace_all(&step2, "<redacted>").into_owned()
}
