//! Log Redaction Layer
//!
//! Scrubs API keys, bearer tokens, phone numbers and inline image payloads
//! from strings prior to logging.

use regex::Regex;
use std::sync::LazyLock;

static TELEPHONE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?:\+?\d{1,3}[-.\s]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}").unwrap());
static API_KEY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(sk-[a-zA-Z0-9]{32,})|(LLM\|\d+\|[a-zA-Z0-9_\-]+)|(Bearer\s+[a-zA-Z0-9\-\._~+/|]+=*)").unwrap());
static DATA_URL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(data:[a-zA-Z0-9.+/\-]+;base64,)[A-Za-z0-9+/=]+").unwrap());

/// Redacts sensitive patterns in a string.
pub fn redact_sensitive_data(input: &str) -> String {
    // Image payloads first: base64 runs can look like digits to the phone pattern.
    let mut redacted = DATA_URL_RE.replace_all(input, "${1}[REDACTED_IMAGE]").to_string();

    // Redact API keys and bearer tokens
    redacted = API_KEY_RE.replace_all(&redacted, "[REDACTED_TOKEN]").to_string();

    // Redact telephone numbers
    redacted = TELEPHONE_RE.replace_all(&redacted, "[REDACTED_PHONE]").to_string();

    redacted
}
