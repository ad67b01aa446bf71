// ── chatsql Engine: HTTP client factory & response classification ─────────
//
// Shared by the text-generation provider.
//
//   • One reqwest::Client per provider, with a connect timeout and a read
//     timeout. The read timeout restarts on every chunk received, so it bounds
//     a stalled response but never a long answer that keeps streaming
//     (the engine itself enforces no timeout)
//   • Non-success statuses mapped onto ProviderError
//   • `Retry-After` parsed for the rate-limit error, never acted on: failed
//     requests are not retried

use crate::atoms::error::EngineResult;
use crate::atoms::traits::ProviderError;
use reqwest::Client;
use std::time::Duration;

/// Build the HTTP client used for provider calls. `read_timeout_secs` is the
/// longest wait for the response to start or for the next chunk of it.
pub fn build_client(connect_timeout_secs: u64, read_timeout_secs: u64) -> EngineResult<Client> {
    Ok(Client::builder()
        .connect_timeout(Duration::from_secs(connect_timeout_secs))
        .read_timeout(Duration::from_secs(read_timeout_secs))
        .build()?)
}

/// Parse Retry-After header value (integer seconds only).
pub fn parse_retry_after(header_value: &str) -> Option<u64> {
    header_value.trim().parse::<u64>().ok()
}

/// Map a non-success HTTP status and its body onto a provider error.
pub fn classify_status(status: u16, body: &str, retry_after_secs: Option<u64>) -> ProviderError {
    let message = format!("API error {}: {}", status, truncate_utf8(body, 200));
    match status {
        401 | 403 => ProviderError::Auth(message),
        429 => ProviderError::RateLimited { message, retry_after_secs },
        _ => ProviderError::Api { status, message },
    }
}

/// Truncate to at most `max_bytes` without splitting a UTF-8 character.
pub fn truncate_utf8(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Collapse whitespace and truncate, for one-line log output of SQL / prompts.
pub fn log_preview(text: &str, max_bytes: usize) -> String {
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalized.len() > max_bytes {
        format!("{}...", truncate_utf8(&normalized, max_bytes))
    } else {
        normalized
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────
