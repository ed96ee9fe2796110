//! Core shared functionality for the relays
//!
//! Helpers used by both the image-generation relay and the chat relay.

use chrono::Local;
use std::time::Duration;

/// Wall-clock time of day used in relay responses (`HH:MM:SS`).
#[must_use]
pub fn timestamp() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

/// File-name friendly timestamp (`YYYYMMDD_HHMMSS`).
#[must_use]
pub fn file_timestamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Formats an elapsed duration the way the chat UI displays it, e.g. `1.23s`.
#[must_use]
pub fn format_elapsed(elapsed: Duration) -> String {
    format!("{:.2}s", elapsed.as_secs_f64())
}

/// Returns `true` when the input has nothing but whitespace.
#[must_use]
pub fn is_blank(input: &str) -> bool {
    input.trim().is_empty()
}

/// Truncates to at most `max_chars` characters without splitting a code point.
#[must_use]
pub fn excerpt(
    text: &str,
    max_chars: usize,
) -> String {
    text.chars().take(max_chars).collect()
}

/// Joins a base URL and a path with exactly one slash between them.
#[must_use]
pub fn join_url(
    base: &str,
    path: &str,
) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Builds the shared HTTP client used by a relay.
#[must_use]
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(concat!("ai-relay/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!("Falling back to default HTTP client: {e}");
            reqwest::Client::new()
        })
}
