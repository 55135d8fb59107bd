//! Shared helpers for the hosted-backend HTTP boundary.

use lectio_core::auth::messages;
use lectio_core::error::LectioError;

/// Maps a transport-level failure to one of the fixed user-facing
/// messages. Connection and timeout failures get their dedicated
/// messages; everything else falls back to the operation's own message.
pub(crate) fn provider_error(err: reqwest::Error, fallback: &'static str) -> LectioError {
    let message = if err.is_connect() {
        messages::NETWORK
    } else if err.is_timeout() {
        messages::TIMEOUT
    } else {
        fallback
    };
    tracing::warn!("provider request failed: {err}");
    LectioError::provider(message)
}

/// Normalizes a configured base URL (no trailing slash).
pub(crate) fn normalize_base_url(url: impl Into<String>) -> String {
    let url = url.into();
    url.trim_end_matches('/').to_string()
}
