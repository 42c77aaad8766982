//! GitHub API error types.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::platform::PlatformError;

/// Errors that can occur when interacting with the GitHub API.
#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("GitHub API error: {0}")]
    Api(#[from] octocrab::Error),

    #[error("Rate limit exceeded. Resets at {reset_at}")]
    RateLimited { reset_at: DateTime<Utc> },

    #[error("Authentication required")]
    AuthRequired,

    #[error("Invalid API endpoint '{url}': {message}")]
    InvalidEndpoint { url: String, message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

// Re-export the shared short_error_message function from platform module
pub use crate::platform::short_error_message;

/// Longest `retry-after` honoured; anything beyond is clamped.
const MAX_WAIT_SECS: i64 = 3_600;

/// Rate-limit headers GitHub attaches to its answers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimitHeaders {
    /// `retry-after`: seconds to wait (secondary rate limits).
    pub retry_after: Option<u64>,
    /// `x-ratelimit-remaining`: requests left in the current window.
    pub remaining: Option<u64>,
    /// `x-ratelimit-reset`: when the window resets, in epoch seconds.
    pub reset: Option<i64>,
}

impl RateLimitHeaders {
    /// Parse the raw header values; unparsable values count as absent.
    pub fn parse(retry_after: Option<&str>, remaining: Option<&str>, reset: Option<&str>) -> Self {
        Self {
            retry_after: retry_after.and_then(|v| v.trim().parse().ok()),
            remaining: remaining.and_then(|v| v.trim().parse().ok()),
            reset: reset.and_then(|v| v.trim().parse().ok()),
        }
    }

    /// The primary quota is used up.
    pub fn exhausted(&self) -> bool {
        self.remaining == Some(0)
    }

    /// When requests may resume. `retry-after` wins over the window reset;
    /// without either the caller's backoff decides.
    pub fn reset_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        if let Some(secs) = self.retry_after {
            let secs = i64::try_from(secs).unwrap_or(MAX_WAIT_SECS).min(MAX_WAIT_SECS);
            return now + Duration::seconds(secs);
        }
        self.reset
            .and_then(|epoch| DateTime::from_timestamp(epoch, 0))
            .filter(|reset| *reset > now)
            .unwrap_or(now)
    }
}

/// Map an HTTP status and GitHub's error message to a platform error.
///
/// GitHub answers both primary and secondary rate limits with 403 or 429;
/// a 403 is only treated as a rate limit when the quota is exhausted or the
/// message says so, since the same status also means "token lacks the
/// required scope".
pub fn classify_response(
    status: u16,
    message: &str,
    limits: &RateLimitHeaders,
    resource: &str,
) -> PlatformError {
    let rate_limited = || PlatformError::RateLimited {
        reset_at: limits.reset_at(Utc::now()),
    };
    match status {
        401 => PlatformError::AuthRequired,
        404 => PlatformError::not_found(resource),
        429 => rate_limited(),
        403 if limits.exhausted() || message.to_ascii_lowercase().contains("rate limit") => {
            rate_limited()
        }
        _ => PlatformError::api_status(status, format!("{resource}: {message}")),
    }
}

/// [`classify_response`] for errors that arrive without headers.
pub fn classify_status(status: u16, message: &str, resource: &str) -> PlatformError {
    classify_response(status, message, &RateLimitHeaders::default(), resource)
}

/// Convert an octocrab error raised while touching `resource`.
pub fn from_octocrab(err: octocrab::Error, resource: &str) -> PlatformError {
    match err {
        octocrab::Error::GitHub { source, .. } => {
            classify_status(source.status_code.as_u16(), &source.message, resource)
        }
        other => PlatformError::network(format!("{resource}: {}", short_error_message(&other))),
    }
}

impl From<GitHubError> for PlatformError {
    fn from(err: GitHubError) -> Self {
        match err {
            GitHubError::RateLimited { reset_at } => PlatformError::RateLimited { reset_at },
            GitHubError::AuthRequired => PlatformError::AuthRequired,
            GitHubError::Api(e) => from_octocrab(e, "request"),
            GitHubError::InvalidEndpoint { url, message } => {
                PlatformError::internal(format!("invalid endpoint {url}: {message}"))
            }
            GitHubError::Internal(msg) => PlatformError::internal(msg),
        }
    }
}
