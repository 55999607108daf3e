//! Error types for the ghost-provider crate.

use std::fmt;

/// Failure category for a provider attempt.
///
/// The router uses the category only for logging; what matters for fallback
/// is whether the failure happened before or after the first chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// Missing or rejected credentials.
    Auth,
    /// Provider throttled the request.
    RateLimit,
    /// Provider unreachable or returned a server-side failure.
    Unavailable,
    /// Provider answered, but the body could not be interpreted.
    MalformedResponse,
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Auth => "authentication failed",
            Self::RateLimit => "rate limited",
            Self::Unavailable => "unavailable",
            Self::MalformedResponse => "malformed response",
        };
        f.write_str(s)
    }
}

/// Error from a single provider attempt.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{provider}: {kind}: {message}")]
pub struct ProviderError {
    /// Failure category.
    pub kind: ProviderErrorKind,
    /// Name of the provider that failed.
    pub provider: String,
    /// HTTP status, when the provider answered at all.
    pub status: Option<u16>,
    /// Human-readable detail.
    pub message: String,
}

impl ProviderError {
    pub fn new(
        kind: ProviderErrorKind,
        provider: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            provider: provider.into(),
            status: None,
            message: message.into(),
        }
    }

    /// Classify a non-success HTTP response.
    pub fn from_status(provider: &str, status: reqwest::StatusCode, body: &str) -> Self {
        let kind = match status.as_u16() {
            401 | 403 => ProviderErrorKind::Auth,
            429 => ProviderErrorKind::RateLimit,
            _ => ProviderErrorKind::Unavailable,
        };
        Self {
            kind,
            provider: provider.to_string(),
            status: Some(status.as_u16()),
            message: format!("HTTP {}: {}", status.as_u16(), body.trim()),
        }
    }

    /// Classify a transport-level failure (connect, timeout, mid-read).
    pub fn transport(provider: &str, err: &reqwest::Error) -> Self {
        Self {
            kind: ProviderErrorKind::Unavailable,
            provider: provider.to_string(),
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }

    pub fn malformed(provider: &str, message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::MalformedResponse, provider, message)
    }
}
