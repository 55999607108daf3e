//! Error types for the ghost-router crate.

use ghost_provider::{InvalidRequestError, ProviderError};

/// Errors surfaced past the router boundary.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    /// Every probe failed, or every attempted provider errored before
    /// emitting output. Carries a remediation hint for the user.
    #[error("no backend available: {hint}")]
    NoBackendAvailable { hint: String },

    /// A provider failed after partial output was already delivered.
    /// Retrying elsewhere would garble the concatenation, so this is final.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Request rejected before any I/O.
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] InvalidRequestError),
}
