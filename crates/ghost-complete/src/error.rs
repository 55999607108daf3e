//! Error types for the ghost-complete crate.

/// Genuine misconfiguration, raised synchronously before any I/O.
///
/// Routine "no completion available" outcomes are never errors; they are
/// encoded in the result so editor integrations do not special-case
/// exceptions on every keystroke.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}
