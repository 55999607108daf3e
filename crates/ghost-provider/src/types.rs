//! Common types used by the adapter trait and implementations.

use crate::error::ProviderError;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single generation request.
///
/// Immutable once submitted: a retry against the next provider clones a
/// fresh request rather than mutating this one in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// The full prompt text.
    pub prompt: String,
    /// Model identifier; `None` uses the adapter's default.
    pub model: Option<String>,
    /// Sampling temperature, within [0, 2].
    pub temperature: Option<f32>,
    /// Upper bound on generated tokens; must be greater than zero.
    pub max_tokens: Option<usize>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: None,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Reject malformed requests before any I/O happens.
    pub fn validate(&self) -> Result<(), InvalidRequestError> {
        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) || t.is_nan() {
                return Err(InvalidRequestError::Temperature(t));
            }
        }
        if self.max_tokens == Some(0) {
            return Err(InvalidRequestError::MaxTokens);
        }
        Ok(())
    }
}

/// A malformed request, detected synchronously before any network call.
#[derive(Debug, Clone, thiserror::Error)]
pub enum InvalidRequestError {
    #[error("temperature {0} outside [0, 2]")]
    Temperature(f32),
    #[error("max_tokens must be greater than zero")]
    MaxTokens,
}

/// One non-empty fragment of generated text.
///
/// Concatenating every chunk of a completed stream reconstructs the
/// provider's output exactly, in order, with no duplication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenChunk(String);

impl TokenChunk {
    /// Returns `None` for empty input; the non-empty invariant holds by
    /// construction.
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        if text.is_empty() {
            None
        } else {
            Some(Self(text))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for TokenChunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The canonical lazy token sequence every adapter produces.
///
/// End of stream is the done signal; a terminated stream yields nothing
/// further.
pub type TokenStream = BoxStream<'static, Result<TokenChunk, ProviderError>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_chunk_rejects_empty() {
        assert!(TokenChunk::new("").is_none());
        assert_eq!(TokenChunk::new("fn ").unwrap().as_str(), "fn ");
    }

    #[test]
    fn test_validate_temperature_bounds() {
        assert!(GenerationRequest::new("x").with_temperature(0.0).validate().is_ok());
        assert!(GenerationRequest::new("x").with_temperature(2.0).validate().is_ok());
        assert!(GenerationRequest::new("x").with_temperature(2.1).validate().is_err());
        assert!(GenerationRequest::new("x").with_temperature(-0.1).validate().is_err());
        assert!(GenerationRequest::new("x").with_temperature(f32::NAN).validate().is_err());
    }

    #[test]
    fn test_validate_max_tokens() {
        assert!(GenerationRequest::new("x").with_max_tokens(0).validate().is_err());
        assert!(GenerationRequest::new("x").with_max_tokens(1).validate().is_ok());
    }

    #[test]
    fn test_empty_prompt_is_allowed() {
        // An empty buffer before the cursor is a legal completion request.
        assert!(GenerationRequest::new("").validate().is_ok());
    }
}
