//! Request and result types for the autocomplete engine.

use serde::{Deserialize, Serialize};

/// A completion request at a cursor position.
///
/// `prefix`/`suffix` are the buffer text immediately before/after the
/// cursor; both may be empty. Treated as a value: submit once, discard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutocompleteRequest {
    pub prefix: String,
    pub suffix: String,
    pub file_path: String,
    pub language: Option<String>,
    pub max_tokens: Option<usize>,
    pub temperature: Option<f32>,
}

impl AutocompleteRequest {
    pub fn new(
        prefix: impl Into<String>,
        suffix: impl Into<String>,
        file_path: impl Into<String>,
    ) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
            file_path: file_path.into(),
            language: None,
            max_tokens: None,
            temperature: None,
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

/// Terminal state of one engine call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionState {
    /// The provider's stream ended naturally before the deadline.
    Completed,
    /// The budget expired; whatever text had accumulated was returned.
    /// A degraded success, not an error.
    TimedOut,
    /// No backend produced usable output, or a provider died after partial
    /// output.
    Failed,
}

/// Result of one engine call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResult {
    /// Zero or one suggestion; empty means "no usable output", a normal
    /// non-exceptional outcome.
    pub completions: Vec<String>,
    /// End-to-end latency from call entry to return, for every terminal
    /// state.
    pub latency_ms: u64,
    /// Whether indexer symbols made it into the prompt.
    pub context_used: bool,
    pub state: CompletionState,
    /// The underlying failure, attached for logging only.
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_serializes_state_snake_case() {
        let result = CompletionResult {
            completions: vec![],
            latency_ms: 80,
            context_used: false,
            state: CompletionState::TimedOut,
            error: None,
        };
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"timed_out\""));
    }
}
