//! Adapter implementations, one per wire protocol.

mod gemini;
mod ollama;
mod openai;

pub use gemini::GeminiAdapter;
pub use ollama::{OllamaAdapter, DEFAULT_LOCAL_ENDPOINT};
pub use openai::OpenAiAdapter;

/// What a single parsed wire fragment contributes to the canonical stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LineEvent {
    /// A fragment of generated text.
    Text(String),
    /// The provider signalled its stop condition.
    Done,
}
