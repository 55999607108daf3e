//! Adapter trait definition.

use crate::error::ProviderError;
use crate::types::{GenerationRequest, TokenStream};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Trait for LLM provider adapters.
///
/// An adapter translates one backend's wire protocol (local daemon NDJSON,
/// Gemini JSON-lines, OpenAI SSE, ...) into the canonical [`TokenStream`].
/// Priority and availability drive the router's per-call backend selection.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Provider name (e.g., "ollama", "gemini").
    fn name(&self) -> &str;

    /// Fallback order; lower numbers are tried first. The local daemon sits
    /// at 0 so that, when it is up, no network round-trip is paid.
    fn priority(&self) -> u8;

    /// Cheap liveness probe. Bounded internally; any failure means
    /// "unavailable", never an error. Not a guarantee that `stream` will
    /// succeed.
    async fn is_available(&self) -> bool;

    /// Open one connection and stream the generated text.
    ///
    /// A non-success response fails before any chunk is yielded. Cancelling
    /// `cancel` drops the connection promptly and stops all buffering.
    async fn stream(
        &self,
        request: &GenerationRequest,
        cancel: CancellationToken,
    ) -> Result<TokenStream, ProviderError>;
}

// Compile-time check: ProviderAdapter must be object-safe
const _: () = {
    fn _assert_object_safe(_: &dyn ProviderAdapter) {}
};
