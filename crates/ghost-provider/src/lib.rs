//! ghost-provider: canonical token streaming over heterogeneous LLM backends.
//!
//! Each adapter owns exactly one provider's wire protocol (local daemon
//! NDJSON, Gemini JSON-lines, OpenAI SSE) and normalizes it into a single
//! lazy stream of [`TokenChunk`]s. The router and engine layers never see a
//! provider-specific response shape.

mod error;
pub mod framing;
pub mod providers;
pub mod traits;
pub mod types;

pub use error::{ProviderError, ProviderErrorKind};
pub use providers::{GeminiAdapter, OllamaAdapter, OpenAiAdapter, DEFAULT_LOCAL_ENDPOINT};
pub use traits::ProviderAdapter;
pub use types::{GenerationRequest, InvalidRequestError, TokenChunk, TokenStream};
