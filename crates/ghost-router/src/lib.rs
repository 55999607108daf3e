//! ghost-router: availability-ordered backend selection with sequential
//! fallback.
//!
//! The router owns no timeout policy of its own: callers bound the call and
//! signal cancellation, so the same router serves both latency-sensitive
//! autocomplete and unbounded one-shot generation.

mod error;
mod router;

pub use error::RouterError;
pub use router::GenerationRouter;
