//! ghost-complete: bounded context assembly and the latency-budgeted
//! autocomplete engine.

pub mod config;
pub mod context;
pub mod engine;
mod error;
pub mod types;

pub use config::{Config, ConfigStore};
pub use context::{AssembledPrompt, ContextAssembler, ContextSymbol, IndexerError, SymbolIndexer};
pub use engine::{AutocompleteEngine, EngineConfig};
pub use error::EngineError;
pub use types::{AutocompleteRequest, CompletionResult, CompletionState};
