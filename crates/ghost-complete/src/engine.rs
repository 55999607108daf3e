//! The latency-budgeted autocomplete engine.
//!
//! One wall-clock deadline per call, started at call entry. Context assembly
//! spends at most the budget minus a generation floor; generation consumes
//! the router's stream until it ends, the deadline fires, or a provider dies
//! after partial output. Every outcome is encoded in the result; the only
//! `Err` path is a malformed request, raised before any I/O.

use crate::context::{ContextAssembler, SymbolIndexer};
use crate::error::EngineError;
use crate::types::{AutocompleteRequest, CompletionResult, CompletionState};
use futures::StreamExt;
use ghost_provider::GenerationRequest;
use ghost_router::GenerationRouter;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Generation always gets at least this much of the budget, even when
/// context assembly ate the rest.
const MIN_GENERATION_BUDGET: Duration = Duration::from_millis(20);

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Small, fast model suited to inline completion.
    pub fast_model: String,
    /// Hard wall-clock budget per call.
    pub timeout_ms: u64,
    /// Whether to consult the symbol indexer at all.
    pub use_indexer: bool,
    /// Upper bound on context symbols spliced into the prompt.
    pub max_context_symbols: usize,
    /// Default token cap; a handful of tokens, not a full response.
    pub max_tokens: usize,
    /// Default sampling temperature.
    pub temperature: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fast_model: "qwen2.5-coder:1.5b".to_string(),
            timeout_ms: 80,
            use_indexer: true,
            max_context_symbols: 5,
            max_tokens: 48,
            temperature: 0.2,
        }
    }
}

impl EngineConfig {
    /// Misconfiguration is fatal and synchronous, never silently defaulted.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.timeout_ms == 0 {
            return Err(EngineError::InvalidConfig(
                "timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.fast_model.is_empty() {
            return Err(EngineError::InvalidConfig(
                "fast_model must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Orchestrates context assembly and routed generation under one budget.
///
/// Concurrent calls are independent: each owns its timer, cancellation
/// token, and accumulation buffer; the router and config are shared
/// read-only.
pub struct AutocompleteEngine {
    config: EngineConfig,
    router: Arc<GenerationRouter>,
    indexer: Option<Arc<dyn SymbolIndexer>>,
    assembler: ContextAssembler,
}

impl AutocompleteEngine {
    pub fn new(config: EngineConfig, router: Arc<GenerationRouter>) -> Result<Self, EngineError> {
        config.validate()?;
        let assembler = ContextAssembler::new(config.max_context_symbols);
        Ok(Self {
            config,
            router,
            indexer: None,
            assembler,
        })
    }

    pub fn with_indexer(mut self, indexer: Arc<dyn SymbolIndexer>) -> Self {
        self.indexer = Some(indexer);
        self
    }

    /// Produce a best-effort completion within the budget.
    ///
    /// Timeouts and backend failures are result states, not errors; an
    /// editor integration treats empty `completions` as "show nothing".
    pub async fn get_completions(
        &self,
        request: &AutocompleteRequest,
    ) -> Result<CompletionResult, EngineError> {
        let start = Instant::now();
        validate_request(request)?;

        let budget = Duration::from_millis(self.config.timeout_ms);
        let deadline = start + budget;

        // Context assembly is bounded so generation keeps its floor.
        let indexer = if self.config.use_indexer {
            self.indexer.as_deref()
        } else {
            None
        };
        let assembly_budget = budget.saturating_sub(MIN_GENERATION_BUDGET);
        let assembled = self
            .assembler
            .assemble(request, indexer, assembly_budget)
            .await;
        let context_used = assembled.context_used;

        // Generation gets whatever budget remains.
        let gen_request = GenerationRequest::new(assembled.prompt)
            .with_model(self.config.fast_model.clone())
            .with_temperature(request.temperature.unwrap_or(self.config.temperature))
            .with_max_tokens(request.max_tokens.unwrap_or(self.config.max_tokens));

        let cancel = CancellationToken::new();
        let now = Instant::now();
        let remaining = if deadline > now {
            deadline - now
        } else {
            Duration::ZERO
        };
        let gen_deadline = now + remaining.max(MIN_GENERATION_BUDGET);

        let mut accumulated = String::new();
        let routed = timeout_at(gen_deadline, self.router.generate(&gen_request, cancel.clone()));
        let (state, error) = match routed.await {
            Err(_) => {
                cancel.cancel();
                (CompletionState::TimedOut, None)
            }
            Ok(Err(err)) => {
                debug!(%err, "no completion available");
                (CompletionState::Failed, Some(err.to_string()))
            }
            Ok(Ok(mut stream)) => loop {
                match timeout_at(gen_deadline, stream.next()).await {
                    Err(_) => {
                        // Stop consuming and tear down the connection; keep
                        // whatever text accumulated before the deadline.
                        cancel.cancel();
                        break (CompletionState::TimedOut, None);
                    }
                    Ok(None) => break (CompletionState::Completed, None),
                    Ok(Some(Ok(chunk))) => accumulated.push_str(chunk.as_str()),
                    Ok(Some(Err(err))) => {
                        debug!(%err, "provider failed after partial output");
                        cancel.cancel();
                        // A partial tail of unknown consistency is worse
                        // than no suggestion.
                        accumulated.clear();
                        break (CompletionState::Failed, Some(err.to_string()));
                    }
                }
            },
        };

        let completions = if accumulated.is_empty() {
            Vec::new()
        } else {
            vec![accumulated]
        };

        Ok(CompletionResult {
            completions,
            latency_ms: start.elapsed().as_millis() as u64,
            context_used,
            state,
            error,
        })
    }
}

fn validate_request(request: &AutocompleteRequest) -> Result<(), EngineError> {
    if let Some(t) = request.temperature {
        if !(0.0..=2.0).contains(&t) || t.is_nan() {
            return Err(EngineError::InvalidRequest(format!(
                "temperature {t} outside [0, 2]"
            )));
        }
    }
    if request.max_tokens == Some(0) {
        return Err(EngineError::InvalidRequest(
            "max_tokens must be greater than zero".to_string(),
        ));
    }
    Ok(())
}
