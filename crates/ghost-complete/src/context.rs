//! Bounded prompt assembly from the cursor position and, optionally, a
//! symbol indexer.
//!
//! The indexer is an external collaborator behind a narrow "top-K relevant
//! symbols" contract; its internals (search algorithm, embeddings, AST) are
//! none of our business. A slow or failing indexer degrades the completion
//! to context-free, it never fails it.

use crate::types::AutocompleteRequest;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Marks the cursor inside the assembled prompt skeleton.
pub const CURSOR_MARKER: &str = "<|cursor|>";

/// How much of the prefix tail is handed to the indexer as cursor context.
const CURSOR_CONTEXT_LEN: usize = 200;

const DEFAULT_MAX_SNIPPET_LEN: usize = 240;

/// A ranked code snippet from the indexer, opaque to everything downstream.
#[derive(Debug, Clone)]
pub struct ContextSymbol {
    pub name: String,
    pub kind: String,
    pub snippet: String,
    pub score: f32,
}

#[derive(Debug, thiserror::Error)]
#[error("indexer error: {0}")]
pub struct IndexerError(pub String);

/// External symbol search collaborator.
#[async_trait]
pub trait SymbolIndexer: Send + Sync {
    /// Top-K symbols relevant to the cursor, most relevant first.
    async fn search(
        &self,
        file_path: &str,
        cursor_context: &str,
        k: usize,
    ) -> Result<Vec<ContextSymbol>, IndexerError>;
}

/// The assembled prompt plus whether indexer context made it in.
#[derive(Debug, Clone)]
pub struct AssembledPrompt {
    pub prompt: String,
    pub context_used: bool,
}

/// Builds the bounded prompt for one completion request.
pub struct ContextAssembler {
    max_symbols: usize,
    max_snippet_len: usize,
}

impl ContextAssembler {
    pub fn new(max_symbols: usize) -> Self {
        Self {
            max_symbols,
            max_snippet_len: DEFAULT_MAX_SNIPPET_LEN,
        }
    }

    pub fn with_max_snippet_len(mut self, len: usize) -> Self {
        self.max_snippet_len = len;
        self
    }

    /// Assemble the prompt, spending at most `budget` on the indexer.
    ///
    /// Without an indexer the skeleton is prefix + cursor marker + suffix
    /// verbatim. With one, at most `max_symbols` truncated snippets are
    /// stacked as a comment block above the prefix.
    pub async fn assemble(
        &self,
        request: &AutocompleteRequest,
        indexer: Option<&dyn SymbolIndexer>,
        budget: Duration,
    ) -> AssembledPrompt {
        let skeleton = format!("{}{}{}", request.prefix, CURSOR_MARKER, request.suffix);

        let Some(indexer) = indexer else {
            return AssembledPrompt {
                prompt: skeleton,
                context_used: false,
            };
        };
        if self.max_symbols == 0 || budget.is_zero() {
            return AssembledPrompt {
                prompt: skeleton,
                context_used: false,
            };
        }

        let cursor_context = tail(&request.prefix, CURSOR_CONTEXT_LEN);
        let search = indexer.search(&request.file_path, cursor_context, self.max_symbols);
        let symbols = match tokio::time::timeout(budget, search).await {
            Ok(Ok(symbols)) if !symbols.is_empty() => symbols,
            Ok(Ok(_)) => {
                return AssembledPrompt {
                    prompt: skeleton,
                    context_used: false,
                };
            }
            Ok(Err(err)) => {
                debug!(%err, "indexer failed, completing without context");
                return AssembledPrompt {
                    prompt: skeleton,
                    context_used: false,
                };
            }
            Err(_) => {
                debug!("indexer exceeded budget, completing without context");
                return AssembledPrompt {
                    prompt: skeleton,
                    context_used: false,
                };
            }
        };

        let mut block = String::new();
        for symbol in symbols.iter().take(self.max_symbols) {
            let snippet = truncate(&symbol.snippet, self.max_snippet_len);
            block.push_str(&format!("// {} {}\n{}\n", symbol.kind, symbol.name, snippet));
        }

        AssembledPrompt {
            prompt: format!("{block}\n{skeleton}"),
            context_used: true,
        }
    }
}

/// Last `max_len` bytes of `s`, snapped to a char boundary.
fn tail(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        return s;
    }
    let mut start = s.len() - max_len;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    &s[start..]
}

/// First `max_len` bytes of `s`, snapped to a char boundary.
fn truncate(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        return s;
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
