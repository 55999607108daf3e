//! Local inference daemon adapter (Ollama generate API).
//!
//! The daemon streams NDJSON lines of the form
//! `{"response": "...", "done": false}`; the final line sets `done: true`
//! and carries timing stats instead of text.

use crate::error::ProviderError;
use crate::framing::LineFramer;
use crate::providers::LineEvent;
use crate::traits::ProviderAdapter;
use crate::types::{GenerationRequest, TokenChunk, TokenStream};
use async_stream::try_stream;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Well-known local daemon address.
pub const DEFAULT_LOCAL_ENDPOINT: &str = "http://localhost:11434";

const NAME: &str = "ollama";
const DEFAULT_MODEL: &str = "qwen2.5-coder:1.5b";
const PROBE_TIMEOUT: Duration = Duration::from_millis(300);

/// Adapter for a local Ollama-compatible daemon.
pub struct OllamaAdapter {
    client: Client,
    endpoint: String,
    default_model: String,
    priority: u8,
}

impl OllamaAdapter {
    /// Create an adapter against the given daemon endpoint.
    ///
    /// Local inference pays no network latency or per-token cost and keeps
    /// the buffer on the machine, so it defaults to priority 0.
    pub fn new(endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        Self {
            client: Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            priority: 0,
        }
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    fn build_request_body(&self, request: &GenerationRequest) -> Value {
        let mut options = json!({});
        if let Some(t) = request.temperature {
            options["temperature"] = json!(t);
        }
        if let Some(n) = request.max_tokens {
            options["num_predict"] = json!(n);
        }

        json!({
            "model": request.model.clone().unwrap_or_else(|| self.default_model.clone()),
            "prompt": request.prompt,
            "stream": true,
            "options": options,
        })
    }

    fn parse_line(line: &str) -> Vec<LineEvent> {
        let parsed: GenerateLine = match serde_json::from_str(line) {
            Ok(p) => p,
            // Unparseable fragments are protocol noise, never emitted text.
            Err(_) => return vec![],
        };

        let mut events = Vec::new();
        if !parsed.response.is_empty() {
            events.push(LineEvent::Text(parsed.response));
        }
        if parsed.done {
            events.push(LineEvent::Done);
        }
        events
    }
}

#[async_trait]
impl ProviderAdapter for OllamaAdapter {
    fn name(&self) -> &str {
        NAME
    }

    fn priority(&self) -> u8 {
        self.priority
    }

    async fn is_available(&self) -> bool {
        // A 2xx from the daemon root within the bound means alive;
        // refused connections and timeouts are "unavailable", not errors.
        let probe = self.client.get(&self.endpoint).send();
        match tokio::time::timeout(PROBE_TIMEOUT, probe).await {
            Ok(Ok(response)) => response.status().is_success(),
            Ok(Err(err)) => {
                tracing::debug!(%err, "daemon probe failed");
                false
            }
            Err(_) => {
                tracing::debug!("daemon probe timed out");
                false
            }
        }
    }

    async fn stream(
        &self,
        request: &GenerationRequest,
        cancel: CancellationToken,
    ) -> Result<TokenStream, ProviderError> {
        let body = self.build_request_body(request);
        let url = format!("{}/api/generate", self.endpoint);

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::transport(NAME, &e))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(NAME, status, &text));
        }

        let watch = cancel.clone();
        let stream = try_stream! {
            let mut framer = LineFramer::new();
            // take_until holds a Notified future, so the combined stream
            // must be pinned before it can be polled.
            let mut bytes =
                Box::pin(response.bytes_stream().take_until(cancel.cancelled_owned()));
            let mut done = false;
            let mut yielded = false;
            let mut saw_bytes = false;

            'read: while let Some(read) = bytes.next().await {
                let read = read.map_err(|e| ProviderError::transport(NAME, &e))?;
                saw_bytes = saw_bytes || !read.is_empty();
                for line in framer.push(&read) {
                    for event in Self::parse_line(&line) {
                        match event {
                            LineEvent::Text(text) => {
                                if let Some(chunk) = TokenChunk::new(text) {
                                    yield chunk;
                                    yielded = true;
                                }
                            }
                            LineEvent::Done => done = true,
                        }
                    }
                    if done {
                        break 'read;
                    }
                }
            }

            // Cancellation stops all buffering; otherwise give the
            // unterminated remainder one last parse.
            if !done && !watch.is_cancelled() {
                if let Some(rest) = framer.finish() {
                    for event in Self::parse_line(&rest) {
                        if let LineEvent::Text(text) = event {
                            if let Some(chunk) = TokenChunk::new(text) {
                                yield chunk;
                                yielded = true;
                            }
                        }
                    }
                }
                // A body that carried data but produced nothing is a
                // protocol violation, not an empty completion.
                if saw_bytes && !yielded {
                    Err(ProviderError::malformed(
                        NAME,
                        "response body contained no parseable output",
                    ))?;
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

#[derive(Debug, Deserialize)]
struct GenerateLine {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
}
