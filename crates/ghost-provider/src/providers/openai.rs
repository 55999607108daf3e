//! OpenAI chat completions adapter (SSE delta protocol).
//!
//! Streamed responses arrive as `data: {json}` event lines with text at
//! `choices[0].delta.content`, terminated by `data: [DONE]`.

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
use tokio_util::sync::CancellationToken;

const NAME: &str = "openai";
const API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Adapter for the OpenAI chat completions protocol.
pub struct OpenAiAdapter {
    client: Client,
    api_key: String,
    base_url: String,
    default_model: String,
    priority: u8,
}

impl OpenAiAdapter {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: API_BASE.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            priority: 2,
        }
    }

    /// Custom base URL (for testing/proxy or OpenAI-compatible servers).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
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
        let mut body = json!({
            "model": request.model.clone().unwrap_or_else(|| self.default_model.clone()),
            "messages": [{"role": "user", "content": request.prompt}],
            "stream": true,
        });
        if let Some(t) = request.temperature {
            body["temperature"] = json!(t);
        }
        if let Some(n) = request.max_tokens {
            body["max_tokens"] = json!(n);
        }
        body
    }

    /// Parse one SSE line. Non-`data:` lines (comments, event names) and
    /// unparseable payloads are dropped.
    fn parse_line(line: &str) -> Vec<LineEvent> {
        let Some(data) = line.trim().strip_prefix("data: ") else {
            return vec![];
        };
        if data == "[DONE]" {
            return vec![LineEvent::Done];
        }

        let chunk: ChatChunk = match serde_json::from_str(data) {
            Ok(c) => c,
            Err(_) => return vec![],
        };

        let mut events = Vec::new();
        for choice in &chunk.choices {
            if let Some(ref content) = choice.delta.content {
                if !content.is_empty() {
                    events.push(LineEvent::Text(content.clone()));
                }
            }
            if choice.finish_reason.is_some() {
                events.push(LineEvent::Done);
            }
        }
        events
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiAdapter {
    fn name(&self) -> &str {
        NAME
    }

    fn priority(&self) -> u8 {
        self.priority
    }

    async fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn stream(
        &self,
        request: &GenerationRequest,
        cancel: CancellationToken,
    ) -> Result<TokenStream, ProviderError> {
        let body = self.build_request_body(request);
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
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

// OpenAI response types for deserialization

#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adapter_name_and_priority() {
        let adapter = OpenAiAdapter::new("sk-test");
        assert_eq!(adapter.name(), "openai");
        assert_eq!(adapter.priority(), 2);
    }

    #[test]
    fn test_availability_is_key_presence() {
        assert!(tokio_test::block_on(OpenAiAdapter::new("sk-test").is_available()));
        assert!(!tokio_test::block_on(OpenAiAdapter::new("").is_available()));
    }

    #[test]
    fn test_build_request_body() {
        let adapter = OpenAiAdapter::new("sk-test");
        let request = GenerationRequest::new("complete me")
            .with_temperature(0.2)
            .with_max_tokens(48);

        let body = adapter.build_request_body(&request);
        assert_eq!(body["model"], DEFAULT_MODEL);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "complete me");
        assert_eq!(body["stream"], true);
        assert_eq!(body["max_tokens"], 48);
    }

    #[test]
    fn test_parse_delta() {
        let events = OpenAiAdapter::parse_line(
            r#"data: {"choices":[{"delta":{"content":"Hello"},"index":0}]}"#,
        );
        assert_eq!(events, vec![LineEvent::Text("Hello".to_string())]);
    }

    #[test]
    fn test_parse_done_sentinel() {
        assert_eq!(
            OpenAiAdapter::parse_line("data: [DONE]"),
            vec![LineEvent::Done]
        );
    }

    #[test]
    fn test_parse_finish_reason() {
        let events = OpenAiAdapter::parse_line(
            r#"data: {"choices":[{"delta":{},"finish_reason":"stop","index":0}]}"#,
        );
        assert_eq!(events, vec![LineEvent::Done]);
    }

    #[test]
    fn test_non_data_lines_dropped() {
        assert!(OpenAiAdapter::parse_line(": keep-alive").is_empty());
        assert!(OpenAiAdapter::parse_line("event: message").is_empty());
        assert!(OpenAiAdapter::parse_line(r#"data: {"choices":[{"del"#).is_empty());
    }

    #[test]
    fn test_round_trip_across_fragmentation() {
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"if (\"},\"index\":0}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"x)\"},\"index\":0}]}\n\n",
            "data: [DONE]\n\n",
        )
        .as_bytes();

        for split in 1..body.len() {
            let mut framer = LineFramer::new();
            let mut text = String::new();
            for part in [&body[..split], &body[split..]] {
                for line in framer.push(part) {
                    for event in OpenAiAdapter::parse_line(&line) {
                        if let LineEvent::Text(t) = event {
                            text.push_str(&t);
                        }
                    }
                }
            }
            assert_eq!(text, "if (x)", "diverged at split {split}");
        }
    }
}
