//! Gemini cloud adapter.
//!
//! `streamGenerateContent` responds with a JSON array streamed as
//! newline-separated fragments (`[{...}`, `,{...}`, `]`); each fragment
//! carries text at `candidates[0].content.parts[0].text`. A non-streaming
//! response is the degenerate case of one unterminated fragment and flows
//! through the same end-of-stream flush.

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

const NAME: &str = "gemini";
const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Adapter for the Gemini generateContent protocol.
pub struct GeminiAdapter {
    client: Client,
    api_key: String,
    base_url: String,
    default_model: String,
    priority: u8,
}

impl GeminiAdapter {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: API_BASE.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            priority: 1,
        }
    }

    /// Custom base URL (for testing/proxy).
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
        let mut generation_config = json!({});
        if let Some(t) = request.temperature {
            generation_config["temperature"] = json!(t);
        }
        if let Some(n) = request.max_tokens {
            generation_config["maxOutputTokens"] = json!(n);
        }

        json!({
            "contents": [{
                "role": "user",
                "parts": [{"text": request.prompt}],
            }],
            "generationConfig": generation_config,
        })
    }

    fn model_for(&self, request: &GenerationRequest) -> String {
        request
            .model
            .clone()
            .unwrap_or_else(|| self.default_model.clone())
    }

    /// Parse one fragment of the streamed JSON array.
    ///
    /// Array framing (`[`, `,`, `]`) clings to the fragment edges and is
    /// stripped before the document parse; anything that still does not
    /// parse is dropped as protocol noise.
    fn parse_fragment(fragment: &str) -> Vec<LineEvent> {
        let doc = fragment
            .trim()
            .trim_start_matches(['[', ','])
            .trim_end_matches([']', ','])
            .trim();
        if !doc.starts_with('{') {
            return vec![];
        }

        let parsed: GenerateContentResponse = match serde_json::from_str(doc) {
            Ok(p) => p,
            Err(_) => return vec![],
        };

        let mut events = Vec::new();
        if let Some(candidate) = parsed.candidates.into_iter().next() {
            if let Some(content) = candidate.content {
                if let Some(part) = content.parts.into_iter().next() {
                    if let Some(text) = part.text {
                        if !text.is_empty() {
                            events.push(LineEvent::Text(text));
                        }
                    }
                }
            }
            if candidate.finish_reason.is_some() {
                events.push(LineEvent::Done);
            }
        }
        events
    }
}

#[async_trait]
impl ProviderAdapter for GeminiAdapter {
    fn name(&self) -> &str {
        NAME
    }

    fn priority(&self) -> u8 {
        self.priority
    }

    async fn is_available(&self) -> bool {
        // Probing a metered API costs money and quota; a configured key is
        // the availability signal for cloud backends.
        !self.api_key.is_empty()
    }

    async fn stream(
        &self,
        request: &GenerationRequest,
        cancel: CancellationToken,
    ) -> Result<TokenStream, ProviderError> {
        let body = self.build_request_body(request);
        let url = format!(
            "{}/models/{}:streamGenerateContent?key={}",
            self.base_url,
            self.model_for(request),
            self.api_key,
        );

        let response = self
            .client
            .post(&url)
            .header("content-type", "application/json")
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
                for fragment in framer.push(&read) {
                    for event in Self::parse_fragment(&fragment) {
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

            // Single-document (non-streaming) responses land here whole.
            if !done && !watch.is_cancelled() {
                if let Some(rest) = framer.finish() {
                    for event in Self::parse_fragment(&rest) {
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

// Gemini response types for deserialization

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default, rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}
