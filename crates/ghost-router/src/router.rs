//! Backend selection and sequential fallback over provider adapters.

use crate::error::RouterError;
use futures::stream::{self, StreamExt};
use ghost_provider::{GenerationRequest, ProviderAdapter, ProviderError, TokenStream};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(300);

/// Routes generation requests to the highest-priority available backend.
///
/// The adapter list is process-wide, read-mostly configuration; everything
/// per-call (availability results, the in-flight connection) lives in the
/// call itself, so concurrent `generate` calls never share mutable state.
pub struct GenerationRouter {
    adapters: Vec<Arc<dyn ProviderAdapter>>,
    probe_timeout: Duration,
}

impl GenerationRouter {
    /// Create a router; adapters are ordered by ascending priority once,
    /// since priorities are static configuration.
    pub fn new(mut adapters: Vec<Arc<dyn ProviderAdapter>>) -> Self {
        adapters.sort_by_key(|a| a.priority());
        Self {
            adapters,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    /// Bound on each per-call availability probe.
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Configured adapters in fallback order.
    pub fn adapters(&self) -> &[Arc<dyn ProviderAdapter>] {
        &self.adapters
    }

    /// Stream tokens from the first backend that can produce output.
    ///
    /// Availability is probed per call (backends flap between calls), so
    /// results are never cached. A provider failing before its first chunk
    /// falls through to the next in priority order; once one chunk has been
    /// delivered the selection is final and a later error terminates the
    /// stream (nothing is emitted past it).
    pub async fn generate(
        &self,
        request: &GenerationRequest,
        cancel: CancellationToken,
    ) -> Result<TokenStream, RouterError> {
        request.validate()?;

        let mut failures: Vec<String> = Vec::new();
        for adapter in &self.adapters {
            let name = adapter.name().to_string();

            let available = tokio::time::timeout(self.probe_timeout, adapter.is_available())
                .await
                .unwrap_or(false);
            if !available {
                debug!(provider = %name, "unavailable, skipping");
                failures.push(format!("{name}: unavailable"));
                continue;
            }

            let mut stream = match adapter.stream(request, cancel.clone()).await {
                Ok(stream) => stream,
                Err(err) => {
                    warn!(provider = %name, %err, "failed before streaming, falling back");
                    failures.push(err.to_string());
                    continue;
                }
            };

            // Peek the first item: an error here happened before any output
            // reached the caller, so it is still a fallback case.
            match stream.next().await {
                None => {
                    debug!(provider = %name, "stream ended with no output");
                    return Ok(stream::empty().boxed());
                }
                Some(Err(err)) => {
                    warn!(provider = %name, %err, "failed before first chunk, falling back");
                    failures.push(err.to_string());
                    continue;
                }
                Some(Ok(first)) => {
                    debug!(provider = %name, "streaming");
                    let rest = fuse_after_error(stream);
                    return Ok(stream::once(async move { Ok(first) }).chain(rest).boxed());
                }
            }
        }

        Err(RouterError::NoBackendAvailable {
            hint: remediation_hint(&failures),
        })
    }

    /// Drain the stream and concatenate every chunk.
    ///
    /// No retry logic beyond what `generate` already performs; an error
    /// after partial output surfaces as `Err`.
    pub async fn generate_complete(
        &self,
        request: &GenerationRequest,
        cancel: CancellationToken,
    ) -> Result<String, RouterError> {
        let mut stream = self.generate(request, cancel).await?;
        let mut text = String::new();
        while let Some(item) = stream.next().await {
            text.push_str(item?.as_str());
        }
        Ok(text)
    }
}

/// Terminate the stream at its first error so nothing is emitted past it.
fn fuse_after_error(stream: TokenStream) -> TokenStream {
    stream
        .scan(false, |errored, item| {
            if *errored {
                return futures::future::ready(None);
            }
            *errored = item.is_err();
            futures::future::ready(Some(item))
        })
        .boxed()
}

fn remediation_hint(failures: &[String]) -> String {
    let action = "start the local daemon or configure an API key";
    if failures.is_empty() {
        format!("no providers configured; {action}")
    } else {
        format!("{}; {action}", failures.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ghost_provider::{ProviderErrorKind, TokenChunk};
    use std::sync::Mutex;

    enum Outcome {
        Chunks(Vec<&'static str>),
        FailOnConnect,
        FailFirstItem,
        FailAfter(Vec<&'static str>),
        Empty,
    }

    struct FakeAdapter {
        name: &'static str,
        priority: u8,
        available: bool,
        slow_probe: bool,
        outcome: Outcome,
        attempts: Arc<Mutex<Vec<String>>>,
    }

    impl FakeAdapter {
        fn new(
            name: &'static str,
            priority: u8,
            outcome: Outcome,
            attempts: &Arc<Mutex<Vec<String>>>,
        ) -> Arc<Self> {
            Arc::new(Self {
                name,
                priority,
                available: true,
                slow_probe: false,
                outcome,
                attempts: Arc::clone(attempts),
            })
        }

        fn unavailable(mut self: Arc<Self>) -> Arc<Self> {
            Arc::get_mut(&mut self).unwrap().available = false;
            self
        }

        fn with_slow_probe(mut self: Arc<Self>) -> Arc<Self> {
            Arc::get_mut(&mut self).unwrap().slow_probe = true;
            self
        }

        fn error(&self) -> ProviderError {
            ProviderError::new(ProviderErrorKind::Unavailable, self.name, "boom")
        }
    }

    #[async_trait]
    impl ProviderAdapter for FakeAdapter {
        fn name(&self) -> &str {
            self.name
        }

        fn priority(&self) -> u8 {
            self.priority
        }

        async fn is_available(&self) -> bool {
            if self.slow_probe {
                std::future::pending::<()>().await;
            }
            self.available
        }

        async fn stream(
            &self,
            _request: &GenerationRequest,
            _cancel: CancellationToken,
        ) -> Result<TokenStream, ProviderError> {
            self.attempts.lock().unwrap().push(self.name.to_string());
            match &self.outcome {
                Outcome::Chunks(chunks) => {
                    let items: Vec<_> = chunks
                        .iter()
                        .map(|c| Ok(TokenChunk::new(*c).unwrap()))
                        .collect();
                    Ok(stream::iter(items).boxed())
                }
                Outcome::FailOnConnect => Err(self.error()),
                Outcome::FailFirstItem => Ok(stream::iter(vec![Err(self.error())]).boxed()),
                Outcome::FailAfter(chunks) => {
                    let mut items: Vec<_> = chunks
                        .iter()
                        .map(|c| Ok(TokenChunk::new(*c).unwrap()))
                        .collect();
                    items.push(Err(self.error()));
                    // Anything after the error must never reach the caller.
                    items.push(Ok(TokenChunk::new("never").unwrap()));
                    Ok(stream::iter(items).boxed())
                }
                Outcome::Empty => Ok(stream::empty().boxed()),
            }
        }
    }

    fn attempts_log() -> Arc<Mutex<Vec<String>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    fn request() -> GenerationRequest {
        GenerationRequest::new("fn main() {")
    }

    fn router_of(adapters: Vec<Arc<FakeAdapter>>) -> GenerationRouter {
        GenerationRouter::new(
            adapters
                .into_iter()
                .map(|a| a as Arc<dyn ProviderAdapter>)
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_local_tried_first_regardless_of_registration_order() {
        let log = attempts_log();
        let cloud = FakeAdapter::new("cloud", 2, Outcome::Chunks(vec!["c"]), &log);
        let local = FakeAdapter::new("local", 0, Outcome::Chunks(vec!["l"]), &log);
        let router = router_of(vec![cloud, local]);

        let text = router
            .generate_complete(&request(), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(text, "l");
        assert_eq!(*log.lock().unwrap(), vec!["local"]);
    }

    #[tokio::test]
    async fn test_fallback_when_stream_call_fails() {
        let log = attempts_log();
        let router = router_of(vec![
            FakeAdapter::new("local", 0, Outcome::FailOnConnect, &log),
            FakeAdapter::new("cloud", 1, Outcome::Chunks(vec!["ok"]), &log),
        ]);

        let text = router
            .generate_complete(&request(), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(text, "ok");
        assert_eq!(*log.lock().unwrap(), vec!["local", "cloud"]);
    }

    #[tokio::test]
    async fn test_fallback_when_first_item_is_error() {
        let log = attempts_log();
        let router = router_of(vec![
            FakeAdapter::new("local", 0, Outcome::FailFirstItem, &log),
            FakeAdapter::new("cloud", 1, Outcome::Chunks(vec!["ok"]), &log),
        ]);

        let text = router
            .generate_complete(&request(), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(text, "ok");
        assert_eq!(*log.lock().unwrap(), vec!["local", "cloud"]);
    }

    #[tokio::test]
    async fn test_no_fallback_after_partial_output() {
        let log = attempts_log();
        let router = router_of(vec![
            FakeAdapter::new("local", 0, Outcome::FailAfter(vec!["par", "tial"]), &log),
            FakeAdapter::new("cloud", 1, Outcome::Chunks(vec!["ok"]), &log),
        ]);

        let result = router
            .generate_complete(&request(), CancellationToken::new())
            .await;
        assert!(matches!(result, Err(RouterError::Provider(_))));
        // The second provider must never be attempted for the same call.
        assert_eq!(*log.lock().unwrap(), vec!["local"]);
    }

    #[tokio::test]
    async fn test_stream_emits_nothing_after_error() {
        let log = attempts_log();
        let router = router_of(vec![FakeAdapter::new(
            "local",
            0,
            Outcome::FailAfter(vec!["a", "b"]),
            &log,
        )]);

        let stream = router
            .generate(&request(), CancellationToken::new())
            .await
            .unwrap();
        let items: Vec<_> = stream.collect().await;
        assert_eq!(items.len(), 3); // a, b, error; never the trailing chunk
        assert!(items[0].is_ok());
        assert!(items[1].is_ok());
        assert!(items[2].is_err());
    }

    #[tokio::test]
    async fn test_unavailable_provider_skipped() {
        let log = attempts_log();
        let router = router_of(vec![
            FakeAdapter::new("local", 0, Outcome::Chunks(vec!["l"]), &log).unavailable(),
            FakeAdapter::new("cloud", 1, Outcome::Chunks(vec!["c"]), &log),
        ]);

        let text = router
            .generate_complete(&request(), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(text, "c");
        assert_eq!(*log.lock().unwrap(), vec!["cloud"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_probe_treated_as_unavailable() {
        let log = attempts_log();
        let router = router_of(vec![
            FakeAdapter::new("local", 0, Outcome::Chunks(vec!["l"]), &log).with_slow_probe(),
            FakeAdapter::new("cloud", 1, Outcome::Chunks(vec!["c"]), &log),
        ]);

        let text = router
            .generate_complete(&request(), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(text, "c");
    }

    #[tokio::test]
    async fn test_all_unavailable_is_no_backend() {
        let log = attempts_log();
        let router = router_of(vec![
            FakeAdapter::new("local", 0, Outcome::Chunks(vec!["l"]), &log).unavailable(),
            FakeAdapter::new("cloud", 1, Outcome::Chunks(vec!["c"]), &log).unavailable(),
        ]);

        let err = router
            .generate(&request(), CancellationToken::new())
            .await
            .err()
            .unwrap();
        match err {
            RouterError::NoBackendAvailable { hint } => {
                assert!(hint.contains("start the local daemon"));
                assert!(hint.contains("API key"));
            }
            other => panic!("expected NoBackendAvailable, got: {other}"),
        }
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_all_fail_pre_output_is_no_backend() {
        let log = attempts_log();
        let router = router_of(vec![
            FakeAdapter::new("local", 0, Outcome::FailOnConnect, &log),
            FakeAdapter::new("cloud", 1, Outcome::FailFirstItem, &log),
        ]);

        let err = router
            .generate(&request(), CancellationToken::new())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, RouterError::NoBackendAvailable { .. }));
        assert_eq!(*log.lock().unwrap(), vec!["local", "cloud"]);
    }

    #[tokio::test]
    async fn test_no_providers_configured() {
        let router = router_of(vec![]);
        let err = router
            .generate(&request(), CancellationToken::new())
            .await
            .err()
            .unwrap();
        match err {
            RouterError::NoBackendAvailable { hint } => {
                assert!(hint.contains("no providers configured"));
            }
            other => panic!("expected NoBackendAvailable, got: {other}"),
        }
    }

    #[tokio::test]
    async fn test_empty_stream_completes_with_empty_text() {
        let log = attempts_log();
        let router =
            router_of(vec![FakeAdapter::new("local", 0, Outcome::Empty, &log)]);

        let text = router
            .generate_complete(&request(), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(text, "");
    }

    #[tokio::test]
    async fn test_generate_complete_concatenates_in_order() {
        let log = attempts_log();
        let router = router_of(vec![FakeAdapter::new(
            "local",
            0,
            Outcome::Chunks(vec!["let ", "x = ", "42;"]),
            &log,
        )]);

        let text = router
            .generate_complete(&request(), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(text, "let x = 42;");
    }

    #[tokio::test]
    async fn test_invalid_request_rejected_before_io() {
        let log = attempts_log();
        let router = router_of(vec![FakeAdapter::new(
            "local",
            0,
            Outcome::Chunks(vec!["l"]),
            &log,
        )]);

        let bad = GenerationRequest::new("x").with_temperature(3.0);
        let err = router
            .generate(&bad, CancellationToken::new())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, RouterError::InvalidRequest(_)));
        assert!(log.lock().unwrap().is_empty());
    }
}
