//! One-shot generation, streamed to stdout as chunks arrive.

use anyhow::Context;
use futures::StreamExt;
use ghost_complete::Config;
use ghost_provider::GenerationRequest;
use std::io::Write;
use tokio_util::sync::CancellationToken;

pub async fn run(
    config: &Config,
    prompt: &str,
    model: Option<&str>,
    max_tokens: Option<usize>,
    temperature: Option<f32>,
) -> anyhow::Result<()> {
    let router = config.build_router();

    let mut request = GenerationRequest::new(prompt);
    request.model = model.map(str::to_string);
    request.max_tokens = max_tokens;
    request.temperature = temperature;

    let mut stream = router
        .generate(&request, CancellationToken::new())
        .await
        .context("generation failed")?;

    let mut stdout = std::io::stdout().lock();
    while let Some(item) = stream.next().await {
        let chunk = item.context("stream failed mid-generation")?;
        stdout.write_all(chunk.as_str().as_bytes())?;
        stdout.flush()?;
    }
    writeln!(stdout)?;

    Ok(())
}
