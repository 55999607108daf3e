//! Inline completion of a file at a cursor position.

use anyhow::Context;
use ghost_complete::{AutocompleteEngine, AutocompleteRequest, CompletionState, Config};
use std::path::Path;
use std::sync::Arc;

pub async fn run(
    config: &Config,
    file: &Path,
    line: usize,
    col: usize,
    model: Option<&str>,
    timeout_ms: Option<u64>,
) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let offset = offset_at(&text, line, col)
        .with_context(|| format!("cursor {line}:{col} out of range"))?;
    let (prefix, suffix) = text.split_at(offset);

    let mut engine_config = config.engine_config();
    if let Some(model) = model {
        engine_config.fast_model = model.to_string();
    }
    if let Some(timeout_ms) = timeout_ms {
        engine_config.timeout_ms = timeout_ms;
    }

    let router = Arc::new(config.build_router());
    let engine = AutocompleteEngine::new(engine_config, router)?;

    let request = AutocompleteRequest::new(prefix, suffix, file.display().to_string());
    let result = engine.get_completions(&request).await?;

    let state = match result.state {
        CompletionState::Completed => "completed",
        CompletionState::TimedOut => "timed out",
        CompletionState::Failed => "failed",
    };
    eprintln!("{state} in {} ms", result.latency_ms);
    if let Some(error) = &result.error {
        tracing::debug!(%error, "completion failed");
    }

    // "No suggestion" is a normal outcome: print nothing, exit zero.
    if let Some(completion) = result.completions.first() {
        println!("{completion}");
    }

    Ok(())
}

/// Byte offset of a 1-based line/character-column cursor position.
fn offset_at(text: &str, line: usize, col: usize) -> Option<usize> {
    if line == 0 || col == 0 {
        return None;
    }

    let mut line_start = 0;
    for (i, l) in text.split('\n').enumerate() {
        if i + 1 == line {
            let byte_in_line = match l.char_indices().nth(col - 1) {
                Some((b, _)) => b,
                // One past the last character is the end of the line.
                None if l.chars().count() == col - 1 => l.len(),
                None => return None,
            };
            return Some(line_start + byte_in_line);
        }
        line_start += l.len() + 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_at_start_of_buffer() {
        assert_eq!(offset_at("abc\ndef", 1, 1), Some(0));
    }

    #[test]
    fn test_offset_at_mid_line() {
        assert_eq!(offset_at("abc\ndef", 2, 2), Some(5));
    }

    #[test]
    fn test_offset_at_end_of_line() {
        assert_eq!(offset_at("abc\ndef", 1, 4), Some(3));
    }

    #[test]
    fn test_offset_at_out_of_range() {
        assert_eq!(offset_at("abc", 2, 1), None);
        assert_eq!(offset_at("abc", 1, 6), None);
        assert_eq!(offset_at("abc", 0, 1), None);
        assert_eq!(offset_at("abc", 1, 0), None);
    }

    #[test]
    fn test_offset_at_multibyte_column() {
        // Columns count characters, offsets count bytes.
        assert_eq!(offset_at("αβγ", 1, 2), Some(2));
        assert_eq!(offset_at("αβγ", 1, 4), Some(6));
    }
}
