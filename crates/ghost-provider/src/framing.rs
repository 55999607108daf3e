//! Incremental line framing over chunked network reads.
//!
//! Streaming providers deliver newline-delimited fragments (NDJSON, SSE
//! `data:` lines, streamed JSON arrays) whose boundaries never line up with
//! network read boundaries. The framer buffers partial fragments across
//! reads and releases only complete lines; whatever is left at end-of-stream
//! gets one final parse attempt and is otherwise dropped, never surfaced as
//! emitted text.

/// Reassembles complete lines out of arbitrarily fragmented reads.
///
/// The buffer stays raw bytes until a full line is available: a read can
/// end mid-way through a multi-byte UTF-8 character, and decoding such a
/// tail would mangle it into replacement characters. A newline is a single
/// byte that never occurs inside a multi-byte sequence, so a complete line
/// is always safe to decode.
#[derive(Debug, Default)]
pub struct LineFramer {
    buffer: Vec<u8>,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one network read; returns every complete line it unlocked.
    ///
    /// Blank lines (SSE event separators) are swallowed here.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);
            if !line.trim().is_empty() {
                lines.push(line.to_string());
            }
        }
        lines
    }

    /// End-of-stream: the unterminated remainder, if any.
    ///
    /// Non-streaming responses arrive as a single unterminated line, so the
    /// caller must attempt to parse this; a remainder that still does not
    /// parse is dropped silently.
    pub fn finish(self) -> Option<String> {
        let rest = String::from_utf8_lossy(&self.buffer);
        let rest = rest.trim();
        if rest.is_empty() {
            None
        } else {
            Some(rest.to_string())
        }
    }
}
