//! Incremental decoder for the `text/event-stream` body of a streamed chat completion.
//!
//! Network chunks do not line up with SSE lines, so bytes are buffered until a full
//! line is available. Decoding to UTF-8 happens per line, which keeps multi-byte
//! characters split across chunks intact.

use serde::Deserialize;
use tracing::warn;

const DONE_MARKER: &str = "[DONE]";

/// One decoded event from the stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamFrame {
    /// A non-empty `choices[0].delta.content` fragment.
    Content(String),
    /// The service reported an error inside the stream.
    Error(String),
    /// `data: [DONE]`.
    Done,
}

#[derive(Debug, Deserialize)]
struct ChunkPayload {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    error: Option<ChunkError>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkError {
    message: String,
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    pending: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds raw body bytes and returns every frame completed by them, in order.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<StreamFrame> {
        self.pending.extend_from_slice(bytes);

        let mut frames = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            if let Some(frame) = decode_line(&line) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Flushes a trailing line that was not newline-terminated.
    pub fn finish(&mut self) -> Option<StreamFrame> {
        if self.pending.is_empty() {
            return None;
        }
        let line = std::mem::take(&mut self.pending);
        decode_line(&line)
    }
}

fn decode_line(raw: &[u8]) -> Option<StreamFrame> {
    let line = String::from_utf8_lossy(raw);
    let line = line.trim_end_matches(['\n', '\r']);

    // Comments (": keep-alive"), event names and blank separators carry no content.
    let data = line.strip_prefix("data:")?;
    let data = data.strip_prefix(' ').unwrap_or(data);

    if data == DONE_MARKER {
        return Some(StreamFrame::Done);
    }

    match serde_json::from_str::<ChunkPayload>(data) {
        Ok(payload) => {
            if let Some(error) = payload.error {
                return Some(StreamFrame::Error(error.message));
            }
            payload
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.delta.content)
                .filter(|content| !content.is_empty())
                .map(StreamFrame::Content)
        }
        Err(e) => {
            warn!("Skipping malformed stream payload: {e}");
            None
        }
    }
}
