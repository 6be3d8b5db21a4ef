//! Types for streaming responses.

use serde::Serialize;

use crate::types::{FinishReason, Usage};

/// Events a provider emits while a reply streams in.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A chunk of content was received.
    ContentDelta { delta: String },
    /// The provider reported the end of generation.
    Done {
        finish_reason: FinishReason,
        usage: Usage,
    },
}

/// One item of the incremental chat reply handed to callers.
///
/// A well-formed sequence is zero or more `Delta`s followed by exactly one `Done`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamChunk {
    Delta(String),
    Done,
}

#[derive(Serialize)]
struct WireChunk<'a> {
    chunk: &'a str,
    done: bool,
}

#[derive(Serialize)]
struct WireError<'a> {
    error: &'a str,
    done: bool,
}

impl StreamChunk {
    pub fn delta(&self) -> &str {
        match self {
            StreamChunk::Delta(text) => text,
            StreamChunk::Done => "",
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, StreamChunk::Done)
    }

    /// The `{"chunk": ..., "done": ...}` payload of this chunk.
    pub fn to_json(&self) -> String {
        let wire = WireChunk {
            chunk: self.delta(),
            done: self.is_done(),
        };
        // Serializing a borrowed str and a bool cannot fail.
        serde_json::to_string(&wire).unwrap_or_default()
    }

    /// The chunk framed as a server-sent-event record.
    pub fn to_sse_frame(&self) -> String {
        format!("data: {}\n\n", self.to_json())
    }
}

/// The record sent in place of `Done` when the provider fails mid-stream.
pub fn error_frame(message: &str) -> String {
    let wire = WireError {
        error: message,
        done: true,
    };
    format!("data: {}\n\n", serde_json::to_string(&wire).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_frames() {
        let delta = StreamChunk::Delta("Hel".to_string());
        assert_eq!(delta.to_sse_frame(), "data: {\"chunk\":\"Hel\",\"done\":false}\n\n");

        let done = StreamChunk::Done;
        assert_eq!(done.delta(), "");
        assert_eq!(done.to_sse_frame(), "data: {\"chunk\":\"\",\"done\":true}\n\n");
    }

    #[test]
    fn test_frame_escapes_payload() {
        let chunk = StreamChunk::Delta("line\n\"quoted\"".to_string());
        let frame = chunk.to_sse_frame();

        // The record separator must only appear at the end.
        assert_eq!(frame.matches("\n\n").count(), 1);
        let payload: serde_json::Value =
            serde_json::from_str(frame.trim_start_matches("data: ").trim_end()).unwrap();
        assert_eq!(payload["chunk"], "line\n\"quoted\"");
    }

    #[test]
    fn test_error_frame() {
        assert_eq!(
            error_frame("boom"),
            "data: {\"error\":\"boom\",\"done\":true}\n\n"
        );
    }
}
