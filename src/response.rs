//! Response handling for LLM generations.

use std::pin::Pin;

use futures_util::stream::Stream;
use serde::Serialize;

use crate::{Error, FinishReason, Role, StreamEvent, Usage};

/// A complete, non-streamed reply from a provider.
#[derive(Debug, Clone, PartialEq)]
pub struct CompleteResponse {
    pub role: Role,
    pub content: String,
    pub finish_reason: FinishReason,
    pub usage: Usage,
}

/// The reply returned to callers of the full-response operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatResponse {
    pub role: Role,
    pub content: String,
    /// Seconds since the Unix epoch, captured when the reply arrived locally.
    pub timestamp: f64,
}

impl ChatResponse {
    /// Stamp a provider reply with the current local time.
    pub fn received(reply: CompleteResponse) -> Self {
        let now = chrono::Utc::now();
        Self {
            role: reply.role,
            content: reply.content,
            timestamp: now.timestamp_millis() as f64 / 1000.0,
        }
    }
}

/// Envelope of a successful chat request: `{"response": ..., "success": true}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatReply {
    pub response: ChatResponse,
    pub success: bool,
}

impl From<ChatResponse> for ChatReply {
    fn from(response: ChatResponse) -> Self {
        Self {
            response,
            success: true,
        }
    }
}

/// A streamed provider reply.
pub struct Response {
    stream: Pin<Box<dyn Stream<Item = Result<StreamEvent, Error>> + Send>>,
}

impl Response {
    /// Create a new response from a stream of events.
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<StreamEvent, Error>> + Send + 'static,
    {
        Self {
            stream: Box::pin(stream),
        }
    }

    /// Stream the response events.
    pub fn stream(self) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, Error>> + Send>> {
        self.stream
    }
}

impl std::fmt::Debug for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Response { .. }")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_response_timestamp_is_local_now() {
        let before = chrono::Utc::now().timestamp() as f64;
        let response = ChatResponse::received(CompleteResponse {
            role: Role::Assistant,
            content: "hello".to_string(),
            finish_reason: FinishReason::Stop,
            usage: Usage::default(),
        });
        let after = chrono::Utc::now().timestamp() as f64 + 1.0;

        assert_eq!(response.content, "hello");
        assert!(response.timestamp >= before && response.timestamp <= after);
    }

    #[test]
    fn test_chat_reply_shape() {
        let reply = ChatReply::from(ChatResponse {
            role: Role::Assistant,
            content: "hello".to_string(),
            timestamp: 1700000000.5,
        });

        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "response": {"role": "assistant", "content": "hello", "timestamp": 1700000000.5},
                "success": true
            })
        );
    }
}
