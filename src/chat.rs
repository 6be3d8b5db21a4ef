//! Chat request orchestration: adapt caller messages, invoke the LLM, shape the reply.

use futures_util::{Stream, StreamExt};
use serde::Deserialize;
use tracing::debug;

use crate::llm::LlmService;
use crate::types::{error_frame, format_chat_messages, IncomingMessage};
use crate::{ChatReply, Error};

/// Message returned when a request carries no `messages` field.
pub const MISSING_MESSAGES: &str = "The function must be called with \"messages\" field.";

/// Payload of a chat request: `{"messages": [...], "stream": false}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Option<Vec<IncomingMessage>>,
    #[serde(default)]
    pub stream: Option<bool>,
}

impl ChatRequest {
    /// Decode a request payload, rejecting anything without a `messages` list.
    pub fn from_value(data: serde_json::Value) -> Result<Self, Error> {
        let request: ChatRequest = serde_json::from_value(data).map_err(|e| {
            debug!(error = %e, "malformed chat request");
            Error::validation(format!("Invalid chat request: {e}"))
        })?;
        if request.messages.is_none() {
            return Err(Error::validation(MISSING_MESSAGES));
        }
        Ok(request)
    }

    pub fn messages(&self) -> &[IncomingMessage] {
        self.messages.as_deref().unwrap_or_default()
    }

    /// Whether the caller asked for an incremental reply; absent or `null` is `false`.
    pub fn wants_stream(&self) -> bool {
        self.stream.unwrap_or(false)
    }
}

/// Process a chat request, returning the complete reply.
pub async fn process_chat_request(
    llm: &LlmService,
    messages: &[IncomingMessage],
) -> Result<ChatReply, Error> {
    let formatted = format_chat_messages(messages)?;
    let response = llm.get_llm_response(&formatted).await?;
    Ok(ChatReply::from(response))
}

/// Process a chat request, returning the reply as server-sent-event records.
///
/// Validation and connection failures are returned before any record is
/// produced. A failure after that becomes one error record that ends the stream.
pub async fn process_streaming_chat_request(
    llm: &LlmService,
    messages: &[IncomingMessage],
) -> Result<impl Stream<Item = String> + Send + 'static, Error> {
    let formatted = format_chat_messages(messages)?;
    let chunks = llm.get_llm_streaming_response(&formatted).await?;

    Ok(chunks.map(|chunk| match chunk {
        Ok(chunk) => chunk.to_sse_frame(),
        Err(e) => error_frame(&e.to_string()),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_messages_rejected() {
        let err = ChatRequest::from_value(json!({"stream": true})).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(err.to_string(), MISSING_MESSAGES);

        let err = ChatRequest::from_value(json!(null)).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_malformed_messages_rejected() {
        let err = ChatRequest::from_value(json!({"messages": "hi"})).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = ChatRequest::from_value(json!({"messages": [{"role": 1, "content": "x"}]}))
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_stream_defaults_false() {
        let request =
            ChatRequest::from_value(json!({"messages": [{"role": "user", "content": "hi"}]}))
                .unwrap();
        assert!(!request.wants_stream());
        assert_eq!(request.messages(), &[IncomingMessage::new("user", "hi")]);

        let request = ChatRequest::from_value(json!({"messages": [], "stream": null})).unwrap();
        assert!(!request.wants_stream());

        let request = ChatRequest::from_value(json!({"messages": [], "stream": true})).unwrap();
        assert!(request.wants_stream());
    }
}
