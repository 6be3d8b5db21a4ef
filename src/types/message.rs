use serde::{Deserialize, Serialize};

use crate::Error;

/// A chat message as sent by callers: `{"role": "...", "content": "..."}`.
///
/// Both fields are optional at the deserialization layer so that a missing
/// field is reported as a validation failure rather than a decode error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IncomingMessage {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

impl IncomingMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Some(role.into()),
            content: Some(content.into()),
        }
    }
}

/// A message with role and content, in the form handed to providers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Create a new message with role and text content.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Message {
            role,
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Role of a message participant.
///
/// Anything a caller sends that is not `user` (case-insensitive) is treated
/// as the assistant, including `system`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn from_caller(role: &str) -> Self {
        if role.to_lowercase() == "user" {
            Role::User
        } else {
            Role::Assistant
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// Convert caller-supplied history into provider messages, one to one and in order.
pub fn format_chat_messages(messages: &[IncomingMessage]) -> Result<Vec<Message>, Error> {
    messages
        .iter()
        .enumerate()
        .map(|(index, message)| {
            let (role, content) = match (&message.role, &message.content) {
                (Some(role), Some(content)) => (role, content),
                (None, _) => return Err(missing_field(index, "role")),
                (_, None) => return Err(missing_field(index, "content")),
            };
            Ok(Message::new(Role::from_caller(role), content.clone()))
        })
        .collect()
}

fn missing_field(index: usize, field: &str) -> Error {
    Error::validation(format!(
        "Each message must have 'role' and 'content' fields (message {index} is missing '{field}')"
    ))
}
