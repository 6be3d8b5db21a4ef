use std::sync::Arc;

use crate::{CompleteResponse, Error, Message, Response};

/// A chat-completion backend.
#[async_trait::async_trait]
pub trait ChatProvider: Send + Sync + 'static {
    /// Send the whole conversation and wait for the complete reply.
    async fn chat(&self, messages: &[Message]) -> Result<CompleteResponse, Error>;

    /// Send the conversation and return the reply as it streams in.
    async fn stream_chat(&self, messages: &[Message]) -> Result<Response, Error>;
}

/// Builds a configured provider for one invocation.
///
/// Construction is where configuration problems surface, before any request
/// is sent.
pub trait ProviderFactory: Send + Sync + 'static {
    fn create(&self) -> Result<Arc<dyn ChatProvider>, Error>;
}
