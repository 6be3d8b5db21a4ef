//! LLM invocation: full and incremental chat replies with uniform error reporting.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};

use futures_util::Stream;
use tracing::{debug, info, warn};

use crate::provider::ProviderFactory;
use crate::{ChatResponse, Error, Message, StreamChunk, StreamEvent};

/// Performs chat completions against a provider built per invocation.
#[derive(Clone)]
pub struct LlmService {
    factory: Arc<dyn ProviderFactory>,
}

impl LlmService {
    pub fn new(factory: Arc<dyn ProviderFactory>) -> Self {
        Self { factory }
    }

    /// Send the conversation and wait for the complete reply.
    ///
    /// Configuration problems come back as [`Error::Config`]; every provider
    /// failure comes back as [`Error::Internal`].
    pub async fn get_llm_response(&self, messages: &[Message]) -> Result<ChatResponse, Error> {
        let provider = self.factory.create()?;

        let reply = provider.chat(messages).await.map_err(|e| {
            warn!(error = %e, "LLM request failed");
            Error::internal(e)
        })?;

        info!(
            content_len = reply.content.len(),
            input_tokens = reply.usage.input_tokens,
            output_tokens = reply.usage.output_tokens,
            finish_reason = ?reply.finish_reason,
            "LLM response received"
        );
        Ok(ChatResponse::received(reply))
    }

    /// Send the conversation and return the reply as a stream of chunks.
    ///
    /// Failures before the stream opens are returned here; a failure after it
    /// opens is yielded once as an `Err` item, after which the stream ends.
    pub async fn get_llm_streaming_response(
        &self,
        messages: &[Message],
    ) -> Result<ChunkStream, Error> {
        let provider = self.factory.create()?;

        let response = provider.stream_chat(messages).await.map_err(|e| {
            warn!(error = %e, "LLM streaming request failed");
            Error::internal(e)
        })?;

        debug!("LLM stream opened");
        Ok(ChunkStream::new(response.stream()))
    }
}

type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, Error>> + Send>>;

/// Forward-only stream of [`StreamChunk`]s.
///
/// Empty deltas are dropped. Exhaustion of the provider stream yields exactly
/// one [`StreamChunk::Done`]; nothing follows it.
pub struct ChunkStream {
    events: EventStream,
    finished: bool,
    emitted: usize,
}

impl ChunkStream {
    pub fn new(events: EventStream) -> Self {
        Self {
            events,
            finished: false,
            emitted: 0,
        }
    }
}

impl Stream for ChunkStream {
    type Item = Result<StreamChunk, Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            if self.finished {
                return Poll::Ready(None);
            }

            match ready!(self.events.as_mut().poll_next(cx)) {
                Some(Ok(StreamEvent::ContentDelta { delta })) => {
                    if delta.is_empty() {
                        continue;
                    }
                    self.emitted += 1;
                    return Poll::Ready(Some(Ok(StreamChunk::Delta(delta))));
                }
                Some(Ok(StreamEvent::Done {
                    finish_reason,
                    usage,
                })) => {
                    debug!(?finish_reason, output_tokens = usage.output_tokens, "provider finished");
                }
                Some(Err(e)) => {
                    self.finished = true;
                    warn!(error = %e, chunks = self.emitted, "LLM stream failed");
                    return Poll::Ready(Some(Err(Error::internal(e))));
                }
                None => {
                    self.finished = true;
                    info!(chunks = self.emitted, "LLM stream complete");
                    return Poll::Ready(Some(Ok(StreamChunk::Done)));
                }
            }
        }
    }
}
