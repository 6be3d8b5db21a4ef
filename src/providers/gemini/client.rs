use futures_util::StreamExt;
use reqwest::Client;
use tracing::{debug, warn};

use super::types::*;
use crate::config::LlmConfig;
use crate::provider::ChatProvider;
use crate::sse_stream::SseStreamExt;
use crate::types::{FinishReason, Message, Role};
use crate::{CompleteResponse, Error, Response, StreamEvent, Usage};

const PROVIDER: &str = "Google";

/// Message returned when no API key is available.
pub const MISSING_API_KEY: &str = "Google API key not configured in environment variables";

/// Gemini provider using the Generative Language API with an API key.
#[derive(Clone)]
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

// Keys stay out of logs.
impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl GeminiProvider {
    /// Create a provider from configuration, sharing `client`'s connection pool.
    ///
    /// Fails with [`Error::Config`] when the API key is missing or blank.
    pub fn new(config: &LlmConfig, client: Client) -> Result<Self, Error> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| Error::config(MISSING_API_KEY))?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Convert chat messages to Gemini's request format.
    fn convert_request(messages: &[Message]) -> GeminiRequest {
        let contents = messages
            .iter()
            .map(|msg| GeminiContent {
                role: match msg.role {
                    Role::User => "user".to_string(),
                    Role::Assistant => "model".to_string(),
                },
                parts: vec![GeminiPart::text(msg.content.clone())],
            })
            .collect();

        GeminiRequest { contents }
    }

    /// Get the API endpoint for the configured model.
    fn get_endpoint(&self, stream: bool) -> String {
        let method = if stream {
            "streamGenerateContent?alt=sse"
        } else {
            "generateContent"
        };
        format!("{}/v1beta/models/{}:{}", self.base_url, self.model, method)
    }

    async fn send(&self, messages: &[Message], stream: bool) -> Result<reqwest::Response, Error> {
        let endpoint = self.get_endpoint(stream);
        debug!(model = %self.model, stream, messages = messages.len(), "sending Gemini request");

        let response = self
            .client
            .post(&endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::convert_request(messages))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            warn!(status = status.as_u16(), "Gemini request failed");
            return Err(Error::provider(
                PROVIDER,
                format!("API error ({}): {}", status.as_u16(), GoogleErrorBody::describe(&body)),
            ));
        }

        Ok(response)
    }

    /// Turn a full `generateContent` reply into a [`CompleteResponse`].
    fn convert_response(response: GeminiResponse) -> Result<CompleteResponse, Error> {
        let usage = response.usage_metadata.map(Usage::from).unwrap_or_default();
        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| no_candidates(response.prompt_feedback.as_ref()))?;

        let content = candidate.content.unwrap_or_default();
        Ok(CompleteResponse {
            role: provider_role(&content.role),
            content: content.text(),
            finish_reason: candidate
                .finish_reason
                .as_deref()
                .map(FinishReason::from_gemini)
                .unwrap_or(FinishReason::Stop),
            usage,
        })
    }

    /// Turn one streamed record into stream events.
    fn convert_stream_record(response: GeminiResponse) -> Result<Vec<StreamEvent>, Error> {
        let mut events = Vec::new();

        let Some(candidate) = response.candidates.first() else {
            if let Some(feedback) = &response.prompt_feedback {
                if feedback.block_reason.is_some() {
                    return Err(no_candidates(Some(feedback)));
                }
            }
            return Ok(events);
        };

        if let Some(content) = &candidate.content {
            let delta = content.text();
            if !delta.is_empty() {
                events.push(StreamEvent::ContentDelta { delta });
            }
        }

        if let Some(reason) = &candidate.finish_reason {
            events.push(StreamEvent::Done {
                finish_reason: FinishReason::from_gemini(reason),
                usage: response.usage_metadata.clone().map(Usage::from).unwrap_or_default(),
            });
        }

        Ok(events)
    }
}

#[async_trait::async_trait]
impl ChatProvider for GeminiProvider {
    async fn chat(&self, messages: &[Message]) -> Result<CompleteResponse, Error> {
        let response = self.send(messages, false).await?;
        let body = response.bytes().await?;
        let parsed: GeminiResponse = serde_json::from_slice(&body)?;
        Self::convert_response(parsed)
    }

    async fn stream_chat(&self, messages: &[Message]) -> Result<Response, Error> {
        let response = self.send(messages, true).await?;

        let event_stream = response
            .bytes_stream()
            .sse_events()
            .map(|sse_result| {
                let records = match sse_result {
                    Ok(sse_event) => {
                        let data = sse_event.data.trim();
                        if data.is_empty() {
                            return vec![];
                        }
                        serde_json::from_str::<GeminiResponse>(data)
                            .map_err(|e| {
                                Error::provider(PROVIDER, format!("Failed to parse SSE event: {e}"))
                            })
                            .and_then(Self::convert_stream_record)
                    }
                    Err(e) => Err(e),
                };
                match records {
                    Ok(events) => events.into_iter().map(Ok).collect(),
                    Err(e) => vec![Err(e)],
                }
            })
            .map(futures_util::stream::iter)
            .flatten();

        Ok(Response::from_stream(event_stream))
    }
}

/// Gemini reports its own turns as `model`.
fn provider_role(role: &str) -> Role {
    match role {
        "user" => Role::User,
        _ => Role::Assistant,
    }
}

fn no_candidates(feedback: Option<&GeminiPromptFeedback>) -> Error {
    match feedback.and_then(|f| f.block_reason.as_deref()) {
        Some(reason) => Error::provider(PROVIDER, format!("Prompt was blocked: {reason}")),
        None => Error::provider(PROVIDER, "Response contained no candidates"),
    }
}
