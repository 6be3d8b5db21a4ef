#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use appliance_assistant::auth::{TokenVerifier, VerifiedToken};
use appliance_assistant::server::{self, AppState};
use appliance_assistant::{
    ChatProvider, CompleteResponse, Error, FinishReason, LlmService, Message, ProviderFactory,
    Response, Role, StreamEvent, Usage,
};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use futures_util::stream;
use serde_json::Value;
use tower::ServiceExt;

pub const VALID_TOKEN: &str = "valid-token";
pub const VALID_UID: &str = "user-123";

/// Provider that replays a fixed reply and counts invocations.
#[derive(Clone, Default)]
pub struct MockProvider {
    pub reply: String,
    pub deltas: Vec<String>,
    pub fail_with: Option<String>,
    pub fail_mid_stream: Option<String>,
    calls: Arc<AtomicUsize>,
}

impl MockProvider {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            ..Self::default()
        }
    }

    pub fn streaming(deltas: &[&str]) -> Self {
        Self {
            deltas: deltas.iter().map(|d| d.to_string()).collect(),
            ..Self::default()
        }
    }

    /// Streams `deltas`, then fails with `message` instead of finishing.
    pub fn streaming_then_failing(deltas: &[&str], message: &str) -> Self {
        Self {
            fail_mid_stream: Some(message.to_string()),
            ..Self::streaming(deltas)
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ChatProvider for MockProvider {
    async fn chat(&self, _messages: &[Message]) -> Result<CompleteResponse, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.fail_with {
            return Err(Error::provider("Mock", message.clone()));
        }
        Ok(CompleteResponse {
            role: Role::Assistant,
            content: self.reply.clone(),
            finish_reason: FinishReason::Stop,
            usage: Usage::default(),
        })
    }

    async fn stream_chat(&self, _messages: &[Message]) -> Result<Response, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.fail_with {
            return Err(Error::provider("Mock", message.clone()));
        }
        let mut events: Vec<Result<StreamEvent, Error>> = self
            .deltas
            .iter()
            .map(|delta| Ok(StreamEvent::ContentDelta { delta: delta.clone() }))
            .collect();
        if let Some(message) = &self.fail_mid_stream {
            events.push(Err(Error::streaming(message.clone())));
            events.push(Ok(StreamEvent::ContentDelta {
                delta: "never sent".to_string(),
            }));
        }
        Ok(Response::from_stream(stream::iter(events)))
    }
}

/// Hands out the same [`MockProvider`], or fails like a missing API key.
pub struct MockFactory {
    pub provider: Option<MockProvider>,
}

impl ProviderFactory for MockFactory {
    fn create(&self) -> Result<Arc<dyn ChatProvider>, Error> {
        match &self.provider {
            Some(provider) => Ok(Arc::new(provider.clone())),
            None => Err(Error::config(
                appliance_assistant::providers::gemini::MISSING_API_KEY,
            )),
        }
    }
}

/// Accepts [`VALID_TOKEN`] only.
pub struct MockVerifier;

#[async_trait::async_trait]
impl TokenVerifier for MockVerifier {
    async fn verify_id_token(&self, id_token: &str) -> Result<VerifiedToken, Error> {
        if id_token == VALID_TOKEN {
            Ok(VerifiedToken {
                uid: VALID_UID.to_string(),
            })
        } else {
            Err(Error::auth("Firebase ID token has expired"))
        }
    }
}

/// Router backed by `provider`; `None` behaves as if no API key is configured.
pub fn app(provider: Option<MockProvider>) -> Router {
    let state = AppState {
        llm: LlmService::new(Arc::new(MockFactory { provider })),
        verifier: Arc::new(MockVerifier),
    };
    server::build(state, None)
}

pub fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Send one request and return the status and raw body.
pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, String) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

pub async fn send_json(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, body) = send(app, request).await;
    (status, serde_json::from_str(&body).unwrap())
}
