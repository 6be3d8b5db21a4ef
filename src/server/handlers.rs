//! Endpoint handlers.

use std::convert::Infallible;

use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use futures_util::StreamExt;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::callable::{CallableError, CallableRequest, CallableResponse};
use super::AppState;
use crate::auth::BearerToken;
use crate::chat::{process_chat_request, process_streaming_chat_request, ChatRequest};
use crate::demo::{add_numbers as add, AdditionResult};
use crate::ChatReply;

/// `applianceAssistant`: chat with the assistant and get the complete reply.
///
/// The callable envelope cannot carry a live stream, so `stream: true` is
/// answered with the complete reply as well; streaming clients use
/// `applianceAssistantStream`.
pub async fn appliance_assistant(
    State(state): State<AppState>,
    CallableRequest { data }: CallableRequest,
) -> Result<CallableResponse<ChatReply>, CallableError> {
    let request = ChatRequest::from_value(data)?;
    if request.wants_stream() {
        warn!("streaming is not available through the callable protocol; sending complete reply");
    }

    info!(messages = request.messages().len(), "chat request");
    let reply = process_chat_request(&state.llm, request.messages()).await?;
    Ok(CallableResponse(reply))
}

/// `applianceAssistantStream`: chat with the assistant over server-sent events.
pub async fn appliance_assistant_stream(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, CallableError> {
    let Json(body) = payload.map_err(|rejection| {
        debug!(error = %rejection, "stream body is not JSON");
        CallableError::bad_request()
    })?;
    let request = ChatRequest::from_value(body)?;

    info!(messages = request.messages().len(), "streaming chat request");
    let frames = process_streaming_chat_request(&state.llm, request.messages()).await?;

    let headers = [
        (header::CONTENT_TYPE, "text/event-stream"),
        (header::CACHE_CONTROL, "no-cache"),
    ];
    let body = Body::from_stream(frames.map(Ok::<_, Infallible>));
    Ok((headers, body).into_response())
}

/// `addNumbers`: add two numbers.
pub async fn add_numbers(
    CallableRequest { data }: CallableRequest,
) -> Result<CallableResponse<AdditionResult>, CallableError> {
    Ok(CallableResponse(add(&data)?))
}

/// `onRequestExampleAuth`: greet the caller identified by a bearer ID token.
pub async fn on_request_example_auth(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let header = headers
        .get(header::AUTHORIZATION)
        .map(|value| value.to_str().unwrap_or_default());

    let token = match BearerToken::from_header(header) {
        BearerToken::Missing => {
            return unauthorized("Unauthorized - No auth token provided".to_string())
        }
        BearerToken::Malformed => {
            return unauthorized("Unauthorized - Invalid auth header format".to_string())
        }
        BearerToken::Present(token) => token,
    };

    match state.verifier.verify_id_token(token).await {
        Ok(verified) => {
            info!(uid = %verified.uid, "authenticated request");
            format!("Hello authenticated user {}!", verified.uid).into_response()
        }
        Err(e) => {
            debug!(error = %e, "token verification failed");
            unauthorized(format!("Unauthorized - Invalid token: {e}"))
        }
    }
}

/// `onRequestExampleNoAuth`: static greeting.
pub async fn on_request_example_no_auth() -> Html<&'static str> {
    Html("<h1>Hello world!</h1>")
}

fn unauthorized(message: String) -> Response {
    (StatusCode::UNAUTHORIZED, message).into_response()
}
