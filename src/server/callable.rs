//! The callable RPC envelope.
//!
//! Requests arrive as `{"data": ...}`. Success is `{"result": ...}`; failure is
//! `{"error": {"status": "INVALID_ARGUMENT", "message": "..."}}` with a
//! matching HTTP status.

use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::error::ErrorCode;
use crate::Error;

/// The `data` member of a callable request body.
#[derive(Debug, Clone)]
pub struct CallableRequest {
    pub data: Value,
}

impl<S> FromRequest<S> for CallableRequest
where
    S: Send + Sync,
{
    type Rejection = CallableError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(body) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|rejection| {
                debug!(error = %rejection, "callable body is not JSON");
                CallableError::bad_request()
            })?;

        match body {
            Value::Object(mut fields) => fields
                .remove("data")
                .map(|data| CallableRequest { data })
                .ok_or_else(CallableError::bad_request),
            _ => Err(CallableError::bad_request()),
        }
    }
}

/// A successful callable reply.
#[derive(Debug, Clone)]
pub struct CallableResponse<T>(pub T);

#[derive(Serialize)]
struct ResultEnvelope<T> {
    result: T,
}

impl<T: Serialize> IntoResponse for CallableResponse<T> {
    fn into_response(self) -> Response {
        Json(ResultEnvelope { result: self.0 }).into_response()
    }
}

/// A failed callable reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallableError {
    pub code: ErrorCode,
    pub message: String,
}

impl CallableError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn bad_request() -> Self {
        Self::new(ErrorCode::InvalidArgument, "Bad Request")
    }
}

impl From<Error> for CallableError {
    fn from(e: Error) -> Self {
        let code = e.code();
        if code == ErrorCode::Internal {
            error!(error = %e, "request failed");
        }
        Self::new(code, e.to_string())
    }
}

impl IntoResponse for CallableError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = json!({
            "error": {
                "status": self.code.as_str(),
                "message": self.message,
            }
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_mapping() {
        let err = CallableError::from(Error::validation("missing role"));
        assert_eq!(err.code, ErrorCode::InvalidArgument);
        assert_eq!(err.message, "missing role");

        let err = CallableError::from(Error::config("no key"));
        assert_eq!(err, CallableError::new(ErrorCode::Internal, "no key"));

        let err = CallableError::from(Error::internal("upstream down"));
        assert_eq!(err.message, "Internal error: upstream down");
    }

    #[test]
    fn test_error_status() {
        let response = CallableError::bad_request().into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = CallableError::new(ErrorCode::Internal, "x").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
