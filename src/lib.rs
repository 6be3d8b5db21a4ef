//! Chat endpoints that forward conversations to Google Gemini.
//!
//! Callers send role/content history; it is validated, converted, and sent to
//! the model, and the reply is returned whole or as server-sent events. Two
//! demo endpoints (token check, addition) ride along on the same server.

pub mod auth;
pub mod chat;
pub mod config;
pub mod demo;
pub mod error;
pub mod factory;
pub mod llm;
pub mod provider;
pub mod providers;
pub mod response;
pub mod server;
pub mod sse_stream;
pub mod types;

// Re-export core types for easy usage
pub use error::{Error, ErrorCode};
pub use types::*;
pub use provider::{ChatProvider, ProviderFactory};
pub use providers::*;
pub use response::*;
pub use sse_stream::SseEvent;
pub use factory::GeminiFactory;
pub use llm::{ChunkStream, LlmService};
