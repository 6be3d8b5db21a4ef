//! Google Gemini through the Generative Language API.

pub mod client;
pub mod types;

pub use client::{GeminiProvider, MISSING_API_KEY};
