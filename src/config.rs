//! Process configuration, loaded from environment variables at startup.

use std::env;

/// Model used for every chat request.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_IDENTITY_BASE_URL: &str = "https://identitytoolkit.googleapis.com";

/// Runtime configuration for the server.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `0.0.0.0:$PORT`, port 8080).
    pub bind_address: String,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Comma-separated allowed origins; `None` allows any origin.
    pub cors_origins: Option<String>,

    pub llm: LlmConfig,

    pub identity: IdentityConfig,
}

/// Settings for the LLM client.
#[derive(Clone)]
pub struct LlmConfig {
    /// `GOOGLE_API_KEY`. Absence is reported per request, not at startup.
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

/// Settings for ID-token verification.
#[derive(Clone)]
pub struct IdentityConfig {
    /// Web API key of the identity project (`FIREBASE_API_KEY`).
    pub api_key: Option<String>,
    pub base_url: String,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let port = env_or("PORT", "8080");
        Self {
            bind_address: env_or("BIND_ADDRESS", &format!("0.0.0.0:{port}")),
            log_level: env_or("LOG_LEVEL", "info"),
            log_json: env::var("LOG_JSON")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            cors_origins: env::var("CORS_ORIGINS").ok().filter(|v| !v.trim().is_empty()),
            llm: LlmConfig::from_env(),
            identity: IdentityConfig {
                api_key: env::var("FIREBASE_API_KEY").ok(),
                base_url: env_or("IDENTITY_TOOLKIT_BASE_URL", DEFAULT_IDENTITY_BASE_URL),
            },
        }
    }
}

impl LlmConfig {
    pub fn from_env() -> Self {
        Self {
            api_key: env::var("GOOGLE_API_KEY").ok(),
            model: env_or("GEMINI_MODEL", DEFAULT_MODEL),
            base_url: env_or("GEMINI_BASE_URL", DEFAULT_GEMINI_BASE_URL),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
        }
    }
}

// Keys stay out of logs.
impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl std::fmt::Debug for IdentityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .finish()
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_owned())
}
