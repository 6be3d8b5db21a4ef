//! ID-token verification through the Google Identity Toolkit.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::IdentityConfig;
use crate::providers::gemini::types::GoogleErrorBody;
use crate::Error;

/// Claims of a verified ID token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    pub uid: String,
}

/// Verifies ID tokens issued by the identity provider.
#[async_trait::async_trait]
pub trait TokenVerifier: Send + Sync + 'static {
    async fn verify_id_token(&self, id_token: &str) -> Result<VerifiedToken, Error>;
}

/// Result of reading an `Authorization` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BearerToken<'a> {
    Missing,
    Malformed,
    Present(&'a str),
}

impl<'a> BearerToken<'a> {
    pub fn from_header(header: Option<&'a str>) -> Self {
        match header {
            None => BearerToken::Missing,
            Some(value) => match value.strip_prefix("Bearer ") {
                Some(token) => BearerToken::Present(token),
                None => BearerToken::Malformed,
            },
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LookupRequest<'a> {
    id_token: &'a str,
}

#[derive(Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<UserRecord>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserRecord {
    local_id: String,
}

/// Verifies tokens with the `accounts:lookup` endpoint.
#[derive(Clone)]
pub struct IdentityToolkitVerifier {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl IdentityToolkitVerifier {
    pub fn new(config: &IdentityConfig, client: Client) -> Self {
        Self {
            client,
            api_key: config.api_key.clone().filter(|key| !key.trim().is_empty()),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait::async_trait]
impl TokenVerifier for IdentityToolkitVerifier {
    async fn verify_id_token(&self, id_token: &str) -> Result<VerifiedToken, Error> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| Error::auth("identity provider API key is not configured"))?;
        if id_token.is_empty() {
            return Err(Error::auth("ID token must be a non-empty string"));
        }

        let response = self
            .client
            .post(format!("{}/v1/accounts:lookup", self.base_url))
            .query(&[("key", api_key)])
            .json(&LookupRequest { id_token })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            debug!(status = status.as_u16(), "token lookup rejected");
            return Err(Error::auth(GoogleErrorBody::describe(&body)));
        }

        let lookup: LookupResponse = serde_json::from_str(&body)?;
        let user = lookup
            .users
            .into_iter()
            .next()
            .ok_or_else(|| Error::auth("no user matches the ID token"))?;

        Ok(VerifiedToken {
            uid: user.local_id,
        })
    }
}
