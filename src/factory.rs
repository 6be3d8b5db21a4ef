use std::sync::Arc;

use reqwest::Client;

use crate::config::LlmConfig;
use crate::provider::{ChatProvider, ProviderFactory};
use crate::providers::GeminiProvider;
use crate::Error;

/// Builds a [`GeminiProvider`] per invocation from fixed configuration.
///
/// The HTTP client (and its connection pool) is shared across invocations.
#[derive(Clone)]
pub struct GeminiFactory {
    config: LlmConfig,
    client: Client,
}

impl GeminiFactory {
    pub fn new(config: LlmConfig, client: Client) -> Self {
        Self { config, client }
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }
}

impl ProviderFactory for GeminiFactory {
    fn create(&self) -> Result<Arc<dyn ChatProvider>, Error> {
        let provider = GeminiProvider::new(&self.config, self.client.clone())?;
        Ok(Arc::new(provider))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_checks_key() {
        let factory = GeminiFactory::new(LlmConfig::default(), Client::new());
        assert!(matches!(factory.create(), Err(Error::Config(_))));

        let factory = GeminiFactory::new(
            LlmConfig {
                api_key: Some("key".to_string()),
                ..LlmConfig::default()
            },
            Client::new(),
        );
        assert!(factory.create().is_ok());
        assert_eq!(factory.config().model, crate::config::DEFAULT_MODEL);
    }
}
