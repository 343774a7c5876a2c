//! Widget configuration.
//!
//! The bot endpoint is fixed at build time through the `LOOPCHAT_URL`
//! environment variable; there is no runtime override in the library.

use crate::error::{ChatError, ChatResult};
use crate::types::DEFAULT_GREETING;

/// Endpoint used when `LOOPCHAT_URL` was not set at build time
pub const FALLBACK_ENDPOINT: &str = "http://localhost:8000/chat";

/// Correlator sent with every request
pub const DEFAULT_CONVERSATION_ID: i64 = 1;

/// Chat widget configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetConfig {
    /// Bot endpoint receiving `POST` requests
    pub endpoint: String,
    /// Bot turn seeded into an empty store
    pub greeting: String,
    /// Opaque id sent as `conversation_id`
    pub conversation_id: i64,
}

impl WidgetConfig {
    /// Create a configuration for an explicit endpoint
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            greeting: DEFAULT_GREETING.to_string(),
            conversation_id: DEFAULT_CONVERSATION_ID,
        }
    }

    /// Configuration baked in at compile time
    pub fn from_build_env() -> Self {
        Self::new(option_env!("LOOPCHAT_URL").unwrap_or(FALLBACK_ENDPOINT))
    }

    pub fn with_greeting(mut self, greeting: impl Into<String>) -> Self {
        self.greeting = greeting.into();
        self
    }

    pub fn with_conversation_id(mut self, id: i64) -> Self {
        self.conversation_id = id;
        self
    }

    /// Check that the endpoint is an http(s) URL
    pub fn validate(&self) -> ChatResult<()> {
        let url = reqwest::Url::parse(&self.endpoint)
            .map_err(|e| ChatError::Config(format!("Invalid endpoint '{}': {}", self.endpoint, e)))?;

        match url.scheme() {
            "http" | "https" => Ok(()),
            other => Err(ChatError::Config(format!(
                "Unsupported endpoint scheme '{}' in '{}'",
                other, self.endpoint
            ))),
        }
    }
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self::from_build_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WidgetConfig::new("http://bot.local/chat");
        assert_eq!(config.greeting, DEFAULT_GREETING);
        assert_eq!(config.conversation_id, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_build_env_endpoint_is_valid() {
        let config = WidgetConfig::from_build_env();
        assert!(!config.endpoint.is_empty());
    }

    #[test]
    fn test_builder() {
        let config = WidgetConfig::new("https://bot.local/chat")
            .with_greeting("Hey")
            .with_conversation_id(42);
        assert_eq!(config.greeting, "Hey");
        assert_eq!(config.conversation_id, 42);
    }

    #[test]
    fn test_validate_rejects_bad_endpoints() {
        assert!(matches!(
            WidgetConfig::new("not a url").validate(),
            Err(ChatError::Config(_))
        ));
        assert!(matches!(
            WidgetConfig::new("ftp://bot.local/chat").validate(),
            Err(ChatError::Config(_))
        ));
    }
}
