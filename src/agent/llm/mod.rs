//! Language-model gateway abstraction.
//!
//! This module provides:
//! - [`LlmGateway`] trait with a structured classification call and a
//!   free-text generation call
//! - [`GatewayError`], the typed failure reason every call returns
//! - [`ProviderRegistry`] for creating a gateway from configuration
//! - Concrete implementations: Gemini, OpenAI-compatible (DeepSeek, OpenAI)
//!
//! # Adding a New Provider
//!
//! 1. Create a new file (e.g., `anthropic.rs`)
//! 2. Implement `LlmGateway`
//! 3. Add to `ProviderRegistry::create()`

mod types;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::config::ProviderConfig;
use crate::error::Error;
use crate::Result;

pub use types::*;

pub mod gemini;
pub mod openai;

pub use gemini::GeminiClient;
pub use openai::OpenAiCompatClient;

/// Why a gateway call failed.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("missing credentials for provider {0}")]
    MissingCredentials(String),

    #[error("transport failure: {0}")]
    Transport(reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("empty response from model")]
    EmptyResponse,

    #[error("malformed model output: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for GatewayError {
    // Request URLs may carry credentials; keep them out of error text.
    fn from(e: reqwest::Error) -> Self {
        GatewayError::Transport(e.without_url())
    }
}

/// Structured-output request: the model must answer with JSON matching `schema`.
#[derive(Debug, Clone)]
pub struct ClassifyRequest {
    pub system: String,
    pub prompt: String,
    pub schema: Value,
    pub temperature: f32,
}

/// Free-text generation request.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub system: String,
    pub prompt: String,
    pub temperature: f32,
}

/// Gateway trait - swappable provider abstraction.
///
/// Implementations return a typed failure instead of falling back; callers
/// own the fallback values.
#[async_trait]
pub trait LlmGateway: Send + Sync {
    /// Ask for a JSON value conforming to `request.schema`.
    async fn classify(&self, request: &ClassifyRequest) -> std::result::Result<Value, GatewayError>;

    /// Ask for free text.
    async fn generate(&self, request: &GenerateRequest) -> std::result::Result<String, GatewayError>;

    /// The model this gateway talks to.
    fn model(&self) -> &str;
}

/// Provider registry - creates gateways from configuration.
///
/// # Example
///
/// ```ignore
/// let router_gateway = ProviderRegistry::create(&config.router)?;
/// ```
pub struct ProviderRegistry;

impl ProviderRegistry {
    /// Create a gateway for one provider section.
    ///
    /// Supported providers:
    /// - `"gemini"`: Generative Language API with API key
    /// - `"deepseek"`, `"openai"`: OpenAI-compatible chat completions
    pub fn create(config: &ProviderConfig) -> Result<Arc<dyn LlmGateway>> {
        let timeout = Duration::from_secs(config.timeout_secs);
        match config.provider.as_str() {
            "gemini" => {
                let client = GeminiClient::new(&config.api_key, &config.model, timeout)?
                    .with_base_url(config.base_url.as_deref());
                Ok(Arc::new(client))
            }
            "deepseek" | "openai" => {
                let base_url = config
                    .base_url
                    .clone()
                    .unwrap_or_else(|| openai::default_base_url(&config.provider).to_string());
                let client = OpenAiCompatClient::new(&config.api_key, &config.model, &base_url, timeout)?;
                Ok(Arc::new(client))
            }
            other => Err(Error::Config(format!("Unknown provider: {other}"))),
        }
    }

    /// List available provider names.
    pub fn available() -> &'static [&'static str] {
        &["gemini", "deepseek", "openai"]
    }
}

/// A request seen by [`FakeGateway`].
#[cfg(test)]
#[derive(Debug, Clone)]
pub enum RecordedRequest {
    Classify(ClassifyRequest),
    Generate(GenerateRequest),
}

/// Scripted gateway for testing.
///
/// Each call pops the next canned outcome; an exhausted queue fails the call.
#[cfg(test)]
#[derive(Default)]
pub struct FakeGateway {
    classifications: std::sync::Mutex<std::collections::VecDeque<std::result::Result<Value, GatewayError>>>,
    generations: std::sync::Mutex<std::collections::VecDeque<std::result::Result<String, GatewayError>>>,
    requests: std::sync::Mutex<Vec<RecordedRequest>>,
}

#[cfg(test)]
impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_classification(self, value: Value) -> Self {
        self.classifications.lock().unwrap().push_back(Ok(value));
        self
    }

    pub fn with_classification_error(self, error: GatewayError) -> Self {
        self.classifications.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn with_generation(self, text: &str) -> Self {
        self.generations.lock().unwrap().push_back(Ok(text.to_string()));
        self
    }

    pub fn with_generation_error(self, error: GatewayError) -> Self {
        self.generations.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn generate_requests(&self) -> Vec<GenerateRequest> {
        self.requests()
            .into_iter()
            .filter_map(|r| match r {
                RecordedRequest::Generate(g) => Some(g),
                RecordedRequest::Classify(_) => None,
            })
            .collect()
    }

    pub fn classify_requests(&self) -> Vec<ClassifyRequest> {
        self.requests()
            .into_iter()
            .filter_map(|r| match r {
                RecordedRequest::Classify(c) => Some(c),
                RecordedRequest::Generate(_) => None,
            })
            .collect()
    }
}

#[cfg(test)]
#[async_trait]
impl LlmGateway for FakeGateway {
    async fn classify(&self, request: &ClassifyRequest) -> std::result::Result<Value, GatewayError> {
        self.requests
            .lock()
            .unwrap()
            .push(RecordedRequest::Classify(request.clone()));
        self.classifications
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(GatewayError::EmptyResponse))
    }

    async fn generate(&self, request: &GenerateRequest) -> std::result::Result<String, GatewayError> {
        self.requests
            .lock()
            .unwrap()
            .push(RecordedRequest::Generate(request.clone()));
        self.generations
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(GatewayError::EmptyResponse))
    }

    fn model(&self) -> &str {
        "fake-model"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fake_gateway_pops_in_order() {
        let gateway = FakeGateway::new()
            .with_generation("Hello!")
            .with_generation_error(GatewayError::EmptyResponse);
        let request = GenerateRequest {
            system: "sys".into(),
            prompt: "hi".into(),
            temperature: 0.5,
        };

        assert_eq!(gateway.generate(&request).await.unwrap(), "Hello!");
        assert!(gateway.generate(&request).await.is_err());
        assert!(gateway.generate(&request).await.is_err());
        assert_eq!(gateway.generate_requests().len(), 3);
    }

    #[test]
    fn test_registry_rejects_unknown_provider() {
        let config = ProviderConfig {
            provider: "carrier-pigeon".into(),
            ..ProviderConfig::default()
        };
        assert!(matches!(ProviderRegistry::create(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_registry_builds_known_providers() {
        for provider in ProviderRegistry::available() {
            let config = ProviderConfig {
                provider: provider.to_string(),
                model: "m".into(),
                api_key: "k".into(),
                ..ProviderConfig::default()
            };
            let gateway = ProviderRegistry::create(&config).unwrap();
            assert_eq!(gateway.model(), "m");
        }
    }
}
