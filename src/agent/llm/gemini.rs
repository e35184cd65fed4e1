//! Gemini gateway implementation (API key authentication).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use super::{ClassifyRequest, GatewayError, GeminiResponse, GenerateRequest, LlmGateway};
use crate::Result;

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Gemini API client using API key authentication.
#[derive(Clone)]
pub struct GeminiClient {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
}

impl GeminiClient {
    /// Create a new Gemini client with API key.
    pub fn new(api_key: &str, model: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(GatewayError::from)?;

        Ok(Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: GEMINI_API_URL.to_string(),
            client,
        })
    }

    /// Override the models endpoint; `None` keeps the default.
    pub fn with_base_url(mut self, base_url: Option<&str>) -> Self {
        if let Some(url) = base_url {
            self.base_url = url.trim_end_matches('/').to_string();
        }
        self
    }

    fn build_url(&self) -> String {
        format!("{}/{}:generateContent", self.base_url, self.model)
    }

    fn request(&self, body: &Value) -> reqwest::RequestBuilder {
        self.client
            .post(self.build_url())
            .header("x-goog-api-key", &self.api_key)
            .json(body)
    }

    fn build_body(system: &str, prompt: &str, generation_config: Value) -> Value {
        json!({
            "systemInstruction": {
                "parts": [{"text": system}]
            },
            "contents": [{
                "role": "user",
                "parts": [{"text": prompt}]
            }],
            "generationConfig": generation_config
        })
    }

    fn classify_body(request: &ClassifyRequest) -> Value {
        Self::build_body(
            &request.system,
            &request.prompt,
            json!({
                "temperature": request.temperature,
                "responseMimeType": "application/json",
                "responseSchema": request.schema
            }),
        )
    }

    fn generate_body(request: &GenerateRequest) -> Value {
        Self::build_body(
            &request.system,
            &request.prompt,
            json!({
                "temperature": request.temperature,
                "maxOutputTokens": 2048
            }),
        )
    }

    /// Concatenate the text parts of the first candidate.
    fn parse_text(response: &GeminiResponse) -> std::result::Result<String, GatewayError> {
        let candidate = response
            .candidates
            .first()
            .ok_or(GatewayError::EmptyResponse)?;

        let text: String = candidate
            .content
            .iter()
            .flat_map(|c| c.parts.iter())
            .filter_map(|p| p.text.as_deref())
            .collect();

        if let Some(usage) = &response.usage_metadata {
            debug!(
                "Gemini usage: prompt={:?} completion={:?} total={:?}",
                usage.prompt_token_count, usage.candidates_token_count, usage.total_token_count
            );
        }

        if text.trim().is_empty() {
            return Err(GatewayError::EmptyResponse);
        }
        Ok(text)
    }

    async fn send(&self, body: &Value) -> std::result::Result<GeminiResponse, GatewayError> {
        if self.api_key.is_empty() {
            return Err(GatewayError::MissingCredentials("gemini".to_string()));
        }

        let response = self.request(body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl LlmGateway for GeminiClient {
    async fn classify(&self, request: &ClassifyRequest) -> std::result::Result<Value, GatewayError> {
        let response = self.send(&Self::classify_body(request)).await?;
        let text = Self::parse_text(&response)?;
        serde_json::from_str(&text).map_err(|e| GatewayError::Malformed(e.to_string()))
    }

    async fn generate(&self, request: &GenerateRequest) -> std::result::Result<String, GatewayError> {
        let response = self.send(&Self::generate_body(request)).await?;
        Self::parse_text(&response)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(value: Value) -> GeminiResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_parse_text_joins_parts() {
        let parsed = response(json!({
            "candidates": [{
                "content": {"parts": [{"text": "Hello, "}, {"text": "world"}]},
                "finishReason": "STOP"
            }]
        }));
        assert_eq!(GeminiClient::parse_text(&parsed).unwrap(), "Hello, world");
    }

    #[test]
    fn test_parse_text_without_candidates_is_empty_response() {
        let parsed = response(json!({"candidates": []}));
        assert!(matches!(
            GeminiClient::parse_text(&parsed),
            Err(GatewayError::EmptyResponse)
        ));
    }

    #[test]
    fn test_classify_body_constrains_output() {
        let body = GeminiClient::classify_body(&ClassifyRequest {
            system: "route".into(),
            prompt: "hi".into(),
            schema: json!({"type": "object"}),
            temperature: 0.3,
        });
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["generationConfig"]["responseSchema"]["type"], "object");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "route");
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_network() {
        let client = GeminiClient::new("", "gemini-2.0-flash", Duration::from_secs(1)).unwrap();
        let request = GenerateRequest {
            system: "s".into(),
            prompt: "p".into(),
            temperature: 0.5,
        };
        assert!(matches!(
            client.generate(&request).await,
            Err(GatewayError::MissingCredentials(_))
        ));
    }

    #[test]
    fn test_api_key_travels_in_header() {
        let client = GeminiClient::new("SECRET-KEY-123", "gemini-2.0-flash", Duration::from_secs(1))
            .unwrap()
            .with_base_url(Some("http://127.0.0.1:1/v1beta/models/"));
        let request = client.request(&json!({})).build().unwrap();

        assert_eq!(
            request.url().as_str(),
            "http://127.0.0.1:1/v1beta/models/gemini-2.0-flash:generateContent"
        );
        assert_eq!(request.headers()["x-goog-api-key"], "SECRET-KEY-123");
    }

    #[tokio::test]
    async fn test_transport_error_does_not_reveal_key() {
        let client = GeminiClient::new("SECRET-KEY-123", "gemini-2.0-flash", Duration::from_secs(2))
            .unwrap()
            .with_base_url(Some("http://127.0.0.1:1/v1beta/models"));
        let request = GenerateRequest {
            system: "s".into(),
            prompt: "p".into(),
            temperature: 0.5,
        };

        let err = client.generate(&request).await.unwrap_err();
        assert!(matches!(err, GatewayError::Transport(_)));
        assert!(!err.to_string().contains("SECRET-KEY-123"));
    }
}
