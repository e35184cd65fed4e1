//! OpenAI-compatible chat completions gateway (DeepSeek, OpenAI).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use super::{
    ChatCompletionResponse, ChatErrorResponse, ClassifyRequest, GatewayError, GenerateRequest,
    LlmGateway,
};
use crate::Result;

/// Default API base for a provider name.
pub fn default_base_url(provider: &str) -> &'static str {
    match provider {
        "openai" => "https://api.openai.com/v1",
        _ => "https://api.deepseek.com",
    }
}

/// Client for any endpoint speaking the chat completions protocol.
#[derive(Clone)]
pub struct OpenAiCompatClient {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
}

impl OpenAiCompatClient {
    pub fn new(api_key: &str, model: &str, base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(GatewayError::from)?;

        Ok(Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn build_body(&self, system: &str, prompt: &str, temperature: f32, json_mode: bool) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": prompt}
            ],
            "temperature": temperature
        });
        if json_mode {
            body["response_format"] = json!({"type": "json_object"});
        }
        body
    }

    /// JSON mode has no schema slot, so the schema travels in the system instruction.
    fn classify_system(request: &ClassifyRequest) -> String {
        format!(
            "{}\n\nRespond with a single JSON object that conforms to this JSON schema:\n{}",
            request.system, request.schema
        )
    }

    fn parse_content(response: ChatCompletionResponse) -> std::result::Result<String, GatewayError> {
        if let Some(usage) = &response.usage {
            debug!(
                "Chat completion usage: prompt={:?} completion={:?} total={:?}",
                usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
            );
        }

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or(GatewayError::EmptyResponse)?;
        debug!("Chat completion finished: {:?}", choice.finish_reason);

        match choice.message.content {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(GatewayError::EmptyResponse),
        }
    }

    /// Drop a surrounding markdown code fence, if the model added one.
    fn strip_code_fence(text: &str) -> &str {
        let trimmed = text.trim();
        trimmed
            .strip_prefix("```json")
            .or_else(|| trimmed.strip_prefix("```"))
            .and_then(|rest| rest.strip_suffix("```"))
            .map(str::trim)
            .unwrap_or(trimmed)
    }

    async fn send(&self, body: &Value) -> std::result::Result<ChatCompletionResponse, GatewayError> {
        if self.api_key.is_empty() {
            return Err(GatewayError::MissingCredentials(self.base_url.clone()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))
                .map_err(|_| GatewayError::MissingCredentials("invalid API key format".to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let url = format!("{}/chat/completions", self.base_url);
        let response = self.client.post(&url).headers(headers).json(body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let message = serde_json::from_str::<ChatErrorResponse>(&error_text)
                .map(|e| e.error.message)
                .unwrap_or(error_text);
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl LlmGateway for OpenAiCompatClient {
    async fn classify(&self, request: &ClassifyRequest) -> std::result::Result<Value, GatewayError> {
        let body = self.build_body(
            &Self::classify_system(request),
            &request.prompt,
            request.temperature,
            true,
        );
        let text = Self::parse_content(self.send(&body).await?)?;
        serde_json::from_str(Self::strip_code_fence(&text))
            .map_err(|e| GatewayError::Malformed(e.to_string()))
    }

    async fn generate(&self, request: &GenerateRequest) -> std::result::Result<String, GatewayError> {
        let body = self.build_body(&request.system, &request.prompt, request.temperature, false);
        Self::parse_content(self.send(&body).await?)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> OpenAiCompatClient {
        OpenAiCompatClient::new("k", "deepseek-chat", "https://api.deepseek.com/", Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn test_json_mode_only_for_classification() {
        let client = client();
        assert_eq!(client.base_url, "https://api.deepseek.com");

        let plain = client.build_body("s", "p", 0.7, false);
        assert!(plain.get("response_format").is_none());
        assert_eq!(plain["messages"][1]["content"], "p");

        let json_body = client.build_body("s", "p", 0.3, true);
        assert_eq!(json_body["response_format"]["type"], "json_object");
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(OpenAiCompatClient::strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(OpenAiCompatClient::strip_code_fence(" {\"a\":1} "), "{\"a\":1}");
    }

    #[test]
    fn test_parse_content_rejects_empty_choice() {
        let response: ChatCompletionResponse = serde_json::from_value(json!({
            "choices": [{"message": {"content": "  "}, "finish_reason": "stop"}]
        }))
        .unwrap();
        assert!(matches!(
            OpenAiCompatClient::parse_content(response),
            Err(GatewayError::EmptyResponse)
        ));
    }
}
