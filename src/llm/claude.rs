use async_trait::async_trait;
use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{LLMError, LLMProvider};
use crate::core::config::LlmConfig;

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaudeMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaudeRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<ClaudeMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaudeContentBlock {
    #[serde(rename = "type")]
    pub content_type: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaudeResponse {
    pub id: String,
    pub content: Vec<ClaudeContentBlock>,
    pub model: String,
    #[serde(default)]
    pub stop_reason: Option<String>,
}

#[derive(Debug)]
pub struct ClaudeClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl ClaudeClient {
    pub fn new(
        base_url: String,
        api_key: String,
        model: String,
        timeout: Duration,
    ) -> Result<Self, LLMError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            api_key,
            model,
        })
    }

    /// Builds a client from configuration; `None` when no credential is set.
    pub fn from_config(config: &LlmConfig) -> Result<Option<Self>, LLMError> {
        let Some(api_key) = config.api_key.clone() else {
            return Ok(None);
        };
        Self::new(
            config.base_url.clone(),
            api_key,
            config.model.clone(),
            config.timeout,
        )
        .map(Some)
    }

    fn build_url(&self) -> String {
        format!("{}/v1/messages", self.base_url.trim_end_matches('/'))
    }

    fn build_headers(&self) -> reqwest::header::HeaderMap {
        let mut headers = reqwest::header::HeaderMap::new();

        if let Ok(val) = self.api_key.parse() {
            headers.insert("x-api-key", val);
        }
        if let Ok(val) = ANTHROPIC_VERSION.parse() {
            headers.insert("anthropic-version", val);
        }
        if let Ok(val) = "application/json".parse() {
            headers.insert(reqwest::header::CONTENT_TYPE, val);
        }

        headers
    }

    fn build_request(&self, prompt: &str, max_tokens: u32) -> ClaudeRequest {
        ClaudeRequest {
            model: self.model.clone(),
            max_tokens,
            messages: vec![ClaudeMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        }
    }

    fn extract_text_from_response(response: &ClaudeResponse) -> String {
        response
            .content
            .iter()
            .filter(|block| block.content_type == "text")
            .map(|block| block.text.as_str())
            .collect::<Vec<_>>()
            .join("")
    }
}

#[async_trait]
impl LLMProvider for ClaudeClient {
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, LLMError> {
        let url = self.build_url();
        let request = self.build_request(prompt, max_tokens);

        debug!("Claude request to {}: model={}", url, self.model);
        trace!("Claude request body: {:?}", serde_json::to_string(&request));

        let response = self
            .client
            .post(&url)
            .headers(self.build_headers())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!("Claude API error ({}): {}", status, error_text);
            return Err(format!("Claude API error ({}): {}", status, error_text).into());
        }

        let result: ClaudeResponse = response.json().await?;
        Ok(Self::extract_text_from_response(&result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> ClaudeClient {
        ClaudeClient::new(
            base_url.to_string(),
            "test-key".to_string(),
            "claude-test".to_string(),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_build_url_trims_trailing_slash() {
        assert_eq!(
            client("https://api.anthropic.com/").build_url(),
            "https://api.anthropic.com/v1/messages"
        );
    }

    #[test]
    fn test_from_config_without_key() {
        let config = LlmConfig::default();
        assert!(ClaudeClient::from_config(&config).unwrap().is_none());
    }

    #[test]
    fn test_request_serialization() {
        let request = client("http://localhost").build_request("Hello", 64);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "claude-test");
        assert_eq!(json["max_tokens"], 64);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "Hello");
    }

    #[test]
    fn test_extract_text_skips_non_text_blocks() {
        let json = r#"{
            "id": "msg_123",
            "type": "message",
            "role": "assistant",
            "content": [
                {"type": "text", "text": "{\"category\":"},
                {"type": "tool_use"},
                {"type": "text", "text": " \"billing\"}"}
            ],
            "model": "claude-test",
            "stop_reason": "end_turn"
        }"#;
        let response: ClaudeResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            ClaudeClient::extract_text_from_response(&response),
            "{\"category\": \"billing\"}"
        );
    }

    #[tokio::test]
    async fn test_generate_against_mock_server() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/messages")
            .match_header("x-api-key", "test-key")
            .match_header("anthropic-version", ANTHROPIC_VERSION)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"id":"msg_1","type":"message","role":"assistant","model":"claude-test",
                    "content":[{"type":"text","text":"{\"category\":\"account\",\"priority\":\"high\"}"}]}"#,
            )
            .create_async()
            .await;

        let text = client(&server.url()).generate("prompt", 64).await.unwrap();
        assert_eq!(text, r#"{"category":"account","priority":"high"}"#);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_generate_surfaces_http_errors() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/messages")
            .with_status(503)
            .with_body("overloaded")
            .create_async()
            .await;

        let err = client(&server.url()).generate("prompt", 64).await.unwrap_err();
        assert!(err.to_string().contains("503"));
    }
}
