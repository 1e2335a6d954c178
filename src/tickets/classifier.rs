//! Category/priority suggestion for ticket descriptions.
//!
//! The classifier never fails outward: a missing credential, a provider
//! error, a timeout or an unparseable answer all resolve to
//! [`Classification::default`] (`general` / `medium`). Fields of a parsed
//! answer are validated one by one, so a good category survives a bad
//! priority and vice versa.

use log::{debug, error, warn};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use super::types::{Classification, TicketCategory, TicketPriority};
use crate::core::config::LlmConfig;
use crate::llm::{ClaudeClient, LLMProvider};

pub const CLASSIFY_PROMPT: &str = r#"You are a support ticket classifier for a software product.
Given a support ticket description, identify:
1. category - one of: billing, technical, account, general
2. priority - one of: low, medium, high, critical

Definitions:
billing   -> payment issues, invoices, refunds, subscription charges
technical -> bugs, crashes, errors, performance problems, integrations
account   -> login, password, permissions, profile, authentication
general   -> feature requests, general inquiries, documentation questions

low      -> minor issue, workaround exists, cosmetic problem
medium   -> affects workflow but not blocking
high     -> blocking a user from core functionality
critical -> data loss, security issue, complete service outage

Respond ONLY with a JSON object, no markdown, no explanation:
{"category": "<one of the four>", "priority": "<one of the four>"}"#;

pub struct TicketClassifier {
    provider: Option<Arc<dyn LLMProvider>>,
    max_tokens: u32,
    timeout: Duration,
}

impl TicketClassifier {
    pub fn new(provider: Option<Arc<dyn LLMProvider>>, max_tokens: u32, timeout: Duration) -> Self {
        Self {
            provider,
            max_tokens,
            timeout,
        }
    }

    /// A classifier without a provider; every call returns the fallback.
    pub fn disabled() -> Self {
        let defaults = LlmConfig::default();
        Self::new(None, defaults.max_tokens, defaults.timeout)
    }

    pub fn from_config(config: &LlmConfig) -> Self {
        let provider: Option<Arc<dyn LLMProvider>> = match ClaudeClient::from_config(config) {
            Ok(Some(client)) => Some(Arc::new(client)),
            Ok(None) => {
                warn!("LLM_API_KEY not set - skipping LLM classification");
                None
            }
            Err(e) => {
                error!("Failed to build LLM client, classification disabled: {e}");
                None
            }
        };
        Self::new(provider, config.max_tokens, config.timeout)
    }

    pub fn is_enabled(&self) -> bool {
        self.provider.is_some()
    }

    pub async fn classify(&self, description: &str) -> Classification {
        let Some(provider) = &self.provider else {
            debug!("No LLM provider configured, returning default classification");
            return Classification::default();
        };

        let prompt = build_prompt(description);
        let raw = match tokio::time::timeout(
            self.timeout,
            provider.generate(&prompt, self.max_tokens),
        )
        .await
        {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                error!("LLM classification failed: {e}");
                return Classification::default();
            }
            Err(_) => {
                error!(
                    "LLM classification timed out after {}s",
                    self.timeout.as_secs_f32()
                );
                return Classification::default();
            }
        };

        match parse_classification(&raw) {
            Ok(classification) => classification,
            Err(e) => {
                error!("LLM returned invalid JSON: {e}");
                Classification::default()
            }
        }
    }
}

pub fn build_prompt(description: &str) -> String {
    format!("{CLASSIFY_PROMPT}\n\nTicket description:\n{description}")
}

/// Removes a surrounding code fence and its language tag, if any.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(body) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match body.find("```") {
        Some(end) => &body[..end],
        None => body,
    };
    body.trim_start_matches(|c: char| c.is_ascii_alphanumeric())
        .trim()
}

/// Parses a provider answer. Only a non-object payload is an error; bad or
/// missing fields fall back individually.
pub fn parse_classification(raw: &str) -> Result<Classification, String> {
    let value: Value = serde_json::from_str(strip_code_fence(raw)).map_err(|e| e.to_string())?;
    let Some(object) = value.as_object() else {
        return Err(format!("expected a JSON object, got: {value}"));
    };

    let suggested_category = object
        .get("category")
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<TicketCategory>().ok())
        .unwrap_or_default();
    let suggested_priority = object
        .get("priority")
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<TicketPriority>().ok())
        .unwrap_or_default();

    Ok(Classification {
        suggested_category,
        suggested_priority,
    })
}
