use async_trait::async_trait;

pub mod claude;

pub use claude::ClaudeClient;

pub type LLMError = Box<dyn std::error::Error + Send + Sync>;

/// A remote text-generation capability. One prompt in, one completion out.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, LLMError>;
}
