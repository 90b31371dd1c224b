pub mod gemini;
pub mod groq;

use async_trait::async_trait;
use reqwest::StatusCode;
use std::sync::Arc;

use super::{ LlmConfig, ProviderError };
use self::gemini::GeminiChatClient;
use self::groq::GroqChatClient;
use crate::cli::ServeArgs;
use crate::models::chat::ConversationTurn;

/// Image bytes plus the MIME type the client declared for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInput {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Result of a primary text completion that did not fail at the transport level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatOutcome {
    /// Success status. `None` when the body carried no usable content.
    Completed(Option<String>),
    /// Non-success status from the provider.
    Rejected(StatusCode),
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn chat(
        &self,
        messages: &[ConversationTurn],
        temperature: f32
    ) -> Result<ChatOutcome, ProviderError>;
}

#[async_trait]
pub trait VisionClient: Send + Sync {
    /// All text parts of the first candidate, or `None` when the provider returned none.
    async fn describe(
        &self,
        image: &ImageInput,
        question: &str
    ) -> Result<Option<String>, ProviderError>;
}

#[async_trait]
pub trait FallbackClient: Send + Sync {
    /// Text of the first candidate's first part, without any conversation context.
    async fn ask(&self, question: &str) -> Result<Option<String>, ProviderError>;
}

#[derive(Clone)]
pub struct ProviderSet {
    pub vision: Arc<dyn VisionClient>,
    pub chat: Arc<dyn ChatClient>,
    pub fallback: Arc<dyn FallbackClient>,
}

fn non_empty(value: &str) -> Option<String> {
    Some(value.to_string()).filter(|v| !v.is_empty())
}

pub fn new_providers(args: &ServeArgs) -> Result<ProviderSet, ProviderError> {
    let groq_config = LlmConfig {
        api_key: non_empty(&args.groq_api_key),
        completion_model: non_empty(&args.groq_model),
        base_url: non_empty(&args.groq_base_url),
    };
    let gemini_config = LlmConfig {
        api_key: non_empty(&args.gemini_api_key),
        completion_model: non_empty(&args.gemini_model),
        base_url: non_empty(&args.gemini_base_url),
    };

    let chat = Arc::new(GroqChatClient::from_config(&groq_config)?);
    let gemini = Arc::new(GeminiChatClient::from_config(&gemini_config)?);

    Ok(ProviderSet {
        vision: Arc::clone(&gemini) as Arc<dyn VisionClient>,
        chat,
        fallback: gemini,
    })
}
