use async_trait::async_trait;
use log::{ info, warn };
use reqwest::{ Client as HttpClient, header::{ HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION } };
use serde::{ Deserialize, Serialize };

use super::{ ChatClient, ChatOutcome };
use crate::llm::{ LlmConfig, ProviderError };
use crate::models::chat::ConversationTurn;

pub const DEFAULT_GROQ_MODEL: &str = "llama-3.1-8b-instant";
pub const DEFAULT_GROQ_BASE_URL: &str = "https://api.groq.com";
const COMPLETIONS_ROUTE: &str = "/openai/v1/chat/completions";

pub struct GroqChatClient {
    http: HttpClient,
    model: String,
    base_url: String,
}

#[derive(Serialize)]
struct GroqRequest<'a> {
    model: &'a str,
    messages: &'a [ConversationTurn],
    temperature: f32,
}

#[derive(Deserialize, Default)]
struct GroqResponse {
    #[serde(default)]
    choices: Option<Vec<GroqChoice>>,
}

#[derive(Deserialize)]
struct GroqChoice {
    #[serde(default)]
    message: Option<GroqMessage>,
}

#[derive(Deserialize)]
struct GroqMessage {
    #[serde(default)]
    content: Option<String>,
}

impl GroqResponse {
    fn first_content(self) -> Option<String> {
        self.choices?
            .into_iter()
            .next()?
            .message?
            .content
            .filter(|c| !c.is_empty())
    }
}

impl GroqChatClient {
    pub fn new(
        api_key: String,
        model: Option<String>,
        base_url: Option<String>
    ) -> Result<Self, ProviderError> {
        let chat_model = model.unwrap_or_else(|| DEFAULT_GROQ_MODEL.to_string());
        let api_url = base_url.unwrap_or_else(|| DEFAULT_GROQ_BASE_URL.to_string());

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key)).map_err(|e|
                ProviderError::Config(format!("Invalid Groq API key format: {}", e))
            )?
        );

        let http = HttpClient::builder().default_headers(headers).build()?;

        Ok(Self {
            http,
            model: chat_model,
            base_url: api_url,
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, ProviderError> {
        let api_key = config.api_key.clone().unwrap_or_else(|| {
            warn!("Groq API key is not set; text requests will use the fallback provider");
            String::new()
        });

        Self::new(api_key, config.completion_model.clone(), config.base_url.clone())
    }
}

#[async_trait]
impl ChatClient for GroqChatClient {
    async fn chat(
        &self,
        messages: &[ConversationTurn],
        temperature: f32
    ) -> Result<ChatOutcome, ProviderError> {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), COMPLETIONS_ROUTE);
        let req = GroqRequest {
            model: &self.model,
            messages,
            temperature,
        };

        info!("GroqChatClient::chat() → model={} turns={}", self.model, messages.len());
        let resp = self.http.post(&url).json(&req).send().await?;

        let status = resp.status();
        if !status.is_success() {
            warn!("Groq responded with {}", status);
            return Ok(ChatOutcome::Rejected(status));
        }

        let body = resp.bytes().await?;
        let parsed: GroqResponse = serde_json::from_slice(&body)?;
        Ok(ChatOutcome::Completed(parsed.first_content()))
    }
}
