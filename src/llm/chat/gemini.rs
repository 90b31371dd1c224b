use async_trait::async_trait;
use base64::{ engine::general_purpose::STANDARD, Engine };
use log::{ info, warn };
use reqwest::Client as HttpClient;
use serde::{ Deserialize, Serialize };

use super::{ FallbackClient, ImageInput, VisionClient };
use crate::llm::{ LlmConfig, ProviderError };

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    role: &'static str,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum GeminiPart<'a> {
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
    Text {
        text: &'a str,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Deserialize, Default)]
struct GoogleResponse {
    #[serde(default)]
    candidates: Option<Vec<GoogleCandidate>>,
}

#[derive(Deserialize)]
struct GoogleCandidate {
    #[serde(default)]
    content: Option<GoogleContent>,
}

#[derive(Deserialize)]
struct GoogleContent {
    #[serde(default)]
    parts: Option<Vec<GooglePart>>,
}

#[derive(Deserialize)]
struct GooglePart {
    #[serde(default)]
    text: Option<String>,
}

impl GoogleResponse {
    fn first_parts(self) -> Option<Vec<GooglePart>> {
        self.candidates?.into_iter().next()?.content?.parts
    }

    /// Every text part of the first candidate joined by blank lines.
    fn joined_text(self) -> Option<String> {
        let parts = self.first_parts()?;
        let texts: Vec<String> = parts.into_iter().filter_map(|p| p.text).collect();
        Some(texts.join("\n\n"))
    }

    fn first_text(self) -> Option<String> {
        self.first_parts()?
            .into_iter()
            .next()?
            .text
            .filter(|t| !t.is_empty())
    }
}

/// Gemini `generateContent` client. Serves both as the image-capable provider
/// and as the text-only fallback.
pub struct GeminiChatClient {
    http: HttpClient,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiChatClient {
    pub fn new(
        api_key: String,
        model: Option<String>,
        base_url: Option<String>
    ) -> Result<Self, ProviderError> {
        let chat_model = model.unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string());
        let api_url = base_url.unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string());
        let http = HttpClient::builder().build()?;

        Ok(Self {
            http,
            api_key,
            model: chat_model,
            base_url: api_url,
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, ProviderError> {
        let api_key = config.api_key.clone().unwrap_or_else(|| {
            warn!("Gemini API key is not set; image and fallback requests will fail");
            String::new()
        });

        Self::new(api_key, config.completion_model.clone(), config.base_url.clone())
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    /// Non-success statuses are only logged. Their error bodies decode into an
    /// empty response, i.e. "no answer".
    async fn generate(&self, parts: Vec<GeminiPart<'_>>) -> Result<GoogleResponse, ProviderError> {
        let payload = GenerateRequest {
            contents: vec![GeminiContent { role: "user", parts }],
        };

        let resp = self.http
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&payload)
            .send().await?;

        if !resp.status().is_success() {
            warn!("Gemini responded with {}", resp.status());
        }

        let body = resp.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl VisionClient for GeminiChatClient {
    async fn describe(
        &self,
        image: &ImageInput,
        question: &str
    ) -> Result<Option<String>, ProviderError> {
        info!(
            "GeminiChatClient::describe() → model={} mime={} bytes={}",
            self.model,
            image.mime_type,
            image.bytes.len()
        );
        let parts = vec![
            GeminiPart::InlineData {
                inline_data: InlineData {
                    mime_type: &image.mime_type,
                    data: STANDARD.encode(&image.bytes),
                },
            },
            GeminiPart::Text { text: question }
        ];
        Ok(self.generate(parts).await?.joined_text())
    }
}

#[async_trait]
impl FallbackClient for GeminiChatClient {
    async fn ask(&self, question: &str) -> Result<Option<String>, ProviderError> {
        info!("GeminiChatClient::ask() → model={}", self.model);
        let parts = vec![GeminiPart::Text { text: question }];
        Ok(self.generate(parts).await?.first_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> GoogleResponse {
        serde_json::from_str(raw).unwrap()
    }

    const TWO_PARTS: &str =
        r#"{"candidates":[{"content":{"parts":[{"text":"first"},{"text":"second"}],"role":"model"}}]}"#;

    #[test]
    fn test_joined_text_uses_every_part() {
        assert_eq!(parse(TWO_PARTS).joined_text().as_deref(), Some("first\n\nsecond"));
    }

    #[test]
    fn test_first_text_uses_first_part_only() {
        assert_eq!(parse(TWO_PARTS).first_text().as_deref(), Some("first"));
    }

    #[test]
    fn test_error_body_is_no_answer() {
        let raw = r#"{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(parse(raw).joined_text(), None);
        assert_eq!(parse(raw).first_text(), None);
    }

    #[test]
    fn test_empty_first_text_is_no_answer() {
        let raw = r#"{"candidates":[{"content":{"parts":[{"text":""}]}}]}"#;
        assert_eq!(parse(raw).first_text(), None);
        assert_eq!(parse(r#"{"candidates":[{}]}"#).first_text(), None);
    }

    #[test]
    fn test_request_wire_shape() {
        let payload = GenerateRequest {
            contents: vec![GeminiContent {
                role: "user",
                parts: vec![
                    GeminiPart::InlineData {
                        inline_data: InlineData { mime_type: "image/png", data: STANDARD.encode(b"png") },
                    },
                    GeminiPart::Text { text: "what is this?" }
                ],
            }],
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "contents": [{
                    "role": "user",
                    "parts": [
                        { "inlineData": { "mimeType": "image/png", "data": "cG5n" } },
                        { "text": "what is this?" }
                    ]
                }]
            })
        );
    }
}
