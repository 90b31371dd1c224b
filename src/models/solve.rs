use serde::{ Serialize, Deserialize };

pub const DEFAULT_QUESTION: &str = "Explain clearly.";
pub const RATE_LIMITED_ANSWER: &str = "⏳ Please slow down a little 🙂";
pub const SERVER_ERROR_ANSWER: &str = "❌ Server error.";
pub const UNAVAILABLE_ANSWER: &str = "⚠️ AI unavailable.";

/// Body of every `/solve` response. `answer` is omitted when the image
/// provider produced nothing.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct SolveResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
}

impl SolveResponse {
    pub fn message(text: &str) -> Self {
        Self { answer: Some(text.to_string()) }
    }
}
