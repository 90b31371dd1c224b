pub mod chat;

use std::future::Future;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Default)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub completion_model: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider call timed out after {0:?}")]
    Timeout(Duration),
    #[error("malformed provider response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid provider configuration: {0}")]
    Config(String),
}

/// Bounds a provider call. Elapsed calls surface as [`ProviderError::Timeout`].
pub async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T, ProviderError>
    where F: Future<Output = Result<T, ProviderError>>
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout(limit)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_with_timeout_elapses() {
        let limit = Duration::from_secs(5);
        let result: Result<(), _> = with_timeout(limit, std::future::pending()).await;
        assert!(matches!(result, Err(ProviderError::Timeout(d)) if d == limit));
    }

    #[tokio::test]
    async fn test_with_timeout_passes_result_through() {
        let result = with_timeout(Duration::from_secs(1), async { Ok::<_, ProviderError>(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }
}
