use thiserror::Error;

use crate::llm::ProviderError;
use crate::models::solve::{ RATE_LIMITED_ANSWER, SERVER_ERROR_ANSWER, UNAVAILABLE_ANSWER };
use crate::server::upload::UploadError;

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("request arrived before the minimum interval elapsed")]
    RateLimited,
    #[error("neither the primary nor the fallback provider produced an answer")]
    ProviderUnavailable,
    #[error(transparent)]
    Transport(#[from] ProviderError),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error("unexpected failure: {0}")]
    Unknown(String),
}

impl BrokerError {
    /// The only text a client ever sees for this failure.
    pub fn user_message(&self) -> &'static str {
        match self {
            BrokerError::RateLimited => RATE_LIMITED_ANSWER,
            BrokerError::ProviderUnavailable => UNAVAILABLE_ANSWER,
            BrokerError::Transport(_) | BrokerError::Upload(_) | BrokerError::Unknown(_) =>
                SERVER_ERROR_ANSWER,
        }
    }
}
