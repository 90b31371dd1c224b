use log::{ info, warn };
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::error::BrokerError;
use crate::history::ConversationBuffer;
use crate::llm::chat::{ ChatClient, ChatOutcome, FallbackClient, ImageInput, ProviderSet, VisionClient };
use crate::llm::with_timeout;
use crate::models::chat::ConversationTurn;

pub const DEFAULT_TEMPERATURE: f32 = 0.3;
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(30);

/// Routes a question to exactly one answering provider.
///
/// Priority: image provider when an image is attached (no fallback), then the
/// primary text provider with the conversation window, then the text-only
/// fallback with just the question.
#[derive(Clone)]
pub struct Broker {
    vision: Arc<dyn VisionClient>,
    chat: Arc<dyn ChatClient>,
    fallback: Arc<dyn FallbackClient>,
    temperature: f32,
    timeout: Duration,
}

impl Broker {
    pub fn new(providers: ProviderSet, temperature: f32, timeout: Duration) -> Self {
        Self {
            vision: providers.vision,
            chat: providers.chat,
            fallback: providers.fallback,
            temperature,
            timeout,
        }
    }

    /// `Ok(None)` only happens on the image path, when the provider had nothing to say.
    pub async fn solve(
        &self,
        conversation: &Mutex<ConversationBuffer>,
        question: &str,
        image: Option<&ImageInput>
    ) -> Result<Option<String>, BrokerError> {
        if let Some(image) = image {
            info!("Routing image question to vision provider");
            let answer = with_timeout(self.timeout, self.vision.describe(image, question)).await?;
            return Ok(answer);
        }

        {
            let mut buffer = conversation.lock().await;
            buffer.append(ConversationTurn::user(question));
            let context = buffer.snapshot();

            info!("Routing text question to primary provider ({} turns of context)", context.len());
            let outcome = with_timeout(
                self.timeout,
                self.chat.chat(&context, self.temperature)
            ).await?;

            match outcome {
                ChatOutcome::Completed(Some(answer)) => {
                    buffer.append(ConversationTurn::assistant(answer.clone()));
                    return Ok(Some(answer));
                }
                ChatOutcome::Completed(None) => {
                    warn!("Primary provider returned no content; using fallback");
                }
                ChatOutcome::Rejected(status) => {
                    warn!("Primary provider rejected the request ({}); using fallback", status);
                }
            }
        }

        match with_timeout(self.timeout, self.fallback.ask(question)).await? {
            Some(answer) => Ok(Some(answer)),
            None => Err(BrokerError::ProviderUnavailable),
        }
    }
}
