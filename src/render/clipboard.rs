use std::sync::atomic::{ AtomicBool, AtomicU64, Ordering };
use std::sync::Arc;
use std::time::Duration;
use log::{ debug, warn };
use thiserror::Error;

use super::enhance;

pub const COPY_LABEL: &str = "Copy Code";
pub const COPIED_LABEL: &str = "Copied!";
/// How long a button shows [`COPIED_LABEL`] before reverting.
pub const ACK_DURATION: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("Clipboard unavailable: {0}")]
    Unavailable(String),
}

pub trait Clipboard: Send + Sync {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError>;
}

/// The desktop clipboard.
#[derive(Debug, Default)]
pub struct SystemClipboard;

impl Clipboard for SystemClipboard {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        let mut clipboard = arboard::Clipboard::new().map_err(|e| {
            ClipboardError::Unavailable(e.to_string())
        })?;
        clipboard.set_text(text.to_string()).map_err(|e| ClipboardError::Unavailable(e.to_string()))
    }
}

/// One copy control bound to the text of a code block.
#[derive(Debug, Clone)]
pub struct CopyButton {
    code: String,
    copied: Arc<AtomicBool>,
    generation: Arc<AtomicU64>,
}

impl CopyButton {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            copied: Arc::new(AtomicBool::new(false)),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn label(&self) -> &'static str {
        if self.copied.load(Ordering::SeqCst) { COPIED_LABEL } else { COPY_LABEL }
    }

    /// Writes the block's text to the clipboard and flips the label to
    /// [`COPIED_LABEL`] for [`ACK_DURATION`]. A second click restarts the
    /// window. Must be called inside a tokio runtime.
    pub fn click(&self, clipboard: &dyn Clipboard) -> Result<(), ClipboardError> {
        if let Err(e) = clipboard.write_text(&self.code) {
            warn!("Copy failed: {}", e);
            return Err(e);
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.copied.store(true, Ordering::SeqCst);
        debug!("Copied {} bytes of code", self.code.len());

        let copied = Arc::clone(&self.copied);
        let current = Arc::clone(&self.generation);
        tokio::spawn(async move {
            tokio::time::sleep(ACK_DURATION).await;
            if current.load(Ordering::SeqCst) == generation {
                copied.store(false, Ordering::SeqCst);
            }
        });
        Ok(())
    }
}

/// Buttons for every code block in an enhanced render, in document order.
pub fn copy_buttons(html: &str) -> Vec<CopyButton> {
    enhance::code_blocks(html).into_iter().map(CopyButton::new).collect()
}
