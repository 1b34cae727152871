//! System clipboard access

use async_trait::async_trait;
use tokio::task::spawn_blocking;

use crate::error::{ClientError, ClientResult};

/// Destination of the copy action
#[async_trait]
pub trait Clipboard: Send + Sync {
    async fn write_text(&self, text: &str) -> ClientResult<()>;
}

/// The desktop clipboard
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClipboard;

#[async_trait]
impl Clipboard for SystemClipboard {
    async fn write_text(&self, text: &str) -> ClientResult<()> {
        let text = text.to_string();

        // Platform clipboards block; keep them off the event loop.
        spawn_blocking(move || {
            let mut clipboard = arboard::Clipboard::new()?;
            clipboard.set_text(text)
        })
        .await
        .map_err(|e| ClientError::Clipboard(e.to_string()))?
        .map_err(|e| ClientError::Clipboard(e.to_string()))
    }
}
