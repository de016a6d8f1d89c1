//! Copy-to-clipboard for code blocks.

use std::time::{Duration, Instant};

use log::info;
use thiserror::Error;

use crate::render::CodeBlock;

/// How long the "Copied!" acknowledgment stays visible.
pub const COPY_ACK_DURATION: Duration = Duration::from_millis(2000);

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("clipboard unavailable: {0}")]
    Unavailable(String),
    #[error("clipboard write failed: {0}")]
    Write(String),
}

/// Somewhere text can be copied to.
pub trait Clipboard {
    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError>;
}

/// Transient acknowledgment of one successful copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyAck {
    copied_at: Instant,
}

impl CopyAck {
    pub fn at(copied_at: Instant) -> Self {
        Self { copied_at }
    }

    pub fn expires_at(&self) -> Instant {
        self.copied_at + COPY_ACK_DURATION
    }

    pub fn is_active_at(&self, now: Instant) -> bool {
        now < self.expires_at()
    }
}

impl CodeBlock {
    /// Copy the code to `clipboard`. The returned ack reverts after
    /// [`COPY_ACK_DURATION`].
    pub fn copy_to_clipboard(&self, clipboard: &mut dyn Clipboard) -> Result<CopyAck, ClipboardError> {
        clipboard.set_text(&self.code)?;
        info!("Copied {} block ({} bytes)", self.language, self.code.len());
        Ok(CopyAck::at(Instant::now()))
    }
}
