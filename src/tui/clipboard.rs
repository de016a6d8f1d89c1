//! System clipboard for the terminal front end.
//!
//! Tries the native clipboard first (`arboard`, needs a display server) and
//! falls back to an OSC 52 escape, which most terminals honor even over SSH.

use std::io::Write;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use log::{debug, warn};

use crate::render::{Clipboard, ClipboardError};

pub struct SystemClipboard {
    native: Option<arboard::Clipboard>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        let native = match arboard::Clipboard::new() {
            Ok(clipboard) => Some(clipboard),
            Err(e) => {
                warn!("Native clipboard unavailable, using OSC 52: {}", e);
                None
            }
        };
        Self { native }
    }
}

impl Default for SystemClipboard {
    fn default() -> Self {
        Self::new()
    }
}

impl Clipboard for SystemClipboard {
    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        if let Some(native) = self.native.as_mut() {
            match native.set_text(text.to_owned()) {
                Ok(()) => return Ok(()),
                Err(e) => debug!("Native clipboard write failed, trying OSC 52: {}", e),
            }
        }
        let mut stdout = std::io::stdout();
        stdout
            .write_all(osc52_sequence(text).as_bytes())
            .and_then(|()| stdout.flush())
            .map_err(|e| ClipboardError::Write(e.to_string()))
    }
}

/// `ESC ] 52 ; c ; <base64> BEL`
pub fn osc52_sequence(text: &str) -> String {
    format!("\x1b]52;c;{}\x07", STANDARD.encode(text))
}
