//! # Application State
//!
//! Core business state for kfchat. This module contains domain logic only -
//! no TUI-specific types. Presentation state lives in the `tui` module.
//!
//! ```text
//! App
//! ├── session: SessionStore        // transcript, gate, connection
//! ├── panel: ConfigPanel           // live LLM configuration
//! └── status_message: String       // status bar text
//! ```
//!
//! State changes only happen through `update(state, action)` in action.rs.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;

use crate::connection::manager::ConnectionManager;
use crate::connection::transport::ConnectionEvent;
use crate::connection::websocket::WebSocketTransport;
use crate::core::config::ResolvedConfig;
use crate::core::llm_config::ConfigPanel;
use crate::core::session::{SessionHealth, SessionStore};

pub struct App {
    pub session: SessionStore,
    pub panel: ConfigPanel,
    pub status_message: String,
}

impl App {
    pub fn new(session: SessionStore, panel: ConfigPanel) -> Self {
        Self {
            session,
            panel,
            status_message: String::from("Welcome to kfchat!"),
        }
    }

    /// App talking WebSocket to the configured server. Connection events are
    /// delivered on `events`; nothing connects until `start()`.
    pub fn from_config(config: &ResolvedConfig, events: UnboundedSender<ConnectionEvent>) -> Self {
        let transport = Arc::new(WebSocketTransport::new(config.connect_timeout));
        let connection = ConnectionManager::new(transport, config.server_url.clone(), events);
        Self::new(
            SessionStore::new(connection, config.reply_timeout),
            ConfigPanel::new(config.llm.clone()),
        )
    }

    pub fn start(&mut self) {
        self.status_message = format!("Connecting to {}…", self.session.connection().url());
        self.session.start();
    }

    /// Failure text to show while the session is degraded.
    pub fn banner(&self) -> Option<String> {
        match self.session.health() {
            SessionHealth::Healthy => None,
            SessionHealth::Degraded(err) => Some(format!("{} (Ctrl+N to reconnect)", err)),
        }
    }

    pub fn has_messages(&self) -> bool {
        !self.session.transcript().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::test_app;

    #[test]
    fn test_app_new_defaults() {
        let app = test_app();
        assert_eq!(app.status_message, "Welcome to kfchat!");
        assert!(!app.session.is_pending());
        assert!(!app.has_messages());
        assert_eq!(app.banner(), None);
        assert_eq!(app.panel.config().model, "llama-3.3");
    }
}
