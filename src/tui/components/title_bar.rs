//! # TitleBar Component
//!
//! Top status bar: app name, provider/model, connection state, and either the
//! status message or the failure banner.
//!
//! ## Conditional Formatting
//!
//! 1. **Degraded**: `"kfchat | Meta / llama-3.3 | failed | connection failure: … (Ctrl+N to reconnect)"`
//!    in red, replacing the status message
//! 2. **Status message**: `"kfchat | Meta / llama-3.3 | connected | Ready"`
//! 3. **Unseen content**: `" | ↓ New"` appended to either of the above
//!
//! TitleBar is purely presentational: all data arrives as props.

use crate::connection::ConnectionState;
use crate::tui::component::Component;
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

pub struct TitleBar {
    /// `"Provider / model"`
    pub model_label: String,
    pub connection: ConnectionState,
    pub status_message: String,
    /// Failure text shown instead of the status while the session is degraded.
    pub banner: Option<String>,
    /// Whether there's content below the current scroll position
    pub has_unseen_content: bool,
}

impl TitleBar {
    pub fn new(
        model_label: String,
        connection: ConnectionState,
        status_message: String,
        banner: Option<String>,
        has_unseen_content: bool,
    ) -> Self {
        Self {
            model_label,
            connection,
            status_message,
            banner,
            has_unseen_content,
        }
    }

    fn connection_style(&self) -> Style {
        match self.connection {
            ConnectionState::Open => Style::default().fg(Color::Green),
            ConnectionState::Connecting => Style::default().fg(Color::Yellow),
            ConnectionState::Closed | ConnectionState::Failed => Style::default().fg(Color::Red),
        }
    }
}

impl Component for TitleBar {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let separator = Span::styled(" | ", Style::default().fg(Color::DarkGray));
        let mut spans = vec![
            Span::styled("kfchat", Style::default().add_modifier(Modifier::BOLD)),
            separator.clone(),
            Span::raw(self.model_label.clone()),
            separator.clone(),
            Span::styled(self.connection.label(), self.connection_style()),
        ];

        if let Some(banner) = &self.banner {
            spans.push(separator.clone());
            spans.push(Span::styled(
                banner.clone(),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ));
        } else if !self.status_message.is_empty() {
            spans.push(separator.clone());
            spans.push(Span::raw(self.status_message.clone()));
        }

        if self.has_unseen_content {
            spans.push(separator);
            spans.push(Span::styled("↓ New", Style::default().fg(Color::Cyan)));
        }

        frame.render_widget(Line::from(spans), area);
    }
}
