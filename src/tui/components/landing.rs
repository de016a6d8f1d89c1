//! # Landing Page Component
//!
//! Shown while the transcript is empty: a greeting and the canned prompt
//! suggestions. A chosen suggestion goes through the same session gate as
//! typed input.

use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Flex, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::tui::component::{Component, EventHandler};
use crate::tui::event::TuiEvent;

pub const SUGGESTIONS: [&str; 4] = [
    "What is Kubeflow?",
    "How do I install Kubeflow?",
    "Show me common issues",
    "Explain Kubeflow Trainer",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LandingEvent {
    Choose(&'static str),
}

/// Persistent selection state, lives in `TuiState`.
#[derive(Debug, Default)]
pub struct LandingState {
    pub selected: usize,
}

impl EventHandler for LandingState {
    type Event = LandingEvent;

    /// Only called while the input box is empty, so digits and Enter are free.
    fn handle_event(&mut self, event: &TuiEvent) -> Option<Self::Event> {
        match event {
            TuiEvent::CursorUp => {
                self.selected = self.selected.saturating_sub(1);
                None
            }
            TuiEvent::CursorDown => {
                self.selected = (self.selected + 1).min(SUGGESTIONS.len() - 1);
                None
            }
            TuiEvent::Submit => Some(LandingEvent::Choose(SUGGESTIONS[self.selected])),
            TuiEvent::InputChar(c) => {
                let n = c.to_digit(10)? as usize;
                let suggestion = SUGGESTIONS.get(n.checked_sub(1)?)?;
                self.selected = n - 1;
                Some(LandingEvent::Choose(suggestion))
            }
            _ => None,
        }
    }
}

pub struct LandingPage<'a> {
    state: &'a LandingState,
    /// Connection label, e.g. "connecting"
    connection: &'a str,
}

impl<'a> LandingPage<'a> {
    pub fn new(state: &'a LandingState, connection: &'a str) -> Self {
        Self { state, connection }
    }
}

impl Component for LandingPage<'_> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let mut lines = vec![
            Line::from(Span::styled(
                "Kubeflow Assistant",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                format!("kfchat v{} · {}", env!("CARGO_PKG_VERSION"), self.connection),
                Style::default().fg(Color::DarkGray),
            )),
            Line::default(),
        ];

        for (i, suggestion) in SUGGESTIONS.iter().enumerate() {
            let style = if i == self.state.selected {
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD | Modifier::REVERSED)
            } else {
                Style::default().fg(Color::Gray)
            };
            lines.push(Line::from(Span::styled(format!(" {}. {} ", i + 1, suggestion), style)));
        }

        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            "↑/↓ + Enter or 1-4 to ask · or just type",
            Style::default().fg(Color::DarkGray),
        )));

        let height = u16::try_from(lines.len()).unwrap_or(u16::MAX);
        let [centered] = Layout::vertical([Constraint::Length(height)])
            .flex(Flex::Center)
            .areas(area);

        frame.render_widget(Paragraph::new(lines).alignment(Alignment::Center), centered);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    #[test]
    fn test_arrow_selection_clamps() {
        let mut state = LandingState::default();
        state.handle_event(&TuiEvent::CursorUp);
        assert_eq!(state.selected, 0);
        for _ in 0..10 {
            state.handle_event(&TuiEvent::CursorDown);
        }
        assert_eq!(state.selected, SUGGESTIONS.len() - 1);
        assert_eq!(
            state.handle_event(&TuiEvent::Submit),
            Some(LandingEvent::Choose("Explain Kubeflow Trainer"))
        );
    }

    #[test]
    fn test_digit_chooses_suggestion() {
        let mut state = LandingState::default();
        assert_eq!(
            state.handle_event(&TuiEvent::InputChar('3')),
            Some(LandingEvent::Choose("Show me common issues"))
        );
        assert_eq!(state.selected, 2);
        assert_eq!(state.handle_event(&TuiEvent::InputChar('0')), None);
        assert_eq!(state.handle_event(&TuiEvent::InputChar('5')), None);
        assert_eq!(state.handle_event(&TuiEvent::InputChar('k')), None);
    }

    #[test]
    fn test_render_lists_suggestions() {
        let backend = TestBackend::new(60, 14);
        let mut terminal = Terminal::new(backend).unwrap();
        let state = LandingState::default();
        terminal
            .draw(|f| LandingPage::new(&state, "connected").render(f, f.area()))
            .unwrap();

        let text = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect::<String>();
        for suggestion in SUGGESTIONS {
            assert!(text.contains(suggestion), "missing {suggestion}");
        }
        assert!(text.contains("connected"));
    }
}
