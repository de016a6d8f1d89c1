//! # Settings Overlay
//!
//! Centered overlay for the LLM configuration. Opened with Ctrl+S.
//!
//! Follows the persistent state + transient wrapper pattern:
//! - `SettingsState` lives in `TuiState` while the overlay is open
//! - `Settings` is created each frame with borrowed state
//!
//! The overlay never edits the configuration itself: it emits core `Action`s,
//! so every change goes through `ConfigPanel` and stays valid.

use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Padding, Paragraph};

use crate::core::action::Action;
use crate::core::llm_config::{LlmConfig, MAX_TOKENS_RANGE, TEMPERATURE_RANGE};
use crate::tui::component::EventHandler;
use crate::tui::event::TuiEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Provider,
    Model,
    Temperature,
    MaxTokens,
}

impl Field {
    const ALL: [Field; 4] = [Field::Provider, Field::Model, Field::Temperature, Field::MaxTokens];

    fn label(self) -> &'static str {
        match self {
            Field::Provider => "Provider",
            Field::Model => "Model",
            Field::Temperature => "Temperature",
            Field::MaxTokens => "Max tokens",
        }
    }

    fn adjust(self, forward: bool) -> Action {
        let step = if forward { 1 } else { -1 };
        match self {
            Field::Provider => Action::CycleProvider { forward },
            Field::Model => Action::CycleModel { forward },
            Field::Temperature => Action::StepTemperature(step),
            Field::MaxTokens => Action::StepMaxTokens(step),
        }
    }
}

/// Events emitted by the settings overlay.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingsEvent {
    Change(Action),
    Dismiss,
}

#[derive(Debug, Default)]
pub struct SettingsState {
    pub selected: usize,
}

impl SettingsState {
    pub fn field(&self) -> Field {
        Field::ALL[self.selected.min(Field::ALL.len() - 1)]
    }
}

impl EventHandler for SettingsState {
    type Event = SettingsEvent;

    fn handle_event(&mut self, event: &TuiEvent) -> Option<Self::Event> {
        match event {
            TuiEvent::Escape | TuiEvent::Submit => Some(SettingsEvent::Dismiss),
            TuiEvent::CursorUp => {
                self.selected = self.selected.saturating_sub(1);
                None
            }
            TuiEvent::CursorDown => {
                self.selected = (self.selected + 1).min(Field::ALL.len() - 1);
                None
            }
            TuiEvent::CursorLeft => Some(SettingsEvent::Change(self.field().adjust(false))),
            TuiEvent::CursorRight => Some(SettingsEvent::Change(self.field().adjust(true))),
            _ => None,
        }
    }
}

/// Transient render wrapper for the settings overlay.
pub struct Settings<'a> {
    state: &'a SettingsState,
    config: &'a LlmConfig,
}

impl<'a> Settings<'a> {
    pub fn new(state: &'a SettingsState, config: &'a LlmConfig) -> Self {
        Self { state, config }
    }

    fn value(&self, field: Field) -> String {
        match field {
            Field::Provider => self.config.provider.to_string(),
            Field::Model => {
                let label = self
                    .config
                    .provider
                    .models()
                    .iter()
                    .find(|m| m.id == self.config.model)
                    .map(|m| m.label)
                    .unwrap_or("");
                format!("{} ({})", self.config.model, label)
            }
            Field::Temperature => format!(
                "{:.1}  [{:.1}..{:.1}]",
                self.config.temperature,
                TEMPERATURE_RANGE.start(),
                TEMPERATURE_RANGE.end()
            ),
            Field::MaxTokens => format!(
                "{}  [{}..{}]",
                self.config.max_tokens,
                MAX_TOKENS_RANGE.start(),
                MAX_TOKENS_RANGE.end()
            ),
        }
    }

    pub fn render(&mut self, frame: &mut Frame, area: Rect) {
        let overlay = centered_rect(60, 40, area);

        // Clear underlying content
        frame.render_widget(Clear, overlay);

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(" Settings ")
            .title_alignment(Alignment::Left)
            .title_bottom(Line::from(" ↑/↓ Field  ←/→ Change  Esc Close ").centered())
            .padding(Padding::horizontal(1));

        let lines: Vec<Line> = Field::ALL
            .iter()
            .enumerate()
            .map(|(i, &field)| {
                let selected = i == self.state.selected;
                let style = if selected {
                    Style::default()
                        .fg(Color::White)
                        .add_modifier(Modifier::BOLD | Modifier::REVERSED)
                } else {
                    Style::default().fg(Color::Gray)
                };
                Line::from(vec![
                    Span::styled(format!("{:<12}", field.label()), style),
                    Span::styled(
                        format!(" ‹ {} › ", self.value(field)),
                        if selected { style } else { Style::default().fg(Color::Cyan) },
                    ),
                ])
            })
            .collect();

        frame.render_widget(Paragraph::new(lines).block(block), overlay);
    }
}

/// Compute a centered rect using percentage of the outer rect.
fn centered_rect(percent_x: u16, percent_y: u16, outer: Rect) -> Rect {
    let [_, center_v, _] = Layout::vertical([
        Constraint::Percentage((100 - percent_y) / 2),
        Constraint::Percentage(percent_y),
        Constraint::Percentage((100 - percent_y) / 2),
    ])
    .areas(outer);
    let [_, center, _] = Layout::horizontal([
        Constraint::Percentage((100 - percent_x) / 2),
        Constraint::Percentage(percent_x),
        Constraint::Percentage((100 - percent_x) / 2),
    ])
    .areas(center_v);
    center
}
