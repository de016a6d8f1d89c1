//! # InputBox Component
//!
//! Multi-line text input. The title shows the LLM configuration the next
//! request will carry.
//!
//! ## Responsibilities
//!
//! - Capture text input (typing, bracketed paste, Ctrl+J newlines)
//! - Handle editing (backspace, delete, left/right, home/end)
//! - Emit `Submit` on Enter; the buffer is only cleared once the session
//!   accepts the message, so refused input stays editable
//! - Dim itself while a request is pending

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, BorderType, Padding, Paragraph};

use crate::tui::component::{Component, EventHandler};
use crate::tui::event::TuiEvent;

/// Border (2) + padding (2) consumed horizontally by the bordered block
const HORIZONTAL_OVERHEAD: u16 = 4;
/// Top + bottom borders consumed vertically
const VERTICAL_OVERHEAD: u16 = 2;
/// Maximum visible content lines before internal scrolling kicks in
const MAX_VISIBLE_LINES: u16 = 5;
/// Offset from area edge to content (border + padding)
const CONTENT_OFFSET: u16 = 2;

#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// User pressed Enter with non-blank text
    Submit(String),
    ContentChanged,
}

pub struct InputBox {
    buffer: String,
    /// Cursor position as byte offset in buffer (0..=buffer.len())
    cursor: usize,
    /// Configuration summary shown in the title (Prop)
    pub title: String,
    /// True while a request is pending (Prop)
    pub waiting: bool,
    /// True in cursor mode (Prop)
    pub dimmed: bool,
}

impl Default for InputBox {
    fn default() -> Self {
        Self::new()
    }
}

impl InputBox {
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            cursor: 0,
            title: String::new(),
            waiting: false,
            dimmed: false,
        }
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.cursor = 0;
    }

    /// Calculate required height for the current buffer, clamped to
    /// `[1, MAX_VISIBLE_LINES]` content lines plus borders.
    pub fn calculate_height(&self, width: u16) -> u16 {
        wrap_line_count(&self.buffer, inner_width(width)).min(MAX_VISIBLE_LINES) + VERTICAL_OVERHEAD
    }

    /// (line, column) of the cursor in the wrapped buffer.
    fn cursor_line_col(&self, width: u16) -> (u16, u16) {
        if width == 0 {
            return (0, 0);
        }
        let before = &self.buffer[..self.cursor];
        let line = wrap_line_count(before, width).saturating_sub(1);

        // textwrap trims trailing whitespace, so count chars of the last
        // wrapped segment of the current logical line instead.
        let logical_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
        let logical = &before[logical_start..];
        let segments = textwrap::wrap(logical, wrap_options(width));
        let in_previous: usize = segments
            .iter()
            .take(segments.len().saturating_sub(1))
            .map(|s| s.chars().count())
            .sum();
        let col = logical.chars().count().saturating_sub(in_previous);
        (line, u16::try_from(col).unwrap_or(u16::MAX).min(width))
    }
}

impl Component for InputBox {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let width = inner_width(area.width);
        let (cursor_line, cursor_col) = self.cursor_line_col(width);
        let scroll = cursor_line.saturating_sub(MAX_VISIBLE_LINES - 1);

        let (title, style) = if self.waiting {
            (
                format!(" {} · waiting for reply ", self.title),
                Style::default().fg(Color::DarkGray),
            )
        } else {
            (format!(" {} ", self.title), Style::default().fg(Color::Green))
        };
        let style = if self.dimmed {
            style.add_modifier(Modifier::DIM)
        } else {
            style
        };

        let block = Block::bordered()
            .border_type(BorderType::Rounded)
            .padding(Padding::horizontal(1))
            .title(title);

        let lines: Vec<String> = if width == 0 {
            Vec::new()
        } else {
            wrapped_lines(&self.buffer, width)
        };
        let paragraph = Paragraph::new(lines.join("\n"))
            .block(block)
            .style(style)
            .scroll((scroll, 0));
        frame.render_widget(paragraph, area);

        if !self.dimmed {
            frame.set_cursor_position((
                area.x + CONTENT_OFFSET + cursor_col,
                area.y + 1 + cursor_line - scroll,
            ));
        }
    }
}

impl EventHandler for InputBox {
    type Event = InputEvent;

    fn handle_event(&mut self, event: &TuiEvent) -> Option<Self::Event> {
        match event {
            TuiEvent::InputChar(c) => {
                self.buffer.insert(self.cursor, *c);
                self.cursor += c.len_utf8();
                Some(InputEvent::ContentChanged)
            }
            TuiEvent::Paste(text) => {
                let text = text.replace("\r\n", "\n");
                self.buffer.insert_str(self.cursor, &text);
                self.cursor += text.len();
                Some(InputEvent::ContentChanged)
            }
            TuiEvent::Backspace if self.cursor > 0 => {
                let prev = prev_char_boundary(&self.buffer, self.cursor);
                self.buffer.drain(prev..self.cursor);
                self.cursor = prev;
                Some(InputEvent::ContentChanged)
            }
            TuiEvent::Delete if self.cursor < self.buffer.len() => {
                let next = next_char_boundary(&self.buffer, self.cursor);
                self.buffer.drain(self.cursor..next);
                Some(InputEvent::ContentChanged)
            }
            TuiEvent::CursorLeft if self.cursor > 0 => {
                self.cursor = prev_char_boundary(&self.buffer, self.cursor);
                Some(InputEvent::ContentChanged)
            }
            TuiEvent::CursorRight if self.cursor < self.buffer.len() => {
                self.cursor = next_char_boundary(&self.buffer, self.cursor);
                Some(InputEvent::ContentChanged)
            }
            TuiEvent::CursorHome => {
                self.cursor = self.buffer[..self.cursor]
                    .rfind('\n')
                    .map(|i| i + 1)
                    .unwrap_or(0);
                Some(InputEvent::ContentChanged)
            }
            TuiEvent::CursorEnd => {
                self.cursor = self.buffer[self.cursor..]
                    .find('\n')
                    .map(|i| self.cursor + i)
                    .unwrap_or(self.buffer.len());
                Some(InputEvent::ContentChanged)
            }
            TuiEvent::Submit if !self.buffer.trim().is_empty() => {
                Some(InputEvent::Submit(self.buffer.clone()))
            }
            _ => None,
        }
    }
}

fn inner_width(width: u16) -> u16 {
    width.saturating_sub(HORIZONTAL_OVERHEAD)
}

fn wrap_options(width: u16) -> textwrap::Options<'static> {
    textwrap::Options::new(width as usize)
        .break_words(true)
        .word_separator(textwrap::WordSeparator::AsciiSpace)
}

fn wrapped_lines(text: &str, width: u16) -> Vec<String> {
    let mut lines: Vec<String> = textwrap::wrap(text, wrap_options(width))
        .into_iter()
        .map(|l| l.into_owned())
        .collect();
    // textwrap doesn't always produce an empty trailing line for a trailing newline
    if text.ends_with('\n') && !lines.last().is_some_and(|l| l.is_empty()) {
        lines.push(String::new());
    }
    lines
}

/// Count wrapped lines, at least 1.
fn wrap_line_count(text: &str, width: u16) -> u16 {
    if width == 0 || text.is_empty() {
        return 1;
    }
    u16::try_from(wrapped_lines(text, width).len())
        .unwrap_or(u16::MAX)
        .max(1)
}

fn prev_char_boundary(text: &str, pos: usize) -> usize {
    text[..pos]
        .char_indices()
        .next_back()
        .map(|(i, _)| i)
        .unwrap_or(0)
}

fn next_char_boundary(text: &str, pos: usize) -> usize {
    text[pos..]
        .char_indices()
        .nth(1)
        .map(|(i, _)| pos + i)
        .unwrap_or(text.len())
}
