use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Text;
use ratatui::widgets::{Block, BorderType, Padding, Paragraph, Widget, Wrap};

use crate::core::message::{Message as ChatMessage, Role};
use crate::render::ContentBlock;
use crate::tui::component::Component;
use crate::tui::markdown;

/// Horizontal padding (per side) between the border and text content.
const CONTENT_PAD_H: u16 = 1;
/// Total horizontal space consumed by borders (1 left + 1 right) and padding.
const HORIZONTAL_OVERHEAD: u16 = 2 + CONTENT_PAD_H * 2;
/// Total vertical space consumed by borders (1 top + 1 bottom).
const VERTICAL_OVERHEAD: u16 = 2;

/// A stateless component that renders one transcript message.
///
/// `Message` is a **transient component**: it's created fresh each frame with
/// the message, its already-parsed content blocks, and the presentation flags
/// owned by the parent `MessageList`.
///
/// The block is titled with the role and the local send time; the body is the
/// styled content. Selected messages (cursor mode) get a cyan border.
#[derive(Clone, Copy)]
pub struct Message<'a> {
    pub message: &'a ChatMessage,
    pub blocks: &'a [ContentBlock],
    /// Whether this message is selected in Cursor mode
    pub is_selected: bool,
    /// Code blocks (1-based) currently showing their copy acknowledgment
    pub copied: &'a [usize],
}

impl<'a> Message<'a> {
    pub fn new(
        message: &'a ChatMessage,
        blocks: &'a [ContentBlock],
        is_selected: bool,
        copied: &'a [usize],
    ) -> Self {
        Self {
            message,
            blocks,
            is_selected,
            copied,
        }
    }

    /// Height needed to show the message at `width`, borders included.
    ///
    /// Measured on the same styled text `render` draws, so wrapping matches
    /// exactly.
    pub fn calculate_height(message: &ChatMessage, blocks: &[ContentBlock], width: u16) -> u16 {
        let content_width = width.saturating_sub(HORIZONTAL_OVERHEAD);
        if content_width == 0 {
            // Degenerate case: terminal too narrow for borders + padding.
            return 1;
        }
        if blocks.is_empty() {
            return VERTICAL_OVERHEAD;
        }
        let text = body(message.role(), blocks, &[]);
        let lines = Paragraph::new(text)
            .wrap(Wrap { trim: false })
            .line_count(content_width);
        u16::try_from(lines).unwrap_or(u16::MAX).max(1).saturating_add(VERTICAL_OVERHEAD)
    }

    fn title(&self) -> String {
        let local = self.message.created_at().with_timezone(&chrono::Local);
        format!("{} · {}", self.message.role().label(), local.format("%H:%M"))
    }
}

fn role_color(role: Role) -> Color {
    match role {
        Role::User => Color::Green,
        Role::Assistant => Color::Blue,
    }
}

fn body(role: Role, blocks: &[ContentBlock], copied: &[usize]) -> Text<'static> {
    markdown::render(blocks, role_color(role), |n| copied.contains(&n))
}

impl<'a> Widget for Message<'a> {
    fn render(self, area: Rect, buf: &mut ratatui::buffer::Buffer) {
        let style = Style::default().fg(role_color(self.message.role()));

        // Selected: cyan border; otherwise dim role color
        let border_style = if self.is_selected {
            Style::default().fg(Color::Cyan)
        } else {
            style.add_modifier(Modifier::DIM)
        };

        let block = Block::bordered()
            .title(self.title())
            .border_type(BorderType::Rounded)
            .border_style(border_style)
            .title_style(border_style)
            .padding(Padding::horizontal(CONTENT_PAD_H));

        let inner_area = block.inner(area);
        block.render(area, buf);

        Paragraph::new(body(self.message.role(), self.blocks, self.copied))
            .wrap(Wrap { trim: false })
            .render(inner_area, buf);
    }
}

/// `Message` is stateless; rendering is delegated to the [`Widget`] impl.
impl<'a> Component for Message<'a> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        frame.render_widget(*self, area);
    }
}
