//! # MessageList Component
//!
//! Scrollable view of the transcript.
//!
//! ## Responsibilities
//!
//! - Display the messages of the current session
//! - Manage scrolling (stick-to-bottom, page up/down, mouse wheel)
//! - Cache parsed content blocks and message heights
//! - Show the pending indicator below the last message
//!
//! ## Architecture
//!
//! `MessageList` is a transient component (created each frame) that wraps
//! `&'a mut MessageListState` (persistent state) and the transcript (props).
//!
//! Transcript messages never change once appended, so both caches only grow;
//! a width change re-measures everything and a new session starts from a
//! fresh `MessageListState`.

use ratatui::Frame;
use ratatui::layout::{Position, Rect, Size};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use tui_scrollview::{ScrollView, ScrollViewState, ScrollbarVisibility};

use crate::core::message::Message as ChatMessage;
use crate::render::{ContentBlock, render_all};
use crate::tui::component::{Component, EventHandler};
use crate::tui::components::message::Message;
use crate::tui::event::TuiEvent;

const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
/// Rows reserved under the last message for the pending indicator.
const SPINNER_ROWS: u16 = 2;

/// Layout and scroll state for the message list.
/// Must be persisted in the parent TuiState.
pub struct MessageListState {
    /// Scroll offset and view state
    pub scroll_state: ScrollViewState,
    /// Cached layout measurements
    pub layout: LayoutCache,
    /// When true, auto-scroll to bottom on new content
    pub stick_to_bottom: bool,
    /// Currently selected message index (keyboard navigation)
    pub selected_index: Option<usize>,
    /// Last known viewport height (for scroll clamping between frames)
    pub viewport_height: u16,
    /// Whether content exists below the viewport
    pub has_unseen_content: bool,
}

impl Default for MessageListState {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageListState {
    pub fn new() -> Self {
        Self {
            scroll_state: ScrollViewState::default(),
            layout: LayoutCache::new(),
            stick_to_bottom: true, // Start attached to bottom
            selected_index: None,
            viewport_height: 0,
            has_unseen_content: false,
        }
    }

    fn max_offset(&self) -> u16 {
        self.layout.total_height().saturating_sub(self.viewport_height)
    }

    /// Clamp scroll offset so it never exceeds the content bounds.
    pub fn clamp_scroll(&mut self) {
        let max_y = self.max_offset();
        let current = self.scroll_state.offset();
        if current.y > max_y {
            self.scroll_state.set_offset(Position { x: current.x, y: max_y });
        }
    }

    /// Scroll the viewport so the selected message is fully visible.
    /// If the message is taller than the viewport, align its top edge.
    pub fn scroll_to_selected(&mut self) {
        let Some(idx) = self.selected_index else {
            return;
        };
        let Some(&item_bottom) = self.layout.prefix_heights.get(idx) else {
            return;
        };
        let item_top = if idx == 0 {
            0
        } else {
            self.layout.prefix_heights[idx - 1]
        };
        let offset_y = self.scroll_state.offset().y;

        if item_top < offset_y {
            self.scroll_state.set_offset(Position { x: 0, y: item_top });
            self.stick_to_bottom = false;
        } else if item_bottom > offset_y + self.viewport_height {
            let new_y = item_bottom.saturating_sub(self.viewport_height);
            self.scroll_state.set_offset(Position { x: 0, y: new_y });
            self.stick_to_bottom = new_y >= self.max_offset();
        }
    }

    /// Clamp scroll and re-engage auto-scroll if the user has reached the bottom.
    pub fn repin_if_at_bottom(&mut self) {
        let max_y = self.max_offset();
        let current = self.scroll_state.offset();
        if current.y >= max_y {
            self.stick_to_bottom = true;
            self.scroll_state.set_offset(Position { x: current.x, y: max_y });
        }
    }

    /// Select the previous message (or the last one when nothing is selected).
    pub fn select_prev(&mut self, count: usize) {
        if count == 0 {
            return;
        }
        self.selected_index = Some(
            self.selected_index
                .map(|i| i.saturating_sub(1))
                .unwrap_or(count - 1),
        );
        self.scroll_to_selected();
    }

    pub fn select_next(&mut self, count: usize) {
        if let Some(idx) = self.selected_index
            && idx + 1 < count
        {
            self.selected_index = Some(idx + 1);
            self.scroll_to_selected();
        }
    }

    /// Parsed blocks of message `idx`, if it has been laid out.
    pub fn blocks(&self, idx: usize) -> Option<&[ContentBlock]> {
        self.layout.blocks.get(idx).map(Vec::as_slice)
    }
}

/// Scrollable conversation view component.
/// Created fresh each frame with references to state and data.
pub struct MessageList<'a> {
    pub state: &'a mut MessageListState,
    pub messages: &'a [ChatMessage],
    /// Copy acknowledgments to show, as (message index, code block number)
    pub copied: &'a [(usize, usize)],
    pub is_pending: bool,
    pub spinner_frame: usize,
}

impl<'a> MessageList<'a> {
    pub fn new(
        state: &'a mut MessageListState,
        messages: &'a [ChatMessage],
        copied: &'a [(usize, usize)],
        is_pending: bool,
        spinner_frame: usize,
    ) -> Self {
        Self {
            state,
            messages,
            copied,
            is_pending,
            spinner_frame,
        }
    }
}

impl<'a> Component for MessageList<'a> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let content_width = area.width.saturating_sub(1); // -1 for scrollbar safe area

        // 1. Update caches
        self.state.layout.update(self.messages, content_width);
        let total_height = self.state.layout.total_height();

        let spinner_rows = if self.is_pending { SPINNER_ROWS } else { 0 };
        let canvas_height = total_height.saturating_add(spinner_rows);

        // 2. Clamp scroll offset to prevent overscrolling past content
        self.state.viewport_height = area.height;
        if !self.state.stick_to_bottom {
            self.state.clamp_scroll();
        }

        let scroll_offset = self.state.scroll_state.offset().y;
        let visible_range = self.state.layout.visible_range(scroll_offset, area.height);

        // 3. Render visible messages into a ScrollView
        let mut scroll_view = ScrollView::new(Size::new(content_width, canvas_height))
            .vertical_scrollbar_visibility(ScrollbarVisibility::Always)
            .horizontal_scrollbar_visibility(ScrollbarVisibility::Never);

        let mut y_offset: u16 = if visible_range.start > 0 {
            self.state.layout.prefix_heights[visible_range.start - 1]
        } else {
            0
        };

        for i in visible_range {
            let height = self.state.layout.heights[i];
            let copied: Vec<usize> = self
                .copied
                .iter()
                .filter(|(msg, _)| *msg == i)
                .map(|(_, block)| *block)
                .collect();
            let message = Message::new(
                &self.messages[i],
                &self.state.layout.blocks[i],
                self.state.selected_index == Some(i),
                &copied,
            );
            scroll_view.render_widget(message, Rect::new(0, y_offset, content_width, height));
            y_offset += height;
        }

        if self.is_pending {
            let glyph = SPINNER[self.spinner_frame % SPINNER.len()];
            let line = Line::from(vec![
                Span::styled(format!(" {glyph} "), Style::default().fg(Color::Cyan)),
                Span::styled(
                    "Waiting for the assistant…",
                    Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
                ),
            ]);
            scroll_view.render_widget(line, Rect::new(0, total_height, content_width, 1));
        }

        if self.state.stick_to_bottom {
            self.state.scroll_state.scroll_to_bottom();
        }

        frame.render_stateful_widget(scroll_view, area, &mut self.state.scroll_state);

        let current_offset = self.state.scroll_state.offset().y;
        self.state.has_unseen_content = !self.state.stick_to_bottom
            && current_offset < canvas_height.saturating_sub(area.height);
    }
}

impl EventHandler for MessageListState {
    type Event = ();

    fn handle_event(&mut self, event: &TuiEvent) -> Option<Self::Event> {
        match event {
            TuiEvent::ScrollUp => {
                self.scroll_state.scroll_up();
                self.stick_to_bottom = false;
            }
            TuiEvent::ScrollDown => {
                self.scroll_state.scroll_down();
                self.repin_if_at_bottom();
            }
            TuiEvent::ScrollPageUp => {
                self.scroll_state.scroll_page_up();
                self.stick_to_bottom = false;
            }
            TuiEvent::ScrollPageDown => {
                self.scroll_state.scroll_page_down();
                self.repin_if_at_bottom();
            }
            _ => {}
        }
        None
    }
}

/// Parsed blocks and measured heights, one entry per message.
pub struct LayoutCache {
    pub blocks: Vec<Vec<ContentBlock>>,
    pub heights: Vec<u16>,
    pub prefix_heights: Vec<u16>,
    content_width: u16,
}

impl Default for LayoutCache {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutCache {
    pub fn new() -> Self {
        Self {
            blocks: Vec::new(),
            heights: Vec::new(),
            prefix_heights: Vec::new(),
            content_width: 0,
        }
    }

    /// How many cached heights are still valid for `message_count` messages at `content_width`.
    pub fn reusable_count(&self, message_count: usize, content_width: u16) -> usize {
        if self.content_width != content_width || message_count < self.heights.len() {
            return 0;
        }
        self.heights.len()
    }

    /// Parse and measure whatever is new since the last frame.
    pub fn update(&mut self, messages: &[ChatMessage], content_width: u16) {
        if messages.len() < self.blocks.len() {
            self.blocks.clear();
        }
        for message in messages.iter().skip(self.blocks.len()) {
            self.blocks.push(render_all(message.content()));
        }

        let reusable = self.reusable_count(messages.len(), content_width);
        self.heights.truncate(reusable);
        for (i, message) in messages.iter().enumerate().skip(reusable) {
            self.heights
                .push(Message::calculate_height(message, &self.blocks[i], content_width));
        }
        self.content_width = content_width;
        self.rebuild_prefix_heights();
    }

    pub fn total_height(&self) -> u16 {
        self.prefix_heights.last().copied().unwrap_or(0)
    }

    pub fn rebuild_prefix_heights(&mut self) {
        self.prefix_heights = self
            .heights
            .iter()
            .scan(0u16, |acc, &h| {
                *acc = acc.saturating_add(h);
                Some(*acc)
            })
            .collect();
    }

    pub fn visible_range(&self, scroll_offset: u16, viewport_height: u16) -> std::ops::Range<usize> {
        let buffer = viewport_height / 2;
        let buffered_start = scroll_offset.saturating_sub(buffer);
        let buffered_end = scroll_offset
            .saturating_add(viewport_height)
            .saturating_add(buffer);

        let start = self
            .prefix_heights
            .partition_point(|&end| end <= buffered_start);
        let end = self
            .prefix_heights
            .partition_point(|&end| end < buffered_end)
            .saturating_add(1)
            .min(self.prefix_heights.len());

        start..end
    }
}
