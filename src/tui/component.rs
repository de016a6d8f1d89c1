use ratatui::Frame;
use ratatui::layout::Rect;

use crate::tui::event::TuiEvent;

/// A piece of the screen that draws itself into a `Rect`.
///
/// Components get their data as props (struct fields) and may borrow
/// persistent state from `TuiState`. `render` takes `&mut self` so a component
/// can refresh caches (message heights, scroll offsets) while drawing.
pub trait Component {
    fn render(&mut self, frame: &mut Frame, area: Rect);
}

/// Persistent state that reacts to terminal events.
pub trait EventHandler {
    /// The higher-level event this handler emits, if any.
    type Event;

    fn handle_event(&mut self, event: &TuiEvent) -> Option<Self::Event>;
}
