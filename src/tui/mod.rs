//! # TUI Adapter
//!
//! The ratatui-specific layer. Handles terminal I/O, renders the UI,
//! and translates keyboard events into core::Action values.
//!
//! This is the only module that knows about ratatui and crossterm.
//!
//! ## Event Loop
//!
//! One thread owns `App`. Each iteration it:
//!
//! 1. draws (when something changed),
//! 2. waits for terminal input (short timeout while a reply is pending),
//! 3. drains pending connection events from the socket task,
//! 4. ticks the reply timeout.
//!
//! The socket itself lives on a tokio task and only talks to the loop through
//! an unbounded channel, so the loop never blocks on the network.
//!
//! ## Redraw Strategy
//!
//! - **Animating** (reply pending, copy acknowledgment visible): draws every ~80ms.
//! - **Idle**: sleeps up to 500ms, only redraws on events or terminal resize.

mod clipboard;
mod component;
mod components;
mod event;
pub mod markdown;
mod ui;

use log::{debug, info, warn};
use std::io::stdout;
use std::time::{Duration, Instant};

use crossterm::cursor::{Hide, SetCursorStyle, Show};
use crossterm::event::{
    DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture,
    KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use tokio::sync::mpsc;

use crate::core::action::{Action, Effect, update};
use crate::core::config::ResolvedConfig;
use crate::core::message::MessageId;
use crate::core::state::App;
use crate::render::{Clipboard, CopyAck, render_all};
use crate::tui::clipboard::SystemClipboard;
use crate::tui::component::EventHandler;
use crate::tui::components::{
    InputBox, InputEvent, LandingEvent, LandingState, MessageListState, SettingsEvent, SettingsState,
};
use crate::tui::event::{TuiEvent, poll_event_immediate, poll_event_timeout};

const ANIMATION_INTERVAL: Duration = Duration::from_millis(80);
const IDLE_INTERVAL: Duration = Duration::from_millis(500);

/// Modal input mode: determines how keyboard events are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Navigate messages with arrow keys, digits copy code blocks.
    /// Typing auto-switches to Input.
    Cursor,
    /// Text editing in the input box. Esc switches to Cursor.
    Input,
}

/// TUI-specific presentation state (not part of core business logic)
pub struct TuiState {
    pub message_list: MessageListState,
    pub input_box: InputBox,
    pub input_mode: InputMode,
    pub landing: LandingState,
    /// Settings overlay (None = hidden)
    pub settings: Option<SettingsState>,
    /// Copy acknowledgments per (message, code block number)
    pub copy_acks: Vec<(MessageId, usize, CopyAck)>,
    clipboard: Box<dyn Clipboard>,
}

impl TuiState {
    pub fn new(clipboard: Box<dyn Clipboard>) -> Self {
        Self {
            message_list: MessageListState::new(),
            input_box: InputBox::new(),
            input_mode: InputMode::Input, // User expects to type immediately
            landing: LandingState::default(),
            settings: None,
            copy_acks: Vec::new(),
            clipboard,
        }
    }

    /// Presentation state that belongs to the previous session.
    fn reset_session_view(&mut self) {
        self.message_list = MessageListState::new();
        self.copy_acks.clear();
        self.input_mode = InputMode::Input;
        self.landing = LandingState::default();
    }

    /// Drop expired acknowledgments. Returns true if any were dropped.
    fn prune_acks(&mut self, now: Instant) -> bool {
        let before = self.copy_acks.len();
        self.copy_acks.retain(|(_, _, ack)| ack.is_active_at(now));
        self.copy_acks.len() != before
    }

    /// Active acknowledgments as (transcript index, code block number).
    pub fn visible_acks(&self, app: &App, now: Instant) -> Vec<(usize, usize)> {
        let transcript = app.session.transcript();
        self.copy_acks
            .iter()
            .filter(|(_, _, ack)| ack.is_active_at(now))
            .filter_map(|(id, n, _)| {
                transcript
                    .iter()
                    .position(|m| m.id() == *id)
                    .map(|idx| (idx, *n))
            })
            .collect()
    }

    /// Copy code block `n` (1-based) of the selected message.
    fn copy_code_block(&mut self, app: &mut App, n: usize) {
        let Some(message) = self
            .message_list
            .selected_index
            .and_then(|idx| app.session.transcript().get(idx))
        else {
            app.status_message = String::from("Select a message first (↑/↓)");
            return;
        };
        let id = message.id();
        let blocks = render_all(message.content());
        let Some(block) = markdown::nth_code_block(&blocks, n) else {
            app.status_message = match markdown::code_block_count(&blocks) {
                0 => String::from("This message has no code blocks"),
                1 => String::from("Only code block 1 in this message"),
                count => format!("Only code blocks 1-{} in this message", count),
            };
            return;
        };
        match block.copy_to_clipboard(self.clipboard.as_mut()) {
            Ok(ack) => {
                self.copy_acks.retain(|(m, k, _)| !(*m == id && *k == n));
                self.copy_acks.push((id, n, ack));
                app.status_message = format!("Copied code block {}", n);
            }
            Err(e) => {
                warn!("Copy failed: {}", e);
                app.status_message = format!("Copy failed: {}", e);
            }
        }
    }
}

struct TerminalModeGuard;

impl TerminalModeGuard {
    fn new() -> std::io::Result<Self> {
        // Enable Kitty keyboard protocol unconditionally; terminals that don't
        // support it ignore the sequence
        execute!(
            stdout(),
            EnableMouseCapture,
            EnableBracketedPaste,
            Show,                        // Show cursor for input editing
            SetCursorStyle::SteadyBlock, // Non-blinking: avoids blink timer reset from continuous redraws
            PushKeyboardEnhancementFlags(
                KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                    | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
            )
        )?;
        info!("Terminal modes enabled (mouse, bracketed paste, steady block cursor, keyboard enhancement)");
        Ok(Self)
    }
}

impl Drop for TerminalModeGuard {
    fn drop(&mut self) {
        let _ = execute!(
            stdout(),
            PopKeyboardEnhancementFlags,
            DisableMouseCapture,
            DisableBracketedPaste,
            Hide // Hide cursor on exit
        );
    }
}

/// Must be called from inside a tokio runtime: the connection task is spawned on it.
pub fn run(config: ResolvedConfig) -> std::io::Result<()> {
    // Connection events from the socket task
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut app = App::from_config(&config, tx);
    let mut tui = TuiState::new(Box::new(SystemClipboard::new()));
    app.start();

    let mut terminal = ratatui::init();
    let _terminal_mode_guard = TerminalModeGuard::new();

    let start_time = Instant::now();
    let mut needs_redraw = true; // Force first frame

    loop {
        tui.input_box.dimmed = matches!(tui.input_mode, InputMode::Cursor);

        let now = Instant::now();
        if tui.prune_acks(now) {
            needs_redraw = true;
        }
        let animating = app.session.is_pending() || !tui.copy_acks.is_empty();
        if animating {
            needs_redraw = true;
        }

        if needs_redraw {
            let spinner_frame = (start_time.elapsed().as_secs_f32() * 12.0) as usize;
            terminal.draw(|f| ui::draw_ui(f, &app, &mut tui, spinner_frame))?;
            needs_redraw = false;
        }

        let timeout = if animating { ANIMATION_INTERVAL } else { IDLE_INTERVAL };
        let first_event = poll_event_timeout(timeout);

        // Process first event + drain ALL pending events before next draw
        let mut should_quit = false;
        if first_event.is_some() {
            needs_redraw = true;
        }
        for event in first_event
            .into_iter()
            .chain(std::iter::from_fn(poll_event_immediate))
        {
            if handle_event(&mut app, &mut tui, event) == Effect::Quit {
                should_quit = true;
                break;
            }
        }

        if should_quit {
            break;
        }

        // Connection events (opened, replies, close, failure)
        while let Ok(event) = rx.try_recv() {
            needs_redraw = true;
            debug!("Event loop received: {:?}", event);
            update(&mut app, Action::Connection(event));
        }

        let was_pending = app.session.is_pending();
        update(&mut app, Action::Tick(Instant::now()));
        if was_pending != app.session.is_pending() {
            needs_redraw = true;
        }
    }

    ratatui::restore();
    Ok(())
}

/// Route one terminal event. Returns `Effect::Quit` when the app should exit.
fn handle_event(app: &mut App, tui: &mut TuiState, event: TuiEvent) -> Effect {
    match event {
        // Resize just needs a redraw (already flagged by the caller)
        TuiEvent::Resize => return Effect::None,
        // ForceQuit (Ctrl+C) always quits regardless of mode
        TuiEvent::ForceQuit => return update(app, Action::Quit),
        TuiEvent::NewSession => {
            tui.reset_session_view();
            return update(app, Action::NewSession);
        }
        TuiEvent::ToggleSettings => {
            tui.settings = match tui.settings {
                Some(_) => None,
                None => Some(SettingsState::default()),
            };
            return Effect::None;
        }
        _ => {}
    }

    // When the settings overlay is open, route all events to it
    if let Some(settings) = tui.settings.as_mut() {
        match settings.handle_event(&event) {
            Some(SettingsEvent::Change(action)) => return update(app, action),
            Some(SettingsEvent::Dismiss) => tui.settings = None,
            None => {}
        }
        return Effect::None;
    }

    // Scroll events always go to MessageList regardless of mode
    if matches!(
        event,
        TuiEvent::ScrollUp | TuiEvent::ScrollDown | TuiEvent::ScrollPageUp | TuiEvent::ScrollPageDown
    ) {
        tui.message_list.handle_event(&event);
        return Effect::None;
    }

    match tui.input_mode {
        InputMode::Input => {
            if matches!(event, TuiEvent::Escape) {
                tui.input_mode = InputMode::Cursor;
                let count = app.session.transcript().len();
                tui.message_list.selected_index = count.checked_sub(1);
                return Effect::None;
            }

            // Landing page takes arrows, Enter and digits while nothing is typed
            if !app.has_messages() && tui.input_box.is_empty() {
                if let Some(LandingEvent::Choose(text)) = tui.landing.handle_event(&event) {
                    return update(app, Action::Suggestion(text.to_string()));
                }
                if matches!(event, TuiEvent::CursorUp | TuiEvent::CursorDown) {
                    return Effect::None;
                }
            }

            if let Some(InputEvent::Submit(text)) = tui.input_box.handle_event(&event) {
                let effect = update(app, Action::Submit(text));
                if effect == Effect::ClearInput {
                    tui.input_box.clear();
                    tui.message_list.stick_to_bottom = true;
                }
                return effect;
            }
            Effect::None
        }
        InputMode::Cursor => {
            let count = app.session.transcript().len();
            match event {
                TuiEvent::Escape | TuiEvent::Submit => {
                    tui.input_mode = InputMode::Input;
                    tui.message_list.selected_index = None;
                }
                TuiEvent::CursorUp => tui.message_list.select_prev(count),
                TuiEvent::CursorDown => tui.message_list.select_next(count),
                TuiEvent::InputChar(c @ '1'..='9') => {
                    if let Some(n) = c.to_digit(10) {
                        tui.copy_code_block(app, n as usize);
                    }
                }
                // Typing auto-switches to Input mode and forwards the event
                TuiEvent::InputChar(_) | TuiEvent::Paste(_) => {
                    tui.input_mode = InputMode::Input;
                    tui.message_list.selected_index = None;
                    tui.input_box.handle_event(&event);
                }
                _ => {}
            }
            Effect::None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::llm_config::{ConfigPanel, Provider};
    use crate::test_support::{
        RecordingClipboard, Script, ScriptedTransport, next_event, open_store, test_app,
    };

    fn tui_with(clipboard: RecordingClipboard) -> TuiState {
        TuiState::new(Box::new(clipboard))
    }

    fn type_text(app: &mut App, tui: &mut TuiState, text: &str) {
        for c in text.chars() {
            handle_event(app, tui, TuiEvent::InputChar(c));
        }
    }

    #[test]
    fn test_force_quit() {
        let mut app = test_app();
        let mut tui = tui_with(RecordingClipboard::default());
        assert_eq!(handle_event(&mut app, &mut tui, TuiEvent::ForceQuit), Effect::Quit);
        assert!(app.session.is_closed());
    }

    #[test]
    fn test_settings_overlay_routes_changes() {
        let mut app = test_app();
        let mut tui = tui_with(RecordingClipboard::default());

        handle_event(&mut app, &mut tui, TuiEvent::ToggleSettings);
        assert!(tui.settings.is_some());
        handle_event(&mut app, &mut tui, TuiEvent::CursorRight);
        assert_eq!(app.panel.config().provider, Provider::Google);

        // Typing does not leak into the input box while the overlay is open
        handle_event(&mut app, &mut tui, TuiEvent::InputChar('x'));
        assert!(tui.input_box.is_empty());

        handle_event(&mut app, &mut tui, TuiEvent::Escape);
        assert!(tui.settings.is_none());
    }

    #[test]
    fn test_refused_submit_keeps_input() {
        let mut app = test_app();
        let mut tui = tui_with(RecordingClipboard::default());
        type_text(&mut app, &mut tui, "hello");
        handle_event(&mut app, &mut tui, TuiEvent::Submit);
        assert_eq!(tui.input_box.buffer(), "hello");
        assert!(app.status_message.contains("Not connected"));
    }

    #[tokio::test]
    async fn test_landing_digit_sends_suggestion() {
        let (store, _rx) = open_store(ScriptedTransport::silent()).await;
        let mut app = App::new(store, ConfigPanel::default());
        let mut tui = tui_with(RecordingClipboard::default());

        handle_event(&mut app, &mut tui, TuiEvent::InputChar('2'));

        let transcript = app.session.transcript();
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript[0].content(), "How do I install Kubeflow?");
        assert!(tui.input_box.is_empty());
    }

    #[tokio::test]
    async fn test_submit_clears_input_when_accepted() {
        let (store, _rx) = open_store(ScriptedTransport::silent()).await;
        let mut app = App::new(store, ConfigPanel::default());
        let mut tui = tui_with(RecordingClipboard::default());

        type_text(&mut app, &mut tui, "What is KServe?");
        assert_eq!(handle_event(&mut app, &mut tui, TuiEvent::Submit), Effect::ClearInput);
        assert!(tui.input_box.is_empty());

        // Second submission while pending is refused and kept
        type_text(&mut app, &mut tui, "and Katib?");
        handle_event(&mut app, &mut tui, TuiEvent::Submit);
        assert_eq!(tui.input_box.buffer(), "and Katib?");
        assert_eq!(app.session.transcript().len(), 1);
    }

    #[tokio::test]
    async fn test_cursor_mode_copies_code_block() {
        let reply = serde_json::json!({
            "content": "Install with:\n\n```bash\npip install kfp\n```"
        })
        .to_string();
        let (store, mut rx) = open_store(ScriptedTransport::new(vec![Script::Reply(reply)])).await;
        let mut app = App::new(store, ConfigPanel::default());
        let clipboard = RecordingClipboard::default();
        let copied = clipboard.copied_handle();
        let mut tui = tui_with(clipboard);

        type_text(&mut app, &mut tui, "How do I install the SDK?");
        handle_event(&mut app, &mut tui, TuiEvent::Submit);
        let event = next_event(&mut rx).await;
        update(&mut app, Action::Connection(event));

        handle_event(&mut app, &mut tui, TuiEvent::Escape);
        assert_eq!(tui.input_mode, InputMode::Cursor);
        assert_eq!(tui.message_list.selected_index, Some(1));

        handle_event(&mut app, &mut tui, TuiEvent::InputChar('1'));
        assert_eq!(*copied.lock().unwrap(), vec!["pip install kfp".to_string()]);
        assert_eq!(tui.visible_acks(&app, Instant::now()), vec![(1, 1)]);

        handle_event(&mut app, &mut tui, TuiEvent::InputChar('2'));
        assert_eq!(app.status_message, "Only code block 1 in this message");

        // The user's question has no code at all
        handle_event(&mut app, &mut tui, TuiEvent::CursorUp);
        assert_eq!(tui.message_list.selected_index, Some(0));
        handle_event(&mut app, &mut tui, TuiEvent::InputChar('1'));
        assert_eq!(app.status_message, "This message has no code blocks");
        assert_eq!(copied.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_copy_without_selection_reported() {
        let mut app = test_app();
        let mut tui = tui_with(RecordingClipboard::broken());
        tui.input_mode = InputMode::Cursor;
        handle_event(&mut app, &mut tui, TuiEvent::InputChar('1'));
        assert!(app.status_message.contains("Select a message"));
    }

    #[tokio::test]
    async fn test_new_session_resets_view() {
        let mut app = test_app();
        let mut tui = tui_with(RecordingClipboard::default());
        tui.input_mode = InputMode::Cursor;
        tui.message_list.selected_index = Some(3);
        handle_event(&mut app, &mut tui, TuiEvent::NewSession);
        assert_eq!(tui.input_mode, InputMode::Input);
        assert_eq!(tui.message_list.selected_index, None);
    }
}
