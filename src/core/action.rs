//! # Actions
//!
//! Everything that can happen in kfchat becomes an `Action`.
//! User presses Enter? That's `Action::Submit(text)`.
//! The socket delivers a frame? That's `Action::Connection(event)`.
//!
//! The `update()` function applies an action to the state and returns an
//! `Effect` for the adapter to carry out. The only I/O reachable from here is
//! queueing a frame on the connection, which never blocks.
//!
//! ```text
//! State + Action  →  update()  →  New State + Effect
//! ```

use std::time::Instant;

use log::{debug, info};

use crate::connection::transport::ConnectionEvent;
use crate::core::error::{ChatError, NotReadyReason};
use crate::core::session::SessionEvent;
use crate::core::state::App;

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Text typed into the input box.
    Submit(String),
    /// A canned prompt picked on the landing page.
    Suggestion(String),
    /// Something happened on the connection.
    Connection(ConnectionEvent),
    /// Periodic clock tick (drives the reply timeout).
    Tick(Instant),
    CycleProvider { forward: bool },
    CycleModel { forward: bool },
    StepTemperature(i32),
    StepMaxTokens(i32),
    /// Drop the current session and connect again with an empty transcript.
    NewSession,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    None,
    /// The submission was accepted; the input box can be cleared.
    ClearInput,
    Quit,
}

pub fn update(app: &mut App, action: Action) -> Effect {
    match action {
        Action::Submit(text) => {
            let config = app.panel.snapshot();
            match app.session.append_user(&text, &config) {
                Ok(_) => {
                    app.status_message = String::from("Waiting for reply…");
                    Effect::ClearInput
                }
                Err(err) => {
                    app.status_message = rejection_message(&err);
                    Effect::None
                }
            }
        }
        Action::Suggestion(text) => {
            let config = app.panel.snapshot();
            match app.session.append_from_suggestion(&text, &config) {
                Ok(_) => app.status_message = String::from("Waiting for reply…"),
                Err(err) => app.status_message = rejection_message(&err),
            }
            Effect::None
        }
        Action::Connection(event) => {
            if let Some(session_event) = app.session.handle_connection_event(event) {
                apply_session_event(app, session_event);
            }
            Effect::None
        }
        Action::Tick(now) => {
            if let Some(session_event) = app.session.check_reply_timeout(now) {
                apply_session_event(app, session_event);
            }
            Effect::None
        }
        Action::CycleProvider { forward } => {
            app.panel.cycle_provider(forward);
            settings_changed(app)
        }
        Action::CycleModel { forward } => {
            app.panel.cycle_model(forward);
            settings_changed(app)
        }
        Action::StepTemperature(steps) => {
            app.panel.step_temperature(steps);
            settings_changed(app)
        }
        Action::StepMaxTokens(steps) => {
            app.panel.step_max_tokens(steps);
            settings_changed(app)
        }
        Action::NewSession => {
            info!("Starting a new session");
            let next = app.session.fresh();
            app.session.close();
            app.session = next;
            app.start();
            Effect::None
        }
        Action::Quit => {
            app.session.close();
            Effect::Quit
        }
    }
}

fn apply_session_event(app: &mut App, event: SessionEvent) {
    debug!("Session event: {:?}", event);
    app.status_message = match event {
        SessionEvent::Connected => format!("Connected to {}", app.session.connection().url()),
        SessionEvent::Reply(_) => String::from("Ready"),
        SessionEvent::Failure(err @ ChatError::MalformedReply(_)) => {
            format!("Could not read the reply: {}", err)
        }
        SessionEvent::Failure(err) => format!("{} (Ctrl+N to reconnect)", err),
    };
}

fn settings_changed(app: &mut App) -> Effect {
    app.status_message = app.panel.config().summary();
    Effect::None
}

fn rejection_message(err: &ChatError) -> String {
    match err {
        ChatError::EmptyInput => String::from("Type a message first"),
        ChatError::NotReady(NotReadyReason::RequestPending) => {
            String::from("Still waiting for the previous reply")
        }
        ChatError::NotReady(NotReadyReason::Disconnected) => {
            String::from("Not connected (Ctrl+N to reconnect)")
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::manager::ConnectionState;
    use crate::core::llm_config::{ConfigPanel, Provider};
    use crate::core::message::Role;
    use crate::core::session::DEFAULT_REPLY_TIMEOUT;
    use crate::test_support::{Script, ScriptedTransport, next_event, open_store, test_app};
    use std::time::Duration;

    #[test]
    fn test_submit_while_disconnected_is_refused() {
        let mut app = test_app();
        let effect = update(&mut app, Action::Submit("hello".to_string()));
        assert_eq!(effect, Effect::None);
        assert!(app.status_message.contains("Not connected"));
        assert!(!app.has_messages());
    }

    #[test]
    fn test_blank_submit_keeps_input() {
        let mut app = test_app();
        assert_eq!(update(&mut app, Action::Submit("   ".to_string())), Effect::None);
        assert_eq!(app.status_message, "Type a message first");
    }

    #[test]
    fn test_settings_actions_keep_config_valid() {
        let mut app = test_app();
        update(&mut app, Action::CycleProvider { forward: true });
        assert_eq!(app.panel.config().provider, Provider::Google);
        assert_eq!(app.panel.config().model, "gemma2-9b");
        assert!(app.status_message.contains("Google / gemma2-9b"));

        update(&mut app, Action::StepTemperature(-1));
        update(&mut app, Action::StepMaxTokens(2));
        assert_eq!(app.panel.config().temperature, 0.4);
        assert_eq!(app.panel.config().max_tokens, 6000);
        assert!(app.panel.snapshot().validate().is_ok());
    }

    #[test]
    fn test_quit_closes_session() {
        let mut app = test_app();
        assert_eq!(update(&mut app, Action::Quit), Effect::Quit);
        assert!(app.session.is_closed());
    }

    #[tokio::test]
    async fn test_submit_and_reply_round_trip() {
        let (store, mut rx) = open_store(ScriptedTransport::new(vec![Script::Reply(
            r#"{"content":"Kubeflow makes ML on Kubernetes simple."}"#.to_string(),
        )]))
        .await;
        let mut app = App::new(store, ConfigPanel::default());

        let effect = update(&mut app, Action::Submit("What is Kubeflow?".to_string()));
        assert_eq!(effect, Effect::ClearInput);
        assert!(app.session.is_pending());

        let event = next_event(&mut rx).await;
        update(&mut app, Action::Connection(event));

        let transcript = app.session.transcript();
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[1].role(), Role::Assistant);
        assert_eq!(app.status_message, "Ready");
        assert!(!app.session.is_pending());
    }

    #[tokio::test]
    async fn test_suggestion_goes_through_the_gate() {
        let (store, _rx) = open_store(ScriptedTransport::silent()).await;
        let mut app = App::new(store, ConfigPanel::default());

        update(&mut app, Action::Suggestion("What is Kubeflow?".to_string()));
        update(&mut app, Action::Suggestion("Show me common issues".to_string()));

        assert_eq!(app.session.transcript().len(), 1);
        assert_eq!(app.status_message, "Still waiting for the previous reply");
    }

    #[tokio::test]
    async fn test_tick_past_timeout_degrades() {
        let (store, _rx) = open_store(ScriptedTransport::silent()).await;
        let mut app = App::new(store, ConfigPanel::default());
        update(&mut app, Action::Submit("hello".to_string()));

        let later = Instant::now() + DEFAULT_REPLY_TIMEOUT + Duration::from_secs(1);
        update(&mut app, Action::Tick(later));

        assert!(!app.session.is_pending());
        assert!(app.banner().is_some());
        assert!(app.status_message.contains("Ctrl+N"));
    }

    #[tokio::test]
    async fn test_new_session_reconnects_with_empty_transcript() {
        let (store, _rx) = open_store(ScriptedTransport::new(vec![Script::Hangup])).await;
        let mut app = App::new(store, ConfigPanel::default());
        update(&mut app, Action::Submit("hello".to_string()));

        update(&mut app, Action::NewSession);
        assert!(!app.has_messages());
        assert_eq!(app.session.connection_state(), ConnectionState::Connecting);
        assert_eq!(app.banner(), None);
    }
}
