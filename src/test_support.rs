//! Test utilities shared across the crate.
//!
//! This module is only compiled during tests (`#[cfg(test)]`).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc::{self, UnboundedReceiver};

use crate::connection::manager::ConnectionManager;
use crate::connection::transport::{ConnectionEvent, EventSink, Transport, TransportError};
use crate::core::llm_config::ConfigPanel;
use crate::core::session::{DEFAULT_REPLY_TIMEOUT, SessionEvent, SessionStore};
use crate::core::state::App;
use crate::render::{Clipboard, ClipboardError};

/// What the scripted backend does with the next outbound frame.
#[derive(Debug, Clone)]
pub enum Script {
    /// Answer with this raw text frame.
    Reply(String),
    /// Swallow the frame.
    Silence,
    /// Close the connection cleanly.
    Hangup,
    /// Break the connection with a protocol error.
    Fail(String),
}

/// In-memory transport driven by a script, one step per outbound frame.
/// Once the script runs out the backend goes silent.
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Script>>,
    refuse: Option<String>,
    sent: Arc<Mutex<Vec<String>>>,
    connects: Arc<AtomicUsize>,
    live: Arc<AtomicUsize>,
    clean_exits: Arc<AtomicUsize>,
}

impl ScriptedTransport {
    pub fn new(script: Vec<Script>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            refuse: None,
            sent: Arc::new(Mutex::new(Vec::new())),
            connects: Arc::new(AtomicUsize::new(0)),
            live: Arc::new(AtomicUsize::new(0)),
            clean_exits: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Accepts the connection and never answers.
    pub fn silent() -> Self {
        Self::new(Vec::new())
    }

    /// Fails every connection attempt.
    pub fn refusing(reason: &str) -> Self {
        Self {
            refuse: Some(reason.to_string()),
            ..Self::silent()
        }
    }

    /// Frames received from the client, in order.
    pub fn sent(&self) -> Arc<Mutex<Vec<String>>> {
        self.sent.clone()
    }

    pub fn connect_count(&self) -> Arc<AtomicUsize> {
        self.connects.clone()
    }

    /// Number of connections currently held open.
    pub fn live_count(&self) -> Arc<AtomicUsize> {
        self.live.clone()
    }

    /// Runs that ended because the client dropped the outbound channel.
    pub fn clean_exit_count(&self) -> Arc<AtomicUsize> {
        self.clean_exits.clone()
    }
}

struct LiveGuard(Arc<AtomicUsize>);

impl LiveGuard {
    fn new(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn run(
        &self,
        _url: &str,
        mut outbound: UnboundedReceiver<String>,
        sink: EventSink,
    ) -> Result<(), TransportError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = &self.refuse {
            return Err(TransportError::Connect(reason.clone()));
        }
        let _live = LiveGuard::new(self.live.clone());
        if !sink.opened() {
            return Ok(());
        }

        while let Some(frame) = outbound.recv().await {
            self.sent.lock().unwrap().push(frame);
            let step = self.script.lock().unwrap().pop_front();
            match step {
                Some(Script::Reply(text)) => {
                    sink.frame(text);
                }
                Some(Script::Silence) | None => {}
                Some(Script::Hangup) => return Ok(()),
                Some(Script::Fail(reason)) => return Err(TransportError::Protocol(reason)),
            }
        }
        self.clean_exits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Waits (bounded) for the next connection event.
pub async fn next_event(rx: &mut UnboundedReceiver<ConnectionEvent>) -> ConnectionEvent {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for a connection event")
        .expect("event channel closed")
}

/// Feeds the next connection event to the store.
pub async fn pump(
    store: &mut SessionStore,
    rx: &mut UnboundedReceiver<ConnectionEvent>,
) -> Option<SessionEvent> {
    let event = next_event(rx).await;
    store.handle_connection_event(event)
}

/// A started session whose connection is already `Open`.
pub async fn open_store(
    transport: ScriptedTransport,
) -> (SessionStore, UnboundedReceiver<ConnectionEvent>) {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let manager = ConnectionManager::new(Arc::new(transport), "ws://test", tx);
    let mut store = SessionStore::new(manager, DEFAULT_REPLY_TIMEOUT);
    store.start();
    loop {
        if let Some(SessionEvent::Connected) = pump(&mut store, &mut rx).await {
            break;
        }
    }
    (store, rx)
}

/// An `App` over a silent, unopened session.
pub fn test_app() -> App {
    let (tx, _rx) = mpsc::unbounded_channel();
    let manager = ConnectionManager::new(Arc::new(ScriptedTransport::silent()), "ws://test", tx);
    App::new(
        SessionStore::new(manager, DEFAULT_REPLY_TIMEOUT),
        ConfigPanel::default(),
    )
}

/// Clipboard that remembers what was written to it.
#[derive(Default)]
pub struct RecordingClipboard {
    copied: Arc<Mutex<Vec<String>>>,
    broken: bool,
}

impl RecordingClipboard {
    /// A clipboard whose every write fails.
    pub fn broken() -> Self {
        Self {
            copied: Arc::default(),
            broken: true,
        }
    }

    pub fn copied(&self) -> Vec<String> {
        self.copied.lock().unwrap().clone()
    }

    /// Shared view of the writes, still readable after the clipboard is boxed away.
    pub fn copied_handle(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.copied)
    }
}

impl Clipboard for RecordingClipboard {
    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        if self.broken {
            return Err(ClipboardError::Unavailable("no display".to_string()));
        }
        self.copied.lock().unwrap().push(text.to_string());
        Ok(())
    }
}
