//! # Session Store
//!
//! The transcript of one conversation plus the single in-flight request gate.
//!
//! ```text
//!          append_user / append_from_suggestion (all checks pass)
//!   Idle ───────────────────────────────────────────────────────► Pending
//!    ▲                                                               │
//!    └──── reply | malformed reply | connection failure | timeout ◄──┘
//! ```
//!
//! Sends made while `Pending` are rejected, never queued. Since the wire has
//! no request id, this gate is what guarantees the next reply belongs to the
//! last request.
//!
//! The store owns its `ConnectionManager`; dropping or closing the store
//! releases the connection.

use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::connection::manager::{ConnectionManager, ConnectionState, Inbound};
use crate::connection::transport::ConnectionEvent;
use crate::core::compose::compose;
use crate::core::error::{ChatError, NotReadyReason};
use crate::core::llm_config::LlmConfig;
use crate::core::message::{Message, MessageId};

pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestGate {
    Idle,
    Pending { since: Instant },
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionHealth {
    Healthy,
    /// The connection failed or was lost. Carries the failure for display.
    Degraded(ChatError),
}

/// What the display layer should know after feeding an event to the store.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Connected,
    /// An assistant message was appended.
    Reply(MessageId),
    /// `MalformedReply` or `ConnectionFailure`. The gate has been released.
    Failure(ChatError),
}

pub struct SessionStore {
    transcript: Vec<Message>,
    gate: RequestGate,
    connection: ConnectionManager,
    health: SessionHealth,
    last_failure: Option<ChatError>,
    reply_timeout: Duration,
    closed: bool,
}

impl SessionStore {
    pub fn new(connection: ConnectionManager, reply_timeout: Duration) -> Self {
        Self {
            transcript: Vec::new(),
            gate: RequestGate::Idle,
            connection,
            health: SessionHealth::Healthy,
            last_failure: None,
            reply_timeout,
            closed: false,
        }
    }

    /// A new, unstarted session against the same backend: empty transcript,
    /// fresh connection.
    pub fn fresh(&self) -> Self {
        Self::new(self.connection.fresh(), self.reply_timeout)
    }

    /// Open the connection. Needs a tokio runtime.
    pub fn start(&mut self) {
        if self.closed {
            return;
        }
        self.connection.open();
    }

    pub fn append_user(&mut self, text: &str, config: &LlmConfig) -> Result<&Message, ChatError> {
        self.submit(text, config, "input")
    }

    /// Same checks and gate as `append_user`.
    pub fn append_from_suggestion(
        &mut self,
        text: &str,
        config: &LlmConfig,
    ) -> Result<&Message, ChatError> {
        self.submit(text, config, "suggestion")
    }

    fn submit(&mut self, text: &str, config: &LlmConfig, origin: &str) -> Result<&Message, ChatError> {
        if text.trim().is_empty() {
            return Err(ChatError::EmptyInput);
        }
        if self.closed || self.connection.state() != ConnectionState::Open {
            debug!("Rejected {} send: connection {}", origin, self.connection.state());
            return Err(ChatError::NotReady(NotReadyReason::Disconnected));
        }
        if self.is_pending() {
            debug!("Rejected {} send: request pending", origin);
            return Err(ChatError::NotReady(NotReadyReason::RequestPending));
        }

        let payload = compose(text, config)?;
        self.connection.send(&payload)?;

        info!(
            "Sent {} message ({} chars) with {}",
            origin,
            payload.message().len(),
            config.summary()
        );
        self.gate = RequestGate::Pending { since: Instant::now() };
        self.transcript.push(Message::user(payload.message()));
        let last = self.transcript.len() - 1;
        Ok(&self.transcript[last])
    }

    /// Feed one connection event. Returns `None` when nothing changed.
    pub fn handle_connection_event(&mut self, event: ConnectionEvent) -> Option<SessionEvent> {
        if self.closed {
            debug!("Session closed, dropping {:?}", event.kind);
            return None;
        }

        match self.connection.handle_event(event)? {
            Inbound::Opened => {
                self.health = SessionHealth::Healthy;
                Some(SessionEvent::Connected)
            }
            Inbound::Reply(Ok(reply)) => {
                if !self.is_pending() {
                    warn!("Reply arrived with no request pending; appending anyway");
                }
                self.release_gate();
                let message = Message::assistant(reply.content);
                let id = message.id();
                info!("Reply received ({} chars)", message.content().len());
                self.transcript.push(message);
                Some(SessionEvent::Reply(id))
            }
            Inbound::Reply(Err(err)) => {
                self.release_gate();
                self.last_failure = Some(err.clone());
                Some(SessionEvent::Failure(err))
            }
            Inbound::Closed => Some(self.degrade("connection closed by server".to_string())),
            Inbound::Failed(reason) => Some(self.degrade(reason)),
        }
    }

    /// Give up on a request that has been pending longer than the reply timeout.
    ///
    /// The connection is closed as well: a reply that turned up later would
    /// otherwise be taken as the answer to the next request.
    pub fn check_reply_timeout(&mut self, now: Instant) -> Option<SessionEvent> {
        if self.closed {
            return None;
        }
        let RequestGate::Pending { since } = self.gate else {
            return None;
        };
        let waited = now.saturating_duration_since(since);
        if waited < self.reply_timeout {
            return None;
        }

        warn!("No reply after {:.1}s, closing connection", waited.as_secs_f32());
        self.connection.close();
        Some(self.degrade(format!(
            "no reply within {}s",
            self.reply_timeout.as_secs()
        )))
    }

    /// Tear the session down. Later events are ignored.
    pub fn close(&mut self) {
        if !self.closed {
            info!("Closing session ({} messages)", self.transcript.len());
        }
        self.connection.close();
        self.release_gate();
        self.closed = true;
    }

    fn degrade(&mut self, reason: String) -> SessionEvent {
        let err = ChatError::ConnectionFailure(reason);
        warn!("Session degraded: {}", err);
        self.release_gate();
        self.health = SessionHealth::Degraded(err.clone());
        self.last_failure = Some(err.clone());
        SessionEvent::Failure(err)
    }

    fn release_gate(&mut self) {
        self.gate = RequestGate::Idle;
    }

    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    pub fn gate(&self) -> RequestGate {
        self.gate
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.gate, RequestGate::Pending { .. })
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn health(&self) -> &SessionHealth {
        &self.health
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self.health, SessionHealth::Degraded(_))
    }

    /// Most recent asynchronous failure, malformed replies included.
    pub fn last_failure(&self) -> Option<&ChatError> {
        self.last_failure.as_ref()
    }

    pub fn reply_timeout(&self) -> Duration {
        self.reply_timeout
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}
