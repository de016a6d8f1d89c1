//! # Connection Layer
//!
//! Everything between the session and the backend socket.
//!
//! ```text
//!   SessionStore ──send()──► ConnectionManager ──outbound mpsc──► Transport task
//!        ▲                          ▲                                  │
//!        │                          │ handle_event()                   │
//!        └──── SessionEvent ────────┴──── ConnectionEvent (mpsc) ◄─────┘
//! ```
//!
//! - [`transport`]: the async `Transport` trait and the event channel types
//! - [`websocket`]: the production transport (tokio-tungstenite)
//! - [`manager`]: state machine owning one connection per session
//! - [`wire`]: JSON frame shapes

pub mod manager;
pub mod transport;
pub mod websocket;
pub mod wire;

pub use manager::{ConnectionManager, ConnectionState, Inbound};
pub use transport::{ConnectionEvent, ConnectionEventKind, EventSink, Transport, TransportError};
pub use websocket::WebSocketTransport;
pub use wire::{InboundReply, OutboundPayload, decode_reply};
