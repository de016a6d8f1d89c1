//! # Chat Errors
//!
//! One taxonomy for everything that can go wrong between the input box and
//! the backend. Variants fall in two groups:
//!
//! - **Synchronous** (`EmptyInput`, `NotReady`, `InvalidConfig`): rejected at
//!   the call site before any network traffic. Never reach the transcript.
//! - **Asynchronous** (`MalformedReply`, `ConnectionFailure`): observed on the
//!   event loop and reported through `SessionEvent::Failure`.
//!
//! None of them is fatal to the process.

use thiserror::Error;

/// Why a send was refused without touching the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotReadyReason {
    /// The connection is not `Open`.
    Disconnected,
    /// A request is already in flight.
    RequestPending,
}

impl std::fmt::Display for NotReadyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotReadyReason::Disconnected => write!(f, "not connected"),
            NotReadyReason::RequestPending => write!(f, "waiting for the previous reply"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChatError {
    /// Blank or whitespace-only submission.
    #[error("message is empty")]
    EmptyInput,
    #[error("not ready: {0}")]
    NotReady(NotReadyReason),
    /// Provider/model mismatch or an out-of-range numeric setting.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Inbound payload could not be decoded. Recoverable.
    #[error("malformed reply: {0}")]
    MalformedReply(String),
    /// Transport error, unexpected close or reply timeout. Terminal for the connection.
    #[error("connection failure: {0}")]
    ConnectionFailure(String),
}
