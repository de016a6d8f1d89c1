//! # Core Application Logic
//!
//! This module contains kfchat's business logic.
//! It knows nothing about any specific UI technology.
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │         CORE            │
//!                    │  (this module)          │
//!                    │                         │
//!                    │  • App (state)          │
//!                    │  • Action (events)      │
//!                    │  • update() (reducer)   │
//!                    │  • SessionStore (gate)  │
//!                    └───────────┬─────────────┘
//!                                │
//!                    ┌───────────┴───────────┐
//!                    ▼                       ▼
//!             ┌────────────┐          ┌────────────┐
//!             │    TUI     │          │ connection │
//!             │  Adapter   │          │ (socket)   │
//!             │ (ratatui)  │          │            │
//!             └────────────┘          └────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`state`]: The `App` struct, all application state in one place
//! - [`action`]: The `Action` enum and `update()`
//! - [`session`]: transcript + single in-flight request gate
//! - [`compose`]: validation of outgoing requests
//! - [`llm_config`]: provider/model catalog and the configuration panel
//! - [`config`]: TOML/env/CLI settings
//! - [`message`], [`error`]: shared types

pub mod action;
pub mod compose;
pub mod config;
pub mod error;
pub mod llm_config;
pub mod message;
pub mod session;
pub mod state;
