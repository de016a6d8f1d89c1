//! kfchat library exports for testing

pub mod connection;
pub mod core;
pub mod render;
pub mod tui;

#[cfg(test)]
pub mod test_support;

pub use crate::core::llm_config::Provider;
