//! Transcript entries.
//!
//! A `Message` is created once, when the user submits or a reply arrives, and
//! never changes afterwards: fields are private and only readable.

use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Opaque unique message token (UUID v4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageId(Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn label(self) -> &'static str {
        match self {
            Role::User => "you",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    id: MessageId,
    role: Role,
    content: String,
    created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_constructors_set_role() {
        assert_eq!(Message::user("hi").role(), Role::User);
        assert_eq!(Message::assistant("hello").role(), Role::Assistant);
        assert_eq!(Message::user("hi").content(), "hi");
    }

    #[test]
    fn test_ids_are_unique() {
        let ids: HashSet<MessageId> = (0..1000).map(|_| Message::user("x").id()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_role_labels() {
        assert_eq!(Role::User.label(), "you");
        assert_eq!(Role::Assistant.label(), "assistant");
    }
}
