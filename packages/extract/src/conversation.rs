//! Session-scoped chat transcript.
//!
//! Append-only: turns are immutable once recorded, the only deletion path
//! is a full [`ConversationLog::reset`], and display order is append order.

use serde::{Deserialize, Serialize};

/// Who authored a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message in the transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Ordered, append-only log of conversation turns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationLog {
    turns: Vec<ConversationTurn>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a turn at the end of the transcript.
    pub fn append(&mut self, role: Role, content: impl Into<String>) {
        self.turns.push(ConversationTurn::new(role, content));
    }

    /// Turns in display (append) order.
    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Drop the whole transcript. The only way to delete turns.
    pub fn reset(&mut self) {
        self.turns.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_preserves_order() {
        let mut log = ConversationLog::new();
        log.append(Role::User, "get the title");
        log.append(Role::Assistant, "| title |");
        log.append(Role::User, "and the price?");

        let roles: Vec<Role> = log.turns().iter().map(|t| t.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant, Role::User]);
        assert_eq!(log.turns()[1].content, "| title |");
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut log = ConversationLog::new();
        log.append(Role::User, "hello");
        log.reset();
        assert!(log.is_empty());
    }

    #[test]
    fn test_role_wire_tokens() {
        assert_eq!(serde_json::to_value(Role::User).unwrap(), "user");
        assert_eq!(serde_json::to_value(Role::Assistant).unwrap(), "assistant");
    }
}
