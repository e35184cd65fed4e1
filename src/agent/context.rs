//! Per-turn agent context.

use serde::{Deserialize, Serialize};

use super::message::Role;
use crate::store::StoredMessage;

/// A prior message as seen by the router.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

impl From<&StoredMessage> for HistoryEntry {
    fn from(message: &StoredMessage) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
        }
    }
}

/// Context for one pipeline invocation.
///
/// Built once by the chat service and lent to the router, the agent and every
/// tool call. It is never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentContext {
    pub user_id: String,
    pub conversation_id: String,
    pub message: String,
    /// Chronological.
    pub recent_history: Vec<HistoryEntry>,
}

impl AgentContext {
    pub fn new(
        user_id: impl Into<String>,
        conversation_id: impl Into<String>,
        message: impl Into<String>,
        recent_history: Vec<HistoryEntry>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            conversation_id: conversation_id.into(),
            message: message.into(),
            recent_history,
        }
    }

    /// Render history as `role: content`, one message per line.
    /// Empty history renders as an empty string.
    pub fn transcript(&self) -> String {
        self.recent_history
            .iter()
            .map(|entry| format!("{}: {}", entry.role, entry.content))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Context with no history, for tests.
    #[cfg(test)]
    pub fn test(message: &str) -> Self {
        Self::new("demo-user", "conv-1", message, Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_is_role_prefixed_and_chronological() {
        let ctx = AgentContext::new(
            "u1",
            "c1",
            "where is it?",
            vec![
                HistoryEntry { role: Role::User, content: "hi".into() },
                HistoryEntry { role: Role::Assistant, content: "hello".into() },
            ],
        );
        assert_eq!(ctx.transcript(), "user: hi\nassistant: hello");
    }

    #[test]
    fn test_empty_history_renders_empty() {
        assert_eq!(AgentContext::test("hi").transcript(), "");
    }
}
