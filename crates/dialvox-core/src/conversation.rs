//! Append-only conversation context (spec §3 "Conversation context", invariant I5).

use serde::{Deserialize, Serialize};

/// Who spoke a given turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// A single turn in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}

/// Ordered, append-only history of a single call.
///
/// `push` is the only mutator. There is deliberately no `get_mut`/`remove`:
/// invariant I5 requires that ordering equal temporal order of completion
/// and that no prior entry is ever mutated in place.
#[derive(Debug, Clone, Default)]
pub struct ConversationContext {
    history: Vec<Turn>,
}

impl ConversationContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: Turn) {
        self.history.push(turn);
    }

    #[must_use]
    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.history.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Render the full history as a provider-agnostic message list, for
    /// handing to an `LlmClient` alongside the system prompt.
    #[must_use]
    pub fn as_messages(&self) -> Vec<(Role, &str)> {
        self.history.iter().map(|t| (t.role, t.text.as_str())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty() {
        let ctx = ConversationContext::new();
        assert!(ctx.is_empty());
    }

    #[test]
    fn push_is_append_only_and_ordered() {
        let mut ctx = ConversationContext::new();
        ctx.push(Turn::user("hello"));
        ctx.push(Turn::assistant("hi there"));
        ctx.push(Turn::user("how are you"));

        assert_eq!(ctx.len(), 3);
        assert_eq!(ctx.history()[0], Turn::user("hello"));
        assert_eq!(ctx.history()[1], Turn::assistant("hi there"));
        assert_eq!(ctx.history()[2], Turn::user("how are you"));
    }

    #[test]
    fn two_turns_yields_four_history_entries() {
        let mut ctx = ConversationContext::new();
        for i in 0..2 {
            ctx.push(Turn::user(format!("user {i}")));
            ctx.push(Turn::assistant(format!("assistant {i}")));
        }
        assert_eq!(ctx.len(), 4);
    }
}
