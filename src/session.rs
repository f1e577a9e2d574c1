//! Conversation transcript.
//!
//! A `Session` is an append-only list of turns kept in memory for one
//! conversation. Clearing it discards everything and starts over, restoring
//! the greeting if the session was created with one.

use crate::models::Turn;

/// Assistant greeting shown at the start of an interactive conversation.
pub const GREETING: &str = "Hey! Ask me anything.";

/// One conversation.
#[derive(Debug, Clone, Default)]
pub struct Session {
    turns: Vec<Turn>,
    greeting: Option<String>,
}

impl Session {
    /// An empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// A session that opens with an assistant greeting.
    pub fn with_greeting(greeting: impl Into<String>) -> Self {
        let mut session = Self {
            turns: Vec::new(),
            greeting: Some(greeting.into()),
        };
        session.reset();
        session
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// All turns in conversation order.
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// The last `n` turns in conversation order.
    pub fn recent(&self, n: usize) -> &[Turn] {
        let start = self.turns.len().saturating_sub(n);
        &self.turns[start..]
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Discard the transcript and start fresh.
    pub fn clear(&mut self) {
        self.reset();
        tracing::debug!("session cleared");
    }

    fn reset(&mut self) {
        self.turns.clear();
        if let Some(greeting) = &self.greeting {
            self.turns.push(Turn::assistant(greeting.clone()));
        }
    }
}
