//! Conversation session: the append-only message log and the idle/sending flag.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::message::{IdSource, Message, Role};
use super::responses::{ERROR_FALLBACK, GREETING, is_error_fallback};

/// Request lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Ready for the next submission.
    Idle,
    /// A reply is pending.
    Sending,
}

impl SessionState {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: SessionState) -> bool {
        matches!(
            (self, target),
            (SessionState::Idle, SessionState::Sending) | (SessionState::Sending, SessionState::Idle)
        )
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Sending => "sending",
        };
        write!(f, "{s}")
    }
}

/// One open conversation.
///
/// Invariants:
/// - never empty: seeded with the greeting on creation
/// - two fallback replies never sit back to back at the tail
/// - `Sending` exactly between accepting a user message and recording its reply
pub struct ConversationSession {
    messages: Vec<Message>,
    state: SessionState,
    ids: Arc<dyn IdSource>,
    last_active_at: DateTime<Utc>,
}

impl ConversationSession {
    /// Create a session seeded with the greeting.
    pub fn new(ids: Arc<dyn IdSource>) -> Self {
        let greeting = Message::new(ids.next_id(), Role::Assistant, GREETING);
        Self {
            messages: vec![greeting],
            state: SessionState::Idle,
            ids,
            last_active_at: Utc::now(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        self.state == SessionState::Sending
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Never true once constructed.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// When a message was last appended.
    pub fn last_active_at(&self) -> DateTime<Utc> {
        self.last_active_at
    }

    /// Append the user's (already gated) message and enter `Sending`.
    pub fn accept_user(&mut self, content: &str) -> Message {
        debug_assert!(self.state.can_transition_to(SessionState::Sending));
        let msg = self.push(Role::User, content);
        self.state = SessionState::Sending;
        msg
    }

    /// Record a successful reply and return to `Idle`.
    pub fn complete(&mut self, reply: &str) -> Message {
        let msg = self.push(Role::Assistant, reply);
        self.state = SessionState::Idle;
        msg
    }

    /// Record a backend failure and return to `Idle`.
    ///
    /// Appends the fallback reply unless the tail already is one; returns the
    /// appended message, or `None` when suppressed.
    pub fn fail(&mut self) -> Option<Message> {
        self.state = SessionState::Idle;

        let tail_is_fallback = self
            .last()
            .is_some_and(|m| m.is_assistant() && is_error_fallback(&m.content));
        if tail_is_fallback {
            debug!("Suppressing duplicate fallback reply");
            return None;
        }

        Some(self.push(Role::Assistant, ERROR_FALLBACK))
    }

    /// Drop the pending turn without appending anything.
    pub fn abandon(&mut self) {
        self.state = SessionState::Idle;
    }

    fn push(&mut self, role: Role, content: &str) -> Message {
        let msg = Message::new(self.ids.next_id(), role, content);
        self.last_active_at = msg.created_at;
        self.messages.push(msg.clone());
        msg
    }
}

/// Point-in-time copy of a session for display.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub messages: Vec<Message>,
    pub busy: bool,
    pub state: SessionState,
}

impl From<&ConversationSession> for SessionSnapshot {
    fn from(session: &ConversationSession) -> Self {
        Self {
            messages: session.messages.clone(),
            busy: session.is_busy(),
            state: session.state,
        }
    }
}
