//! Input gate: validates raw text and blocks submissions while a reply is pending.
//!
//! Checks run in order: empty, too long, busy. Rejections are ordinary
//! outcomes for the caller to branch on; they never become conversation
//! messages.

use serde::Serialize;

use super::session::ConversationSession;
use crate::config::DEFAULT_MAX_MESSAGE_CHARS;

/// Why a submission was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    /// Nothing left after trimming.
    Empty,
    /// Trimmed text exceeds the character limit.
    TooLong,
    /// A reply is still pending on this session.
    Busy,
    /// The session has been disposed.
    Closed,
}

impl Rejection {
    /// Validation failures, as opposed to lifecycle conflicts.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Empty | Self::TooLong)
    }
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Empty => "empty",
            Self::TooLong => "too_long",
            Self::Busy => "busy",
            Self::Closed => "closed",
        };
        write!(f, "{s}")
    }
}

/// Outcome of running text through the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision<'a> {
    /// Accepted; carries the trimmed text to append.
    Accepted(&'a str),
    Rejected(Rejection),
}

/// Length and busy checks for incoming text. Has no side effects.
#[derive(Debug, Clone, Copy)]
pub struct InputGate {
    max_chars: usize,
}

impl InputGate {
    /// A gate with a lower limit. Limits above the hard cap are clamped to it.
    pub fn new(max_chars: usize) -> Self {
        Self {
            max_chars: max_chars.min(DEFAULT_MAX_MESSAGE_CHARS),
        }
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Validate text alone, ignoring session state.
    pub fn validate<'a>(&self, raw: &'a str) -> GateDecision<'a> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return GateDecision::Rejected(Rejection::Empty);
        }
        if trimmed.chars().count() > self.max_chars {
            return GateDecision::Rejected(Rejection::TooLong);
        }
        GateDecision::Accepted(trimmed)
    }

    /// Validate text and check that `session` can take a submission.
    pub fn check<'a>(&self, raw: &'a str, session: &ConversationSession) -> GateDecision<'a> {
        match self.validate(raw) {
            GateDecision::Accepted(_) if session.is_busy() => {
                GateDecision::Rejected(Rejection::Busy)
            }
            decision => decision,
        }
    }
}

impl Default for InputGate {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MESSAGE_CHARS)
    }
}
