//! Session controller: runs one submission through gate → reply backend → log.
//!
//! The session lock is held only while checking the gate and appending, never
//! across the backend call, so history and the busy flag stay readable while a
//! reply is pending. The busy flag is checked and set under the same write
//! lock, which serializes submissions per session.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::gate::{GateDecision, InputGate, Rejection};
use super::message::{IdSource, Message};
use super::reply::{ReplyContext, ReplyService};
use super::session::{ConversationSession, SessionSnapshot};
use crate::config::{AssistantConfig, DEFAULT_MAX_MESSAGE_CHARS};
use crate::error::ReplyError;

/// Default bound on a single backend call.
const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(30);

/// What an accepted submission produced.
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    /// The backend answered; both messages were appended.
    Replied { user: Message, reply: Message },
    /// The backend failed. `fallback` is `None` when the fallback was deduplicated.
    Failed {
        user: Message,
        fallback: Option<Message>,
        error: ReplyError,
    },
    /// The session was closed while the reply was pending; nothing was appended.
    Discarded { user: Message },
}

impl SubmitOutcome {
    pub fn user(&self) -> &Message {
        match self {
            Self::Replied { user, .. } | Self::Failed { user, .. } | Self::Discarded { user } => {
                user
            }
        }
    }

    /// The assistant message appended for this submission, if any.
    pub fn assistant(&self) -> Option<&Message> {
        match self {
            Self::Replied { reply, .. } => Some(reply),
            Self::Failed { fallback, .. } => fallback.as_ref(),
            Self::Discarded { .. } => None,
        }
    }

    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Replied { .. } => "replied",
            Self::Failed { .. } => "failed",
            Self::Discarded { .. } => "discarded",
        }
    }
}

/// Owns one conversation and drives its submissions.
pub struct SessionController {
    id: Uuid,
    session: RwLock<ConversationSession>,
    gate: InputGate,
    reply: Arc<dyn ReplyService>,
    reply_timeout: Duration,
    /// Cancelled when the session is disposed.
    cancel: CancellationToken,
}

impl SessionController {
    /// Open a new session seeded with the greeting.
    pub fn new(reply: Arc<dyn ReplyService>, ids: Arc<dyn IdSource>) -> Self {
        let id = Uuid::new_v4();
        info!(session_id = %id, backend = reply.name(), "Session opened");
        Self {
            id,
            session: RwLock::new(ConversationSession::new(ids)),
            gate: InputGate::default(),
            reply,
            reply_timeout: DEFAULT_REPLY_TIMEOUT,
            cancel: CancellationToken::new(),
        }
    }

    /// Open a session using the limits in `config`.
    pub fn from_config(
        config: &AssistantConfig,
        reply: Arc<dyn ReplyService>,
        ids: Arc<dyn IdSource>,
    ) -> Self {
        Self::new(reply, ids)
            .with_gate(InputGate::new(config.max_message_chars))
            .with_reply_timeout(config.reply_timeout)
    }

    pub fn with_gate(mut self, gate: InputGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = timeout;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Longest message the gate accepts, in characters.
    pub fn max_message_chars(&self) -> usize {
        self.gate.max_chars()
    }

    /// Copy of the current log and lifecycle flag.
    pub async fn current(&self) -> SessionSnapshot {
        SessionSnapshot::from(&*self.session.read().await)
    }

    pub async fn is_busy(&self) -> bool {
        self.session.read().await.is_busy()
    }

    /// True when no reply is pending and nothing was appended after `cutoff`.
    pub async fn is_idle_since(&self, cutoff: DateTime<Utc>) -> bool {
        let session = self.session.read().await;
        !session.is_busy() && session.last_active_at() <= cutoff
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Dispose of the session. A reply still in flight is dropped on arrival.
    pub fn close(&self) {
        if !self.cancel.is_cancelled() {
            info!(session_id = %self.id, "Session closed");
        }
        self.cancel.cancel();
    }

    /// Submit user text and wait for its reply.
    ///
    /// Rejections leave the session untouched. Once accepted, the session is
    /// busy until the reply (or fallback) is appended, and any backend failure
    /// is folded into [`SubmitOutcome::Failed`]. Dropping the future after
    /// acceptance leaves the session busy, so callers that can be cancelled
    /// should spawn it.
    pub async fn submit(&self, raw: &str) -> Result<SubmitOutcome, Rejection> {
        if self.cancel.is_cancelled() {
            return Err(Rejection::Closed);
        }

        let (user, context) = {
            let mut session = self.session.write().await;
            // close() may have landed while we waited for the lock.
            if self.cancel.is_cancelled() {
                return Err(Rejection::Closed);
            }
            let content = match self.gate.check(raw, &session) {
                GateDecision::Accepted(text) => text,
                GateDecision::Rejected(reason) => {
                    debug!(session_id = %self.id, reason = %reason, "Submission rejected");
                    return Err(reason);
                }
            };
            let user = session.accept_user(content);
            let context = ReplyContext {
                session_id: self.id,
                history_len: session.len(),
            };
            (user, context)
        };

        debug!(session_id = %self.id, message_id = %user.id, "Submission accepted");

        let result = tokio::select! {
            _ = self.cancel.cancelled() => Err(ReplyError::Cancelled),
            result = tokio::time::timeout(
                self.reply_timeout,
                self.reply.get_reply(&user.content, &context),
            ) => result.unwrap_or(Err(ReplyError::Timeout { after: self.reply_timeout })),
        };
        let result = result.and_then(|text| self.check_reply_length(text));

        let mut session = self.session.write().await;
        if self.cancel.is_cancelled() {
            info!(session_id = %self.id, message_id = %user.id, "Discarding reply for closed session");
            session.abandon();
            return Ok(SubmitOutcome::Discarded { user });
        }

        let outcome = match result {
            Ok(text) => {
                let reply = session.complete(&text);
                SubmitOutcome::Replied { user, reply }
            }
            Err(error) => {
                warn!(
                    session_id = %self.id,
                    backend = self.reply.name(),
                    error = %error,
                    "Reply backend failed"
                );
                let fallback = session.fail();
                SubmitOutcome::Failed {
                    user,
                    fallback,
                    error,
                }
            }
        };

        debug!(session_id = %self.id, outcome = outcome.label(), "Submission finished");
        Ok(outcome)
    }

    /// Replies obey the hard message cap; a lowered input limit never shrinks it.
    fn check_reply_length(&self, text: String) -> Result<String, ReplyError> {
        let limit = DEFAULT_MAX_MESSAGE_CHARS;
        let length = text.chars().count();
        if length > limit {
            return Err(ReplyError::Failed {
                backend: self.reply.name().to_string(),
                reason: format!("reply is {length} characters, limit is {limit}"),
            });
        }
        Ok(text)
    }
}
