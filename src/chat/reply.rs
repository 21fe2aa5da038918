//! Reply backend contract and the local deterministic implementation.
//!
//! The session controller only sees [`ReplyService`]. The local backend
//! classifies the message and returns the matching template after a fixed
//! simulated latency; a remote inference backend can be dropped in behind
//! the same trait.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use super::intent::{IntentClassifier, KeywordClassifier};
use super::responses::generate;
use crate::config::{DEFAULT_MAX_MESSAGE_CHARS, DEFAULT_REPLY_LATENCY};
use crate::error::ReplyError;

/// Context handed to the backend alongside the message. Opaque to the session.
#[derive(Debug, Clone)]
pub struct ReplyContext {
    pub session_id: Uuid,
    /// Number of messages in the log, including the one being answered.
    pub history_len: usize,
}

/// A source of assistant replies.
#[async_trait]
pub trait ReplyService: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Produce a reply to `message`. May take arbitrarily long.
    async fn get_reply(&self, message: &str, context: &ReplyContext)
    -> Result<String, ReplyError>;
}

/// Deterministic local backend: classify, then answer from the templates.
pub struct LocalReplyService {
    classifier: Arc<dyn IntentClassifier>,
    latency: Duration,
    max_chars: usize,
}

impl LocalReplyService {
    pub fn new(classifier: Arc<dyn IntentClassifier>) -> Self {
        Self {
            classifier,
            latency: DEFAULT_REPLY_LATENCY,
            max_chars: DEFAULT_MAX_MESSAGE_CHARS,
        }
    }

    /// Set the simulated latency.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Set the longest message the backend will take.
    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }
}

impl Default for LocalReplyService {
    fn default() -> Self {
        Self::new(Arc::new(KeywordClassifier::default_rules()))
    }
}

#[async_trait]
impl ReplyService for LocalReplyService {
    fn name(&self) -> &str {
        "local"
    }

    async fn get_reply(
        &self,
        message: &str,
        context: &ReplyContext,
    ) -> Result<String, ReplyError> {
        let length = message.chars().count();
        if length > self.max_chars {
            return Err(ReplyError::InputTooLong {
                length,
                max: self.max_chars,
            });
        }

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let category = self.classifier.classify(message);
        debug!(
            session_id = %context.session_id,
            category = %category,
            "Generated local reply"
        );
        Ok(generate(category).to_string())
    }
}
