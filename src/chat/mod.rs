//! Conversational assistant engine.
//!
//! Every submission flows through:
//! 1. `InputGate`: empty / too long / busy checks
//! 2. `SessionController`: appends the user message and marks the session busy
//! 3. `ReplyService`: classify intent, pick the reply template (local backend)
//! 4. `ConversationSession`: append the reply, or a deduplicated fallback on failure

pub mod controller;
pub mod gate;
pub mod intent;
pub mod message;
pub mod registry;
pub mod reply;
pub mod responses;
pub mod routes;
pub mod session;

pub use controller::{SessionController, SubmitOutcome};
pub use gate::{GateDecision, InputGate, Rejection};
pub use intent::{IntentCategory, IntentClassifier, IntentRule, KeywordClassifier, KeywordPredicate};
pub use message::{IdSource, Message, MessageId, Role, SequentialIds, UuidIds};
pub use registry::SessionRegistry;
pub use reply::{LocalReplyService, ReplyContext, ReplyService};
pub use routes::{ChatRouteState, chat_routes};
pub use session::{ConversationSession, SessionSnapshot, SessionState};
