//! Career Assist: conversational career-guidance assistant engine.

pub mod channels;
pub mod chat;
pub mod config;
pub mod error;
