//! Outer surfaces that open, drive, and close chat sessions.

pub mod cli;

pub use cli::{CliChannel, CliCommand};
