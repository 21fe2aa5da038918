//! CLI channel: stdin/stdout REPL over a single chat session.
//!
//! Opening the REPL opens the session; `/quit` or EOF closes it. Replies are
//! awaited in the background so the prompt stays live; lines typed while a
//! reply is pending get the busy notice instead of being queued.

use std::io::Write;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;

use crate::chat::{Message, Rejection, Role, SessionController, SubmitOutcome};
use crate::error::ChannelError;

/// A parsed line of REPL input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    /// Close the session and exit.
    Quit,
    /// Print the conversation so far.
    History,
    /// Print the REPL commands.
    Commands,
    /// Text for the assistant.
    Say(String),
}

impl CliCommand {
    pub fn parse(line: &str) -> Self {
        match line.trim().to_lowercase().as_str() {
            "/quit" | "/exit" => Self::Quit,
            "/history" => Self::History,
            "/commands" | "/?" => Self::Commands,
            _ => Self::Say(line.to_string()),
        }
    }
}

/// Format one message for the terminal.
pub fn render_message(msg: &Message) -> String {
    let who = match msg.role {
        Role::User => "You",
        Role::Assistant => "Assistant",
    };
    format!("[{}] {}: {}", msg.created_at.format("%H:%M"), who, msg.content)
}

/// Local notice for a rejected submission. Never part of the conversation.
pub fn rejection_notice(rejection: Rejection, max_chars: usize) -> String {
    match rejection {
        Rejection::Empty => "(nothing to send)".to_string(),
        Rejection::TooLong => format!("(message too long, {max_chars} characters max)"),
        Rejection::Busy => "(still thinking, wait for the current reply)".to_string(),
        Rejection::Closed => "(session closed)".to_string(),
    }
}

const COMMANDS: &str = "Commands: /history, /commands, /quit";

/// A stdin/stdout REPL bound to one session.
pub struct CliChannel {
    controller: Arc<SessionController>,
}

impl CliChannel {
    pub fn new(controller: Arc<SessionController>) -> Self {
        Self { controller }
    }

    /// Run until `/quit` or EOF, then close the session.
    pub async fn run(&self) -> Result<(), ChannelError> {
        for msg in self.controller.current().await.messages {
            println!("\n{}\n", render_message(&msg));
        }
        eprintln!("{COMMANDS}");
        prompt()?;

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<String>();
        tokio::spawn(async move {
            let reader = BufReader::new(tokio::io::stdin());
            let mut lines = reader.lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break, // EOF
                    Err(e) => {
                        tracing::error!("Error reading stdin: {}", e);
                        break;
                    }
                }
            }
        });

        let max_chars = self.controller.max_message_chars();
        let mut in_flight = JoinSet::new();

        while let Some(line) = rx.recv().await {
            match CliCommand::parse(&line) {
                CliCommand::Quit => break,
                CliCommand::History => {
                    for msg in self.controller.current().await.messages {
                        println!("{}", render_message(&msg));
                    }
                }
                CliCommand::Commands => eprintln!("{COMMANDS}"),
                CliCommand::Say(text) => {
                    if self.controller.is_busy().await {
                        eprintln!("{}", rejection_notice(Rejection::Busy, max_chars));
                    } else {
                        let controller = Arc::clone(&self.controller);
                        in_flight.spawn(async move {
                            let result = controller.submit(&text).await;
                            print_result(result, max_chars);
                        });
                    }
                }
            }
            // Reap finished submissions so the set doesn't grow unbounded.
            while in_flight.try_join_next().is_some() {}
            prompt()?;
        }

        self.controller.close();
        in_flight.shutdown().await;
        Ok(())
    }
}

fn print_result(result: Result<SubmitOutcome, Rejection>, max_chars: usize) {
    match result {
        Ok(outcome) => {
            if let Some(reply) = outcome.assistant() {
                println!("\n{}\n", render_message(reply));
                let _ = prompt();
            }
        }
        Err(rejection) => eprintln!("{}", rejection_notice(rejection, max_chars)),
    }
}

fn prompt() -> Result<(), ChannelError> {
    eprint!("> ");
    std::io::stderr().flush()?;
    Ok(())
}
