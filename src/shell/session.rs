//! Per-channel session state machine: the read-dispatch-log loop.

use std::sync::Arc;

use crate::events::{ConnectionEnv, EventRecord, EventSink};

use super::registry::{CommandContext, CommandEffect, CommandRegistry};

const WELCOME: &str = "Welcome to my test SSH server.";
const PROMPT: &[u8] = b"$ ";
const NO_SUCH_COMMAND: &str = "No such command.";
// Clear screen, cursor home
const CLEAR_SCREEN: &[u8] = b"\x1b[2J\x1b[1;1H";

/// What a fed line produced: bytes for the attacker's terminal, plus
/// whether the session is now over.
#[derive(Debug, PartialEq, Eq)]
pub struct SessionTurn {
    pub output: Vec<u8>,
    pub terminate: bool,
}

/// One fake shell bound to one authenticated channel.
///
/// Single-writer: only the owning connection's input loop feeds it, so each
/// line is fully processed (logged, dispatched, rendered) before the next.
pub struct ShellSession {
    username: String,
    env: ConnectionEnv,
    local_version: String,
    remote_version: String,
    registry: Arc<CommandRegistry>,
    sink: Arc<dyn EventSink>,
    closed: bool,
}

impl ShellSession {
    pub(crate) fn new(
        username: String,
        env: ConnectionEnv,
        local_version: String,
        remote_version: String,
        registry: Arc<CommandRegistry>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            username,
            env,
            local_version,
            remote_version,
            registry,
            sink,
            closed: false,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn env(&self) -> &ConnectionEnv {
        &self.env
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Banner, one `help` rendering, and the first prompt.
    ///
    /// The greeting's help output is a courtesy of session setup, not a
    /// dispatched command, so no COMMAND record is emitted for it.
    pub fn greeting(&self) -> Vec<u8> {
        let mut out = Vec::new();
        push_line(&mut out, WELCOME);
        push_line(&mut out, &self.registry.listing());
        out.extend_from_slice(PROMPT);
        out
    }

    /// The bare prompt, for re-prompting after an interrupt
    pub fn prompt(&self) -> Vec<u8> {
        PROMPT.to_vec()
    }

    /// Transport-initiated close (disconnect, EOF); no farewell, no records
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Process one complete input line.
    ///
    /// The COMMAND record is emitted before the handler runs, so a record
    /// exists even if the handler then fails. Handler faults are contained
    /// here: they render as an `Error:` line and the session continues.
    pub fn feed_line(&mut self, line: &str) -> SessionTurn {
        if self.closed {
            return SessionTurn {
                output: Vec::new(),
                terminate: true,
            };
        }

        let line = line.trim();
        let mut output = Vec::new();

        if line.is_empty() {
            output.extend_from_slice(PROMPT);
            return SessionTurn {
                output,
                terminate: false,
            };
        }

        let mut tokens = line.split_whitespace();
        let command = tokens.next().unwrap_or_default();
        let args: Vec<&str> = tokens.collect();

        self.sink.emit(EventRecord::command(
            self.env.clone(),
            command,
            &self.local_version,
            &self.remote_version,
        ));

        match self.registry.resolve(command) {
            Some(cmd) => {
                let ctx = CommandContext {
                    username: &self.username,
                    registry: &self.registry,
                };
                match cmd.invoke(&ctx, &args) {
                    Ok(CommandEffect::Lines(lines)) => {
                        for l in &lines {
                            push_line(&mut output, l);
                        }
                    }
                    Ok(CommandEffect::Clear) => {
                        output.extend_from_slice(CLEAR_SCREEN);
                    }
                    Ok(CommandEffect::Terminate { farewell }) => {
                        push_line(&mut output, &farewell);
                        self.closed = true;
                    }
                    Err(e) => {
                        push_line(&mut output, &format!("Error: {}", e));
                    }
                }
            }
            None => {
                push_line(&mut output, NO_SUCH_COMMAND);
            }
        }

        if !self.closed {
            output.extend_from_slice(PROMPT);
        }

        SessionTurn {
            output,
            terminate: self.closed,
        }
    }
}

fn push_line(out: &mut Vec<u8>, text: &str) {
    out.extend_from_slice(text.as_bytes());
    out.extend_from_slice(b"\r\n");
}
