//! The closed command registry shared by every session.
//!
//! A literal name-to-handler mapping built once at startup and looked up by
//! exact string key. Commands are plain function values; there is no dynamic
//! registration at runtime.

use std::collections::BTreeMap;
use std::fmt;

/// Read-only view a handler gets of its session
pub struct CommandContext<'a> {
    pub username: &'a str,
    pub registry: &'a CommandRegistry,
}

/// What a handler asks the session to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandEffect {
    /// Render these lines and keep prompting
    Lines(Vec<String>),
    /// Reset the attacker's terminal
    Clear,
    /// Render a farewell and end the session
    Terminate { farewell: String },
}

/// A handler fault. Caught at the dispatch boundary and rendered to the
/// attacker as `Error: <message>`; never terminates the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandError(pub String);

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

type CommandFn = fn(&CommandContext<'_>, &[&str]) -> Result<CommandEffect, CommandError>;

pub struct Command {
    pub help: &'static str,
    run: CommandFn,
}

impl Command {
    pub fn invoke(
        &self,
        ctx: &CommandContext<'_>,
        args: &[&str],
    ) -> Result<CommandEffect, CommandError> {
        (self.run)(ctx, args)
    }
}

/// Mapping from command name to handler; stateless, shared across sessions
pub struct CommandRegistry {
    commands: BTreeMap<&'static str, Command>,
}

impl CommandRegistry {
    /// The honeypot's stock command set
    pub fn builtin() -> Self {
        Self::new([
            (
                "help",
                Command {
                    help: "Get help on a command. Usage: help command",
                    run: cmd_help,
                },
            ),
            (
                "echo",
                Command {
                    help: "Echo a string. Usage: echo my line of text",
                    run: cmd_echo,
                },
            ),
            (
                "whoami",
                Command {
                    help: "Prints your user name. Usage: whoami",
                    run: cmd_whoami,
                },
            ),
            (
                "quit",
                Command {
                    help: "Ends your session. Usage: quit",
                    run: cmd_quit,
                },
            ),
            (
                "clear",
                Command {
                    help: "Clears the screen. Usage: clear",
                    run: cmd_clear,
                },
            ),
        ])
    }

    pub(crate) fn new(commands: impl IntoIterator<Item = (&'static str, Command)>) -> Self {
        Self {
            commands: commands.into_iter().collect(),
        }
    }

    /// Exact, case-sensitive lookup
    pub fn resolve(&self, name: &str) -> Option<&Command> {
        self.commands.get(name)
    }

    /// Registered names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.commands.keys().copied()
    }

    /// The `Commands: ...` listing rendered by `help`
    pub fn listing(&self) -> String {
        let names: Vec<&str> = self.names().collect();
        format!("Commands: {}", names.join(" "))
    }
}

fn cmd_help(ctx: &CommandContext<'_>, args: &[&str]) -> Result<CommandEffect, CommandError> {
    if let Some(name) = args.first() {
        if let Some(command) = ctx.registry.resolve(name) {
            return Ok(CommandEffect::Lines(vec![command.help.to_string()]));
        }
        // Unknown topic falls back to the full listing
    }
    Ok(CommandEffect::Lines(vec![ctx.registry.listing()]))
}

fn cmd_echo(_ctx: &CommandContext<'_>, args: &[&str]) -> Result<CommandEffect, CommandError> {
    Ok(CommandEffect::Lines(vec![args.join(" ")]))
}

fn cmd_whoami(ctx: &CommandContext<'_>, _args: &[&str]) -> Result<CommandEffect, CommandError> {
    Ok(CommandEffect::Lines(vec![ctx.username.to_string()]))
}

fn cmd_quit(_ctx: &CommandContext<'_>, _args: &[&str]) -> Result<CommandEffect, CommandError> {
    Ok(CommandEffect::Terminate {
        farewell: "Thanks for playing!".to_string(),
    })
}

fn cmd_clear(_ctx: &CommandContext<'_>, _args: &[&str]) -> Result<CommandEffect, CommandError> {
    Ok(CommandEffect::Clear)
}

#[cfg(test)]
pub(crate) fn failing_command() -> (&'static str, Command) {
    fn run(_ctx: &CommandContext<'_>, _args: &[&str]) -> Result<CommandEffect, CommandError> {
        Err(CommandError("handler blew up".to_string()))
    }
    (
        "faulty",
        Command {
            help: "Always fails. Usage: faulty",
            run,
        },
    )
}
