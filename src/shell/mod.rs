//! Fake shell presented to authenticated attackers.
//!
//! The registry decides what each typed line does, the line discipline turns
//! raw channel bytes into edited lines, and the session runs the
//! read-dispatch-log loop. Nothing in here executes anything real.

pub mod line;
pub mod registry;
pub mod session;

pub use line::{LineDiscipline, LineEvent};
pub use registry::{CommandContext, CommandEffect, CommandError, CommandRegistry};
pub use session::{SessionTurn, ShellSession};
