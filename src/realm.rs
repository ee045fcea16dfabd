//! Binds an authenticated identity to a freshly constructed shell session.
//!
//! The transport asks the realm for a capability; only the interactive shell
//! is supported. Anything else comes back as a typed rejection the transport
//! surfaces as a channel failure.

use std::sync::Arc;

use crate::error::SessionError;
use crate::events::{ConnectionEnv, EventRecord, EventSink};
use crate::shell::{CommandRegistry, ShellSession};

/// What a channel may ask the realm for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capability {
    InteractiveShell,
    Exec,
    Subsystem(String),
}

impl Capability {
    fn name(&self) -> String {
        match self {
            Capability::InteractiveShell => "shell".to_string(),
            Capability::Exec => "exec".to_string(),
            Capability::Subsystem(name) => format!("subsystem '{}'", name),
        }
    }
}

/// Session factory shared by all connections
pub struct Realm {
    registry: Arc<CommandRegistry>,
    sink: Arc<dyn EventSink>,
    server_id: String,
}

impl Realm {
    pub fn new(
        registry: Arc<CommandRegistry>,
        sink: Arc<dyn EventSink>,
        server_id: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            sink,
            server_id: server_id.into(),
        }
    }

    /// Construct a session for an authenticated identity, or reject the
    /// capability.
    ///
    /// A granted shell emits the NEW_CONNECTION record; rejected
    /// capabilities emit nothing.
    pub fn open_session(
        &self,
        capability: Capability,
        username: &str,
        env: ConnectionEnv,
        remote_version: &str,
    ) -> Result<ShellSession, SessionError> {
        match capability {
            Capability::InteractiveShell => {
                self.sink.emit(EventRecord::new_connection(
                    env.clone(),
                    username,
                    &self.server_id,
                    remote_version,
                ));
                Ok(ShellSession::new(
                    username.to_string(),
                    env,
                    self.server_id.clone(),
                    remote_version.to_string(),
                    self.registry.clone(),
                    self.sink.clone(),
                ))
            }
            other => Err(SessionError::UnsupportedCapability(other.name())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventKind, RecordingSink};

    const SERVER_ID: &str = "SSH-2.0-OpenSSH_5.1p1 Debian-5";

    fn realm() -> (Realm, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let realm = Realm::new(
            Arc::new(CommandRegistry::builtin()),
            sink.clone(),
            SERVER_ID,
        );
        (realm, sink)
    }

    fn env(src_port: u16) -> ConnectionEnv {
        ConnectionEnv {
            src_host: "203.0.113.7".to_string(),
            src_port,
            dst_host: "192.0.2.1".to_string(),
            dst_port: 223,
        }
    }

    #[test]
    fn shell_capability_builds_a_session_and_logs_the_connection() {
        let (realm, sink) = realm();

        let session = realm
            .open_session(
                Capability::InteractiveShell,
                "guest",
                env(50412),
                "SSH-2.0-OpenSSH_8.9",
            )
            .expect("shell session");

        assert_eq!(session.username(), "guest");
        assert_eq!(session.env(), &env(50412));

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, EventKind::NewConnection);
        assert_eq!(records[0].username.as_deref(), Some("guest"));
        assert_eq!(records[0].local_version, SERVER_ID);
        assert_eq!(records[0].remote_version, "SSH-2.0-OpenSSH_8.9");
    }

    #[test]
    fn exec_capability_is_rejected_without_records() {
        let (realm, sink) = realm();

        let result = realm.open_session(Capability::Exec, "guest", env(50412), "SSH-2.0-x");

        assert!(matches!(
            result,
            Err(SessionError::UnsupportedCapability(ref cap)) if cap == "exec"
        ));
        assert!(sink.records().is_empty());
    }

    #[test]
    fn subsystem_capability_is_rejected_with_its_name() {
        let (realm, _) = realm();

        let result = realm.open_session(
            Capability::Subsystem("sftp".to_string()),
            "guest",
            env(50412),
            "SSH-2.0-x",
        );

        assert!(matches!(
            result,
            Err(SessionError::UnsupportedCapability(ref cap)) if cap == "subsystem 'sftp'"
        ));
    }

    #[test]
    fn concurrent_sessions_get_their_own_env_and_records() {
        let (realm, sink) = realm();

        let mut admin = realm
            .open_session(
                Capability::InteractiveShell,
                "admin",
                env(40000),
                "SSH-2.0-a",
            )
            .expect("admin session");
        let mut guest = realm
            .open_session(
                Capability::InteractiveShell,
                "guest",
                env(40001),
                "SSH-2.0-b",
            )
            .expect("guest session");

        let admin_turn = admin.feed_line("whoami");
        let guest_turn = guest.feed_line("whoami");
        assert_eq!(admin_turn.output, b"admin\r\n$ ".to_vec());
        assert_eq!(guest_turn.output, b"guest\r\n$ ".to_vec());

        let records = sink.records();
        assert_eq!(records.len(), 4);
        // Each session's COMMAND record is tagged with its own env
        let admin_cmd = &records[2];
        let guest_cmd = &records[3];
        assert_eq!(admin_cmd.env.src_port, 40000);
        assert_eq!(guest_cmd.env.src_port, 40001);
    }
}
