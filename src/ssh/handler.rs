//! Per-connection protocol handler.
//!
//! One `ConnectionHandler` exists per TCP connection. It bridges the
//! transport's callbacks to the realm: password checks go to the
//! [`CredentialChecker`], a granted shell request opens a [`ShellSession`],
//! and channel data is cooked through a per-channel [`LineDiscipline`]
//! before being dispatched as commands. A connection may multiplex several
//! session channels; each gets its own shell and input state.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use russh::server::{Auth, Handler, Msg, Session};
use russh::{Channel, ChannelId, CryptoVec, Pty};
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::CredentialChecker;
use crate::error::ServerError;
use crate::events::ConnectionEnv;
use crate::realm::{Capability, Realm};
use crate::shell::{LineDiscipline, LineEvent, ShellSession};

use super::sniff::{SharedVersion, UNKNOWN_VERSION};

/// Shell and input state for one session channel
struct ChannelState {
    line: LineDiscipline,
    shell: Option<ShellSession>,
}

impl ChannelState {
    fn new() -> Self {
        Self {
            line: LineDiscipline::new(),
            shell: None,
        }
    }
}

/// Per-channel state table. Channels on the same connection never share a
/// shell or a line buffer.
struct ChannelTable<K = ChannelId> {
    channels: HashMap<K, ChannelState>,
}

impl<K> Default for ChannelTable<K> {
    fn default() -> Self {
        Self {
            channels: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash> ChannelTable<K> {
    fn open(&mut self, id: K) {
        self.channels.insert(id, ChannelState::new());
    }

    fn state(&mut self, id: &K) -> Option<&mut ChannelState> {
        self.channels.get_mut(id)
    }

    /// A channel can take a shell only once, and only after opening
    fn can_attach(&self, id: &K) -> bool {
        self.channels.get(id).is_some_and(|s| s.shell.is_none())
    }

    fn attach(&mut self, id: &K, shell: ShellSession) -> bool {
        match self.channels.get_mut(id) {
            Some(state) if state.shell.is_none() => {
                state.shell = Some(shell);
                true
            }
            _ => false,
        }
    }

    fn close(&mut self, id: &K) {
        if let Some(shell) = self.channels.get_mut(id).and_then(|s| s.shell.as_mut()) {
            shell.close();
        }
    }

    fn remove(&mut self, id: &K) {
        if let Some(mut state) = self.channels.remove(id) {
            if let Some(shell) = state.shell.as_mut() {
                shell.close();
            }
        }
    }
}

pub struct ConnectionHandler {
    realm: Arc<Realm>,
    checker: Arc<CredentialChecker>,
    env: ConnectionEnv,
    remote_version: SharedVersion,
    connection_id: Uuid,
    username: Option<String>,
    channels: ChannelTable,
}

impl ConnectionHandler {
    pub fn new(
        realm: Arc<Realm>,
        checker: Arc<CredentialChecker>,
        env: ConnectionEnv,
        remote_version: SharedVersion,
    ) -> Self {
        Self {
            realm,
            checker,
            env,
            remote_version,
            connection_id: Uuid::new_v4(),
            username: None,
            channels: ChannelTable::default(),
        }
    }

    fn remote_version(&self) -> String {
        self.remote_version
            .get()
            .cloned()
            .unwrap_or_else(|| UNKNOWN_VERSION.to_string())
    }

    fn send(
        session: &mut Session,
        channel: ChannelId,
        bytes: &[u8],
    ) -> Result<(), russh::Error> {
        if !bytes.is_empty() {
            session.data(channel, CryptoVec::from_slice(bytes))?;
        }
        Ok(())
    }

    fn finish_channel(
        session: &mut Session,
        channel: ChannelId,
    ) -> Result<(), russh::Error> {
        session.exit_status_request(channel, 0)?;
        session.eof(channel)?;
        session.close(channel)?;
        Ok(())
    }
}

impl Handler for ConnectionHandler {
    type Error = ServerError;

    async fn auth_password(
        &mut self,
        user: &str,
        password: &str,
    ) -> Result<Auth, Self::Error> {
        if self.checker.authenticate(user, password) {
            info!(
                connection = %self.connection_id,
                src = %self.env.src_host,
                username = user,
                "password accepted"
            );
            self.username = Some(user.to_string());
            Ok(Auth::Accept)
        } else {
            info!(
                connection = %self.connection_id,
                src = %self.env.src_host,
                username = user,
                "password rejected"
            );
            Ok(Auth::Reject {
                proceed_with_methods: None,
                partial_success: false,
            })
        }
    }

    async fn auth_publickey(
        &mut self,
        user: &str,
        _public_key: &russh::keys::PublicKey,
    ) -> Result<Auth, Self::Error> {
        debug!(
            connection = %self.connection_id,
            username = user,
            "publickey auth attempted, rejecting"
        );
        Ok(Auth::Reject {
            proceed_with_methods: None,
            partial_success: false,
        })
    }

    async fn auth_none(&mut self, user: &str) -> Result<Auth, Self::Error> {
        debug!(
            connection = %self.connection_id,
            username = user,
            "none auth attempted, rejecting"
        );
        Ok(Auth::Reject {
            proceed_with_methods: None,
            partial_success: false,
        })
    }

    async fn channel_open_session(
        &mut self,
        channel: Channel<Msg>,
        _session: &mut Session,
    ) -> Result<bool, Self::Error> {
        debug!(connection = %self.connection_id, channel = ?channel.id(), "session channel opened");
        self.channels.open(channel.id());
        Ok(true)
    }

    async fn pty_request(
        &mut self,
        channel: ChannelId,
        term: &str,
        _col_width: u32,
        _row_height: u32,
        _pix_width: u32,
        _pix_height: u32,
        _modes: &[(Pty, u32)],
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        debug!(connection = %self.connection_id, term, "pty requested");
        session.channel_success(channel)?;
        Ok(())
    }

    async fn window_change_request(
        &mut self,
        _channel: ChannelId,
        col_width: u32,
        row_height: u32,
        _pix_width: u32,
        _pix_height: u32,
        _session: &mut Session,
    ) -> Result<(), Self::Error> {
        // The fake terminal has no geometry to resize
        debug!(connection = %self.connection_id, col_width, row_height, "window change ignored");
        Ok(())
    }

    async fn shell_request(
        &mut self,
        channel: ChannelId,
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        let username = match &self.username {
            Some(name) => name.clone(),
            None => {
                session.channel_failure(channel)?;
                return Ok(());
            }
        };

        // Checked before asking the realm so a repeated request on a live
        // channel leaves no record
        if !self.channels.can_attach(&channel) {
            debug!(connection = %self.connection_id, ?channel, "duplicate shell request refused");
            session.channel_failure(channel)?;
            return Ok(());
        }

        let remote = self.remote_version();
        match self.realm.open_session(
            Capability::InteractiveShell,
            &username,
            self.env.clone(),
            &remote,
        ) {
            Ok(shell) => {
                info!(
                    connection = %self.connection_id,
                    username = %username,
                    remote_version = %remote,
                    "interactive shell opened"
                );
                session.channel_success(channel)?;
                Self::send(session, channel, &shell.greeting())?;
                self.channels.attach(&channel, shell);
                Ok(())
            }
            Err(err) => {
                debug!(connection = %self.connection_id, %err, "shell refused");
                session.channel_failure(channel)?;
                Ok(())
            }
        }
    }

    async fn exec_request(
        &mut self,
        channel: ChannelId,
        data: &[u8],
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        info!(
            connection = %self.connection_id,
            command = %String::from_utf8_lossy(data),
            "exec request refused"
        );
        session.channel_failure(channel)?;
        Ok(())
    }

    async fn subsystem_request(
        &mut self,
        channel: ChannelId,
        name: &str,
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        if let Err(err) = self.realm.open_session(
            Capability::Subsystem(name.to_string()),
            self.username.as_deref().unwrap_or(""),
            self.env.clone(),
            &self.remote_version(),
        ) {
            info!(connection = %self.connection_id, %err, "subsystem refused");
        }
        session.channel_failure(channel)?;
        Ok(())
    }

    async fn data(
        &mut self,
        channel: ChannelId,
        data: &[u8],
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        let Some(state) = self.channels.state(&channel) else {
            return Ok(());
        };
        let fed = state.line.feed(data);

        let Some(shell) = state.shell.as_mut() else {
            return Ok(());
        };

        Self::send(session, channel, &fed.echo)?;

        let mut finished = false;
        for event in fed.events {
            match event {
                LineEvent::Line(line) => {
                    let turn = shell.feed_line(&line);
                    Self::send(session, channel, &turn.output)?;
                    if turn.terminate {
                        finished = true;
                        break;
                    }
                }
                LineEvent::Interrupt => {
                    Self::send(session, channel, &shell.prompt())?;
                }
                LineEvent::EndOfInput => {
                    shell.close();
                    Self::send(session, channel, b"\r\n")?;
                    finished = true;
                    break;
                }
            }
        }

        if finished {
            Self::finish_channel(session, channel)?;
            self.channels.remove(&channel);
        }
        Ok(())
    }

    async fn channel_eof(
        &mut self,
        channel: ChannelId,
        _session: &mut Session,
    ) -> Result<(), Self::Error> {
        self.channels.close(&channel);
        Ok(())
    }

    async fn channel_close(
        &mut self,
        channel: ChannelId,
        _session: &mut Session,
    ) -> Result<(), Self::Error> {
        self.channels.remove(&channel);
        debug!(connection = %self.connection_id, ?channel, "channel closed");
        Ok(())
    }
}

impl Drop for ConnectionHandler {
    fn drop(&mut self) {
        debug!(connection = %self.connection_id, "connection finished");
    }
}
