//! Listener and accept loop.

use std::sync::Arc;
use std::time::Duration;

use russh::SshId;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::auth::CredentialChecker;
use crate::config::AppConfig;
use crate::events::{ConnectionEnv, EventSink};
use crate::error::ServerError;
use crate::keystore::HostKeyPair;
use crate::realm::Realm;
use crate::shell::CommandRegistry;

use super::handler::ConnectionHandler;
use super::sniff::{SharedVersion, VersionSniffer};

const AUTH_REJECTION_DELAY: Duration = Duration::from_secs(1);
const INACTIVITY_TIMEOUT: Duration = Duration::from_secs(600);

pub struct HoneypotServer {
    bind_addr: String,
    realm: Arc<Realm>,
    checker: Arc<CredentialChecker>,
    config: Arc<russh::server::Config>,
}

impl HoneypotServer {
    pub fn new(app: &AppConfig, host_key: &HostKeyPair, sink: Arc<dyn EventSink>) -> Self {
        let registry = Arc::new(CommandRegistry::builtin());
        let realm = Arc::new(Realm::new(
            registry,
            sink,
            app.listener.server_id.clone(),
        ));
        let checker = Arc::new(CredentialChecker::new(&app.credentials));

        let config = Arc::new(russh::server::Config {
            server_id: SshId::Standard(app.listener.server_id.clone()),
            keys: vec![host_key.transport_key().clone()],
            auth_rejection_time: AUTH_REJECTION_DELAY,
            auth_rejection_time_initial: Some(Duration::ZERO),
            inactivity_timeout: Some(INACTIVITY_TIMEOUT),
            ..Default::default()
        });

        Self {
            bind_addr: app.listener.socket_addr(),
            realm,
            checker,
            config,
        }
    }

    /// Bind the listener and serve connections until the task is cancelled.
    pub async fn run(&self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(&self.bind_addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: self.bind_addr.clone(),
                source,
            })?;
        let bound = listener.local_addr()?;
        info!(addr = %bound, "listening for SSH connections");

        loop {
            let (socket, peer) = listener.accept().await?;
            let local = socket.local_addr().unwrap_or(bound);
            let env = ConnectionEnv::from_addrs(peer, local);
            info!(src = %peer, dst = %local, "connection accepted");

            let realm = self.realm.clone();
            let checker = self.checker.clone();
            let config = self.config.clone();

            tokio::spawn(async move {
                let remote_version = SharedVersion::default();
                let stream = VersionSniffer::new(socket, remote_version.clone());
                let handler =
                    ConnectionHandler::new(realm, checker, env, remote_version);

                match russh::server::run_stream(config, stream, handler).await {
                    Ok(session) => {
                        if let Err(err) = session.await {
                            error!(src = %peer, %err, "session ended with error");
                        }
                    }
                    Err(err) => {
                        error!(src = %peer, %err, "ssh handshake failed");
                    }
                }
            });
        }
    }
}
