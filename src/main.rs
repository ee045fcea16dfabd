use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use hive::config::{paths, AppConfig};
use hive::events::JsonLinesSink;
use hive::keystore::KeyStore;
use hive::logging::init_logging;
use hive::ssh::HoneypotServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _guard = init_logging(paths::ensure_log_dir().ok());

    info!("starting hive {}", env!("CARGO_PKG_VERSION"));

    let config = match std::env::args_os().nth(1) {
        Some(path) => AppConfig::load_from(&PathBuf::from(path))?,
        None => AppConfig::load()?,
    };

    let key_dir = config.key_dir();
    let host_key = KeyStore::new(&key_dir)
        .obtain()
        .with_context(|| format!("obtaining host key from {}", key_dir.display()))?;
    info!(
        fingerprint = %host_key
            .transport_key()
            .public_key()
            .fingerprint(russh::keys::HashAlg::Sha256),
        "host key ready"
    );

    let events_file = config.events_file();
    let sink = Arc::new(
        JsonLinesSink::create(&events_file)
            .with_context(|| format!("opening event log {}", events_file.display()))?,
    );
    info!(file = %events_file.display(), "event log open");

    HoneypotServer::new(&config, &host_key, sink).run().await?;
    Ok(())
}
