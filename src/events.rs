//! Structured event records emitted by the session layer.
//!
//! The core only produces records; persistence is the sink's concern. The
//! shipped sink appends JSON lines to a file. Sink failures are surfaced
//! through `tracing` and never propagate into a session: a broken log file
//! must not take the honeypot down.

use std::io::Write;
use std::net::SocketAddr;
use std::path::Path;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

/// Connection provenance, captured once per channel at session creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionEnv {
    pub src_host: String,
    pub src_port: u16,
    pub dst_host: String,
    pub dst_port: u16,
}

impl ConnectionEnv {
    pub fn from_addrs(peer: SocketAddr, local: SocketAddr) -> Self {
        Self {
            src_host: peer.ip().to_string(),
            src_port: peer.port(),
            dst_host: local.ip().to_string(),
            dst_port: local.port(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    NewConnection,
    Command,
}

/// One write-once log record
#[derive(Debug, Clone, Serialize)]
pub struct EventRecord {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub env: ConnectionEnv,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    pub local_version: String,
    pub remote_version: String,
}

impl EventRecord {
    pub fn new_connection(
        env: ConnectionEnv,
        username: &str,
        local_version: &str,
        remote_version: &str,
    ) -> Self {
        Self {
            kind: EventKind::NewConnection,
            timestamp: Utc::now(),
            env,
            username: Some(username.to_string()),
            command: None,
            local_version: local_version.to_string(),
            remote_version: remote_version.to_string(),
        }
    }

    pub fn command(
        env: ConnectionEnv,
        command: &str,
        local_version: &str,
        remote_version: &str,
    ) -> Self {
        Self {
            kind: EventKind::Command,
            timestamp: Utc::now(),
            env,
            username: None,
            command: Some(command.to_string()),
            local_version: local_version.to_string(),
            remote_version: remote_version.to_string(),
        }
    }
}

/// Receives records produced by sessions; shared across all sessions
pub trait EventSink: Send + Sync {
    fn emit(&self, record: EventRecord);
}

/// Appends one JSON object per line to a file
pub struct JsonLinesSink {
    file: Mutex<std::fs::File>,
}

impl JsonLinesSink {
    pub fn create(path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl EventSink for JsonLinesSink {
    fn emit(&self, record: EventRecord) {
        let line = match serde_json::to_string(&record) {
            Ok(line) => line,
            Err(e) => {
                tracing::error!("Failed to serialize event record: {}", e);
                return;
            }
        };
        let mut file = self.file.lock();
        if let Err(e) = writeln!(file, "{}", line) {
            tracing::error!("Failed to write event record: {}", e);
        }
    }
}

/// Collects records in memory; test instrumentation
#[cfg(test)]
#[derive(Default)]
pub struct RecordingSink {
    records: Mutex<Vec<EventRecord>>,
}

#[cfg(test)]
impl RecordingSink {
    pub fn records(&self) -> Vec<EventRecord> {
        self.records.lock().clone()
    }
}

#[cfg(test)]
impl EventSink for RecordingSink {
    fn emit(&self, record: EventRecord) {
        self.records.lock().push(record);
    }
}
