//! SSH transport: listener, per-connection handler, and version capture.

pub mod handler;
pub mod server;
pub mod sniff;

pub use handler::ConnectionHandler;
pub use server::HoneypotServer;
pub use sniff::{SharedVersion, VersionSniffer};
