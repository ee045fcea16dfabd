pub mod paths;
pub mod settings;

pub use settings::{AppConfig, CredentialEntry, EventsConfig, KeysConfig, ListenerConfig};
