use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Application-wide settings stored in hive.toml
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub listener: ListenerConfig,
    #[serde(default)]
    pub keys: KeysConfig,
    #[serde(default)]
    pub events: EventsConfig,
    #[serde(default = "CredentialEntry::defaults")]
    pub credentials: Vec<CredentialEntry>,
}

impl AppConfig {
    /// Load from the default location, creating a default file if not exists
    pub fn load() -> Result<Self, ConfigError> {
        let path = super::paths::config_file().ok_or_else(|| ConfigError::ReadFile {
            path: PathBuf::from("hive.toml"),
            source: std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine config file path",
            ),
        })?;
        Self::load_from(&path)
    }

    /// Load from an explicit file path, creating a default file if not exists
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            let config = Self::with_defaults();
            config.save_to(path)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(ConfigError::Parse)
    }

    /// Save to an explicit file path
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigError::CreateDir)?;
        }

        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        std::fs::write(path, content).map_err(|e| ConfigError::WriteFile {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Defaults with the stock weak credential table filled in.
    ///
    /// `Default::default()` derives an empty credential list because serde
    /// only applies field defaults when deserializing; this is the variant
    /// callers want.
    pub fn with_defaults() -> Self {
        Self {
            credentials: CredentialEntry::defaults(),
            ..Self::default()
        }
    }

    /// Directory holding the persistent host key pair
    pub fn key_dir(&self) -> PathBuf {
        self.keys
            .dir
            .clone()
            .or_else(super::paths::default_key_dir)
            .unwrap_or_else(|| PathBuf::from("keys"))
    }

    /// Path of the JSON-lines event record file
    pub fn events_file(&self) -> PathBuf {
        self.events
            .file
            .clone()
            .or_else(super::paths::default_events_file)
            .unwrap_or_else(|| PathBuf::from("events.jsonl"))
    }
}

fn default_listen_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    223
}

fn default_server_id() -> String {
    // Mimics an old OpenSSH build string
    "SSH-2.0-OpenSSH_5.1p1 Debian-5".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenerConfig {
    #[serde(default = "default_listen_addr")]
    pub addr: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Identification string presented to connecting clients
    #[serde(default = "default_server_id")]
    pub server_id: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            addr: default_listen_addr(),
            port: default_port(),
            server_id: default_server_id(),
        }
    }
}

impl ListenerConfig {
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.addr, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct KeysConfig {
    /// Directory for id_rsa / id_rsa.pub; platform data dir when unset
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EventsConfig {
    /// JSON-lines record file; platform data dir when unset
    #[serde(default)]
    pub file: Option<PathBuf>,
}

/// One username/password pair attackers may log in with
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CredentialEntry {
    pub username: String,
    pub password: String,
}

impl CredentialEntry {
    /// The stock deliberately weak table
    pub fn defaults() -> Vec<Self> {
        vec![
            Self {
                username: "admin".to_string(),
                password: "aaa".to_string(),
            },
            Self {
                username: "guest".to_string(),
                password: "bbb".to_string(),
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_cover_listener_and_credentials() {
        let config = AppConfig::with_defaults();
        assert_eq!(config.listener.addr, "0.0.0.0");
        assert_eq!(config.listener.port, 223);
        assert_eq!(config.listener.server_id, "SSH-2.0-OpenSSH_5.1p1 Debian-5");
        assert_eq!(config.credentials, CredentialEntry::defaults());
    }

    #[test]
    fn socket_addr_joins_addr_and_port() {
        let listener = ListenerConfig {
            addr: "127.0.0.1".to_string(),
            port: 2222,
            ..ListenerConfig::default()
        };
        assert_eq!(listener.socket_addr(), "127.0.0.1:2222");
    }

    #[test]
    fn load_from_creates_default_file_when_missing() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("hive.toml");

        let config = AppConfig::load_from(&path).expect("load");

        assert!(path.exists());
        assert_eq!(config.listener.port, 223);
        assert_eq!(config.credentials.len(), 2);
    }

    #[test]
    fn save_and_reload_round_trips() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("hive.toml");

        let mut config = AppConfig::with_defaults();
        config.listener.port = 2223;
        config.keys.dir = Some(dir.path().join("keys"));
        config.credentials.push(CredentialEntry {
            username: "root".to_string(),
            password: "toor".to_string(),
        });
        config.save_to(&path).expect("save");

        let reloaded = AppConfig::load_from(&path).expect("reload");
        assert_eq!(reloaded.listener.port, 2223);
        assert_eq!(reloaded.keys.dir, Some(dir.path().join("keys")));
        assert_eq!(reloaded.credentials.len(), 3);
    }

    #[test]
    fn partial_file_falls_back_to_field_defaults() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("hive.toml");
        std::fs::write(&path, "[listener]\nport = 2224\n").expect("write");

        let config = AppConfig::load_from(&path).expect("load");

        assert_eq!(config.listener.port, 2224);
        assert_eq!(config.listener.addr, "0.0.0.0");
        // Credential table falls back to the stock weak pairs
        assert_eq!(config.credentials, CredentialEntry::defaults());
    }

    #[test]
    fn invalid_toml_fails_to_parse() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("hive.toml");
        std::fs::write(&path, "listener = not toml").expect("write");

        let result = AppConfig::load_from(&path);
        assert!(matches!(result, Err(crate::error::ConfigError::Parse(_))));
    }

    #[test]
    fn explicit_paths_win_over_platform_defaults() {
        let mut config = AppConfig::with_defaults();
        config.keys.dir = Some(PathBuf::from("/var/tmp"));
        config.events.file = Some(PathBuf::from("/var/tmp/events.jsonl"));

        assert_eq!(config.key_dir(), PathBuf::from("/var/tmp"));
        assert_eq!(config.events_file(), PathBuf::from("/var/tmp/events.jsonl"));
    }
}
