use std::path::PathBuf;
use thiserror::Error;

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Failed to write config file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to create config directory: {0}")]
    CreateDir(std::io::Error),
}

/// Host-key material errors. All of these are fatal at startup: the
/// honeypot must not listen without a stable host identity.
#[derive(Error, Debug)]
pub enum KeyStoreError {
    #[error("Failed to create key directory '{path}': {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to read key file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write key file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Host key pair is incomplete: '{present}' exists but '{missing}' is missing")]
    PartialKeyPair { present: PathBuf, missing: PathBuf },

    #[error("Corrupt private key file '{path}': {source}")]
    CorruptPrivateKey {
        path: PathBuf,
        source: rsa::pkcs1::Error,
    },

    #[error("Corrupt public key file '{path}': {source}")]
    CorruptPublicKey {
        path: PathBuf,
        source: ssh_key::Error,
    },

    #[error("Public key file '{path}' does not match the private key")]
    KeyMismatch { path: PathBuf },

    #[error("RSA key generation failed: {0}")]
    Generate(#[from] rsa::Error),

    #[error("Key encoding failed: {0}")]
    Encode(#[from] ssh_key::Error),

    #[error("PEM encoding failed: {0}")]
    EncodePem(rsa::pkcs1::Error),
}

/// Per-session errors surfaced to the transport layer
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Unsupported capability: {0}")]
    UnsupportedCapability(String),
}

/// Errors for the listener and per-connection transport glue
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to bind listener on {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[error("russh error: {0}")]
    Russh(#[from] russh::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
